//! Event runner - builds, prunes, and presents events in parallel.
//!
//! Each event is processed independently: columns are converted to records,
//! the tree is built and pruned, optionally split into endcaps, and every
//! view gets a scene and a merge map. Events share nothing, so a batch runs
//! on the rayon pool without synchronization.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EventError;
use crate::event::ColumnarEvent;
use truthtree_core::{
    build_scene, BuildConfig, IdColor, MergeMap, Scene, SceneOptions, ShowerTree, TreeError, ROOT,
};

/// Configuration for processing events.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Tree construction options
    pub build: BuildConfig,

    /// Scene construction options
    pub scene: SceneOptions,

    /// Produce separate views for the two endcaps (default: false)
    pub split_endcaps: bool,

    /// Mirror the negative endcap onto positive z (default: false)
    pub flip: bool,

    /// Seed of the per-event color wheel (default: 44)
    pub color_seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            scene: SceneOptions::default(),
            split_endcaps: false,
            flip: false,
            color_seed: 44,
        }
    }
}

/// Counters collected for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStats {
    /// Track records in the input
    pub input_tracks: usize,

    /// Hit records in the input
    pub input_hits: usize,

    /// Tracks surviving the prune
    pub retained_tracks: usize,

    /// Tracks excised by the prune
    pub pruned_tracks: usize,

    /// Hits discarded as orphans
    pub dropped_hits: usize,

    /// Longest root-to-leaf path, in edges
    pub max_depth: usize,

    /// Total deposited energy
    pub total_energy: f64,
}

/// One drawable view of an event (the whole event, or one endcap).
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    /// "all", "positive" or "negative"
    pub label: &'static str,

    /// Absent when the view holds no hits
    pub scene: Option<Scene>,

    pub merge_map: MergeMap,
}

/// Outcome of processing one event.
#[derive(Debug, Clone)]
pub struct EventResult {
    /// Position of the event in the batch
    pub index: usize,

    /// Whether the event was processed without error
    pub passed: bool,

    pub stats: EventStats,

    pub views: Vec<EventView>,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Results of a whole batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub results: Vec<EventResult>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Failed results in batch order.
    pub fn failures(&self) -> impl Iterator<Item = &EventResult> + '_ {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Processes events with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct EventRunner {
    config: RunConfig,
}

impl EventRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Processes one event; errors are folded into the result.
    pub fn run(&self, index: usize, event: &ColumnarEvent) -> EventResult {
        match self.try_run(event) {
            Ok((stats, views)) => {
                debug!(
                    "event {}: {} tracks -> {} retained, {} hits",
                    index, stats.input_tracks, stats.retained_tracks, stats.input_hits
                );
                EventResult {
                    index,
                    passed: true,
                    stats,
                    views,
                    failure_reason: None,
                }
            }
            Err(e) => {
                warn!("event {} failed: {}", index, e);
                EventResult {
                    index,
                    passed: false,
                    stats: EventStats {
                        input_tracks: event.track_count(),
                        input_hits: event.hit_count(),
                        ..Default::default()
                    },
                    views: Vec::new(),
                    failure_reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Processes one event, propagating the first error.
    pub fn try_run(&self, event: &ColumnarEvent) -> Result<(EventStats, Vec<EventView>), EventError> {
        let (tracks, hits) = event.to_records()?;
        let tree = ShowerTree::build_with(&tracks, &hits, &self.config.build)?;

        let max_depth = tree
            .tracks()
            .map(|n| tree.depth(n.id()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .max()
            .unwrap_or(0);

        let stats = EventStats {
            input_tracks: tracks.len(),
            input_hits: hits.len(),
            retained_tracks: tree.len(),
            pruned_tracks: tracks.len() - tree.len(),
            dropped_hits: tree.dropped_hits(),
            max_depth,
            total_energy: tree.root().energy_sum(),
        };

        // One wheel per event keeps colors independent of batch order
        let mut colors = IdColor::new(self.config.color_seed);
        let views = if self.config.split_endcaps {
            let (positive, negative) = tree.split_endcaps(self.config.flip);
            vec![
                self.view("positive", &positive, &mut colors)?,
                self.view("negative", &negative, &mut colors)?,
            ]
        } else {
            vec![self.view("all", &tree, &mut colors)?]
        };

        Ok((stats, views))
    }

    fn view(
        &self,
        label: &'static str,
        tree: &ShowerTree,
        colors: &mut IdColor,
    ) -> Result<EventView, EventError> {
        let scene = match build_scene(tree, colors, &self.config.scene) {
            Ok(scene) => Some(scene),
            Err(TreeError::EmptySubtree(_)) => {
                debug!("view {} has no hits ({} children)", label, tree.children_of(ROOT).count());
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(EventView {
            label,
            scene,
            merge_map: MergeMap::from_tree(tree),
        })
    }

    /// Processes a batch in parallel; results keep the input order.
    pub fn run_batch(&self, events: &[ColumnarEvent]) -> BatchSummary {
        info!("Processing {} events", events.len());
        let results = events
            .par_iter()
            .enumerate()
            .map(|(i, event)| self.run(i, event))
            .collect();
        BatchSummary { results }
    }
}
