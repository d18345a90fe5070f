//! 3D scene description of a pruned tree.
//!
//! A [`Scene`] is what a viewer needs to draw an event: one hit cloud per
//! track that owns hits, a segment from each track's boundary crossing to its
//! hit centroid, the calorimeter front face, and axis ranges. It carries no
//! rendering code; viewers (Rerun, web front-ends) consume it.
//!
//! Usage:
//! ```ignore
//! use truthtree_core::{build_scene, IdColor, SceneOptions};
//!
//! let mut colors = IdColor::new(44);
//! let scene = build_scene(&tree, &mut colors, &SceneOptions::default())?;
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::colors::{IdColor, Rgb};
use crate::error::{Result, TreeError};
use crate::geometry::{nearest_layer, Endcap, HGCAL_Z_MIN};
use crate::records::TrackId;
use crate::truth_tree::{ShowerTree, ROOT};

/// Color of the front-face rectangle.
pub const FRONT_FACE_COLOR: Rgb = Rgb::new(0xba, 0xcf, 0xbe);

/// Options for [`build_scene`].
#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Emit boundary-to-centroid segments (default: true)
    pub draw_tracks: bool,

    /// Emit the calorimeter front face (default: true)
    pub draw_front_face: bool,

    /// Mean hit energy maps to `ln(size_scale)` before clamping (default: 20.0)
    pub size_scale: f64,

    /// Upper clamp for hit marker sizes (default: 3.0)
    pub max_marker_size: f64,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            draw_tracks: true,
            draw_front_face: true,
            size_scale: 20.0,
            max_marker_size: 3.0,
        }
    }
}

/// Axis ranges and counts for the whole scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub n_tracks_with_hits: usize,
    pub total_hits: usize,
    pub total_energy: f64,
}

/// Hits of one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitCloud {
    pub track_id: TrackId,
    pub pdgid: i32,
    pub color: Rgb,
    pub positions: Vec<[f64; 3]>,
    pub energies: Vec<f64>,
    /// Marker size per hit, log of scaled energy clamped to `[0, max]`
    pub sizes: Vec<f64>,
    /// 1-based calorimeter layer per hit
    pub layers: Vec<usize>,
}

/// Line from a track's boundary crossing to its hit centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSegment {
    pub track_id: TrackId,
    pub pdgid: i32,
    pub color: Rgb,
    pub from: [f64; 3],
    pub to: [f64; 3],
    pub energy_at_boundary: f64,
    pub nhits: usize,
}

/// Rectangle marking the calorimeter front face, spanning the hit x/y range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontFace {
    pub z: f64,
    pub corners: [[f64; 3]; 4],
    pub color: Rgb,
}

/// Everything a viewer needs to draw one tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub info: SceneInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_face: Option<FrontFace>,
    /// Sorted by descending hit count
    pub clouds: Vec<HitCloud>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<TrackSegment>,
}

fn to_array(v: Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

/// Builds the scene for every track in `tree` that owns hits.
///
/// Colors come from the caller's wheel so several scenes can share one.
/// Fails with [`TreeError::EmptySubtree`] when the tree has no hits at all.
pub fn build_scene(tree: &ShowerTree, colors: &mut IdColor, options: &SceneOptions) -> Result<Scene> {
    let root = tree.root();
    let (lo, hi) = tree.hit_bounds(ROOT)?;
    let total_hits = root.hit_count();
    let total_energy = root.energy_sum();

    let mean_energy = total_energy / total_hits as f64;
    let energy_scale = if mean_energy > 0.0 {
        options.size_scale / mean_energy
    } else {
        0.0
    };
    let marker_size = |energy: f64| -> f64 {
        let size = (energy_scale * energy).ln();
        if size.is_nan() {
            0.0
        } else {
            size.clamp(0.0, options.max_marker_size)
        }
    };

    let mut with_hits: Vec<_> = tree.tracks().filter(|n| n.nhits() > 0).collect();
    with_hits.sort_by(|a, b| b.nhits().cmp(&a.nhits()));

    let mut clouds = Vec::with_capacity(with_hits.len());
    let mut segments = Vec::new();
    for node in &with_hits {
        let Some(track) = node.track() else { continue };
        let color = colors.color(u64::from(track.track_id));

        clouds.push(HitCloud {
            track_id: track.track_id,
            pdgid: track.pdgid,
            color,
            positions: node.hits().iter().map(|h| to_array(h.position)).collect(),
            energies: node.hits().iter().map(|h| h.energy).collect(),
            sizes: node.hits().iter().map(|h| marker_size(h.energy)).collect(),
            layers: node.hits().iter().map(|h| nearest_layer(h.position.z)).collect(),
        });

        if options.draw_tracks {
            segments.push(TrackSegment {
                track_id: track.track_id,
                pdgid: track.pdgid,
                color,
                from: to_array(track.boundary_position),
                to: to_array(node.own_centroid()?),
                energy_at_boundary: track.energy_at_boundary,
                nhits: node.nhits(),
            });
        }
    }

    let front_face = options.draw_front_face.then(|| {
        let z = match Endcap::from_z(root.centroid().map(|c| c.z).unwrap_or(0.0)) {
            Endcap::Positive => HGCAL_Z_MIN,
            Endcap::Negative => -HGCAL_Z_MIN,
        };
        FrontFace {
            z,
            corners: [
                [lo.x, lo.y, z],
                [hi.x, lo.y, z],
                [hi.x, hi.y, z],
                [lo.x, hi.y, z],
            ],
            color: FRONT_FACE_COLOR,
        }
    });

    Ok(Scene {
        info: SceneInfo {
            min: to_array(lo),
            max: to_array(hi),
            n_tracks_with_hits: clouds.len(),
            total_hits,
            total_energy,
        },
        front_face,
        clouds,
        segments,
    })
}

impl Scene {
    /// Total number of hit points across all clouds.
    pub fn point_count(&self) -> usize {
        self.clouds.iter().map(|c| c.positions.len()).sum()
    }

    /// The cloud drawn for `track_id`, if it owns hits.
    pub fn cloud(&self, track_id: TrackId) -> Option<&HitCloud> {
        self.clouds.iter().find(|c| c.track_id == track_id)
    }
}
