//! Deterministic synthetic shower generator.
//!
//! Produces columnar events that look like calorimeter simulation truth:
//! primaries entering one endcap, secondaries branching off them, and hits
//! spread over the calorimeter layers. Every event is derived from the master
//! seed and its index alone, so event `n` is the same no matter how many
//! events are generated or in what order.

use nalgebra::Vector3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal, Poisson};

use crate::event::ColumnarEvent;
use truthtree_core::geometry::{HGCAL_Z_MIN, Z_POS_LAYERS};
use truthtree_core::{HitRecord, TrackId, TrackRecord};

/// Secondary particle types drawn by the generator.
const SECONDARY_PDGIDS: [i32; 8] = [22, 22, 11, -11, 211, -211, 2112, 13];

/// Shape of the generated showers.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Primaries per event (default: 2)
    pub primaries: usize,

    /// Maximum generations below a primary (default: 4)
    pub max_depth: usize,

    /// Mean number of secondaries per track (default: 1.5)
    pub mean_children: f64,

    /// Probability that a track records hits (default: 0.5)
    pub hit_fraction: f64,

    /// Mean hits per hit-bearing track (default: 8.0)
    pub mean_hits: f64,

    /// Transverse hit spread around the track (default: 2.0 cm)
    pub spread_cm: f64,

    /// Primary energy (default: 50 GeV)
    pub primary_energy: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            primaries: 2,
            max_depth: 4,
            mean_children: 1.5,
            hit_fraction: 0.5,
            mean_hits: 8.0,
            spread_cm: 2.0,
            primary_energy: 50.0,
        }
    }
}

/// Seeded generator of shower events.
#[derive(Debug, Clone)]
pub struct ShowerGenerator {
    master_seed: u64,
    config: GeneratorConfig,
}

impl ShowerGenerator {
    pub fn new(master_seed: u64, config: GeneratorConfig) -> Self {
        Self {
            master_seed,
            config,
        }
    }

    pub fn with_defaults(master_seed: u64) -> Self {
        Self::new(master_seed, GeneratorConfig::default())
    }

    /// Seed of event `index`: `master * golden + index * prime`.
    pub fn event_seed(&self, index: u64) -> u64 {
        self.master_seed
            .wrapping_mul(0x9e3779b97f4a7c15)
            .wrapping_add(index.wrapping_mul(0x517cc1b727220a95))
    }

    /// Generates event `index` as typed records.
    pub fn records(&self, index: u64) -> (Vec<TrackRecord>, Vec<HitRecord>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.event_seed(index));
        let cfg = &self.config;

        let transverse = Normal::new(0.0, 30.0).ok();
        let spread = Normal::new(0.0, cfg.spread_cm.max(1e-6)).ok();
        let gauss = |dist: Option<Normal<f64>>, rng: &mut ChaCha8Rng| {
            dist.map(|d| d.sample(rng)).unwrap_or(0.0)
        };
        let children_dist = Poisson::new(cfg.mean_children.max(1e-6)).ok();
        let hits_dist = Poisson::new(cfg.mean_hits.max(1e-6)).ok();

        let mut tracks: Vec<TrackRecord> = Vec::new();
        let mut hits: Vec<HitRecord> = Vec::new();
        let mut next_id: TrackId = 1;
        let mut next_detid: u32 = 1;

        // (track id, depth) waiting for secondaries
        let mut pending: Vec<(usize, usize)> = Vec::new();

        for _ in 0..cfg.primaries {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let x = gauss(transverse, &mut rng);
            let y = gauss(transverse, &mut rng);

            let mut primary = TrackRecord::new(next_id, None);
            next_id += 1;
            primary.pdgid = if rng.gen_bool(0.5) { 211 } else { 22 };
            primary.energy = cfg.primary_energy;
            primary.energy_at_boundary = cfg.primary_energy * rng.gen_range(0.9..1.0);
            primary.position = Vector3::new(x, y, sign * (HGCAL_Z_MIN - 1.0));
            primary.boundary_position = Vector3::new(x, y, sign * HGCAL_Z_MIN);
            primary.crossed_boundary = true;
            primary.has_hits = rng.gen_bool(cfg.hit_fraction.clamp(0.0, 1.0));

            tracks.push(primary);
            pending.push((tracks.len() - 1, 0));
        }

        while let Some((slot, depth)) = pending.pop() {
            let parent = tracks[slot].clone();

            if parent.has_hits {
                let n = 1 + hits_dist.map(|d| d.sample(&mut rng) as usize).unwrap_or(0);
                let sign = parent.position.z.signum();
                let mean_energy = (parent.energy * 0.01).max(1e-4);
                let energy_dist = Exp::new(1.0 / mean_energy).ok();
                for _ in 0..n {
                    let layer = rng.gen_range(0..Z_POS_LAYERS.len());
                    let position = Vector3::new(
                        parent.position.x + gauss(spread, &mut rng),
                        parent.position.y + gauss(spread, &mut rng),
                        sign * Z_POS_LAYERS[layer],
                    );
                    let energy = energy_dist.map(|d| d.sample(&mut rng)).unwrap_or(mean_energy);
                    hits.push(HitRecord::new(next_detid, position, energy, parent.track_id));
                    next_detid += 1;
                }
            }

            if depth >= cfg.max_depth {
                continue;
            }
            let n_children = children_dist.map(|d| d.sample(&mut rng) as usize).unwrap_or(0);
            for _ in 0..n_children {
                let fraction = rng.gen_range(0.05..0.6);
                let mut child = TrackRecord::new(next_id, Some(parent.track_id));
                next_id += 1;
                child.pdgid = *SECONDARY_PDGIDS.choose(&mut rng).unwrap_or(&22);
                child.energy = parent.energy * fraction;
                child.vertex = parent.position;
                child.position = parent.position
                    + Vector3::new(
                        gauss(spread, &mut rng),
                        gauss(spread, &mut rng),
                        parent.position.z.signum() * rng.gen_range(1.0..20.0),
                    );
                child.has_hits = rng.gen_bool(cfg.hit_fraction.clamp(0.0, 1.0));

                tracks.push(child);
                pending.push((tracks.len() - 1, depth + 1));
            }
        }

        // Simulation output is not ordered parent-first
        tracks.shuffle(&mut rng);
        (tracks, hits)
    }

    /// Generates event `index` in columnar layout.
    pub fn generate(&self, index: u64) -> ColumnarEvent {
        let (tracks, hits) = self.records(index);
        ColumnarEvent::from_records(&tracks, &hits)
    }

    /// Generates events `0..count`.
    pub fn generate_batch(&self, count: usize) -> Vec<ColumnarEvent> {
        (0..count as u64).map(|i| self.generate(i)).collect()
    }
}
