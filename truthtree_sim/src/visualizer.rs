//! Rerun visualization for processed events.
//!
//! Visualization is optional and only available with the `visualization`
//! feature. Without it every logging call is a no-op.
//!
//! # What Gets Logged
//!
//! - Hit clouds per track, colored by the event's color wheel
//! - Boundary-to-centroid segments per track
//! - The calorimeter front face as a closed line strip
//! - Per-event counters as scalars on the `event` timeline

#[cfg(feature = "visualization")]
use rerun::{Color, LineStrips3D, Points3D, Position3D, Radius, RecordingStream};

use crate::runner::EventStats;
use truthtree_core::Scene;

/// Rerun logger for event visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to see events");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self {
                    rec: None,
                    enabled: false,
                }
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the event index for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_event(&self, index: usize) {
        if let Some(ref rec) = self.rec {
            rec.set_time_sequence("event", index as i64);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_event(&self, _index: usize) {}

    /// Logs one scene under `events/<label>`.
    #[cfg(feature = "visualization")]
    pub fn log_scene(&self, label: &str, scene: &Scene) {
        let Some(ref rec) = self.rec else { return };
        let to_pos = |p: &[f64; 3]| Position3D::new(p[0] as f32, p[1] as f32, p[2] as f32);

        for cloud in &scene.clouds {
            let [r, g, b] = cloud.color.0;
            let points: Vec<Position3D> = cloud.positions.iter().map(to_pos).collect();
            let radii: Vec<Radius> = cloud
                .sizes
                .iter()
                .map(|s| Radius::new_scene_units(0.2 + *s as f32 * 0.3))
                .collect();
            let _ = rec.log(
                format!("events/{}/hits/{}", label, cloud.track_id),
                &Points3D::new(points)
                    .with_colors([Color::from_rgb(r, g, b)])
                    .with_radii(radii),
            );
        }

        for segment in &scene.segments {
            let [r, g, b] = segment.color.0;
            let strip = vec![
                [segment.from[0] as f32, segment.from[1] as f32, segment.from[2] as f32],
                [segment.to[0] as f32, segment.to[1] as f32, segment.to[2] as f32],
            ];
            let _ = rec.log(
                format!("events/{}/tracks/{}", label, segment.track_id),
                &LineStrips3D::new([strip]).with_colors([Color::from_rgb(r, g, b)]),
            );
        }

        if let Some(face) = &scene.front_face {
            let [r, g, b] = face.color.0;
            let mut strip: Vec<[f32; 3]> = face
                .corners
                .iter()
                .map(|c| [c[0] as f32, c[1] as f32, c[2] as f32])
                .collect();
            strip.push(strip[0]);
            let _ = rec.log(
                format!("events/{}/front_face", label),
                &LineStrips3D::new([strip]).with_colors([Color::from_rgb(r, g, b)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_scene(&self, _label: &str, _scene: &Scene) {}

    /// Logs event counters as scalar metrics.
    #[cfg(feature = "visualization")]
    pub fn log_stats(&self, stats: &EventStats) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log("metrics/retained_tracks", &rerun::Scalar::new(stats.retained_tracks as f64));
            let _ = rec.log("metrics/pruned_tracks", &rerun::Scalar::new(stats.pruned_tracks as f64));
            let _ = rec.log("metrics/total_energy", &rerun::Scalar::new(stats.total_energy));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_stats(&self, _stats: &EventStats) {}

    /// Logs a text annotation (e.g., a failed event).
    #[cfg(feature = "visualization")]
    pub fn log_event(&self, path: &str, message: &str) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::TextLog::new(message));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_event(&self, _path: &str, _message: &str) {}
}
