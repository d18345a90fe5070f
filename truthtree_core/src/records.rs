//! Typed track and hit records.
//!
//! These are the two flat per-event sequences the builder consumes. Input
//! adapters fill them from whatever columnar format the simulation writes.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

/// Simulation track identifier, unique within one event.
pub type TrackId = u32;

/// Owner id of a hit whose producing track is not a valid track id.
///
/// No track may carry it, so such hits are always orphans.
pub const NO_TRACK: TrackId = 0;

/// A simulated particle trajectory segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Unique track id within the event
    pub track_id: TrackId,

    /// Producing track, `None` for primaries
    pub parent_id: Option<TrackId>,

    /// PDG particle code (signed)
    pub pdgid: i32,

    /// Energy at production (GeV)
    pub energy: f64,

    /// Energy when crossing the calorimeter boundary (GeV)
    pub energy_at_boundary: f64,

    /// Whether the simulation recorded hits for this track
    pub has_hits: bool,

    /// Track position [x, y, z] in cm
    pub position: Vector3<f64>,

    /// Production vertex [x, y, z] in cm
    pub vertex: Vector3<f64>,

    /// Boundary crossing point [x, y, z] in cm
    pub boundary_position: Vector3<f64>,

    /// Whether the track crossed the calorimeter boundary
    pub crossed_boundary: bool,

    /// Simulation flag: no parent track was stored
    pub no_parent: bool,
}

impl TrackRecord {
    /// Creates a track at the origin with no kinematics.
    ///
    /// Mostly useful for tests and for adapters that fill fields one by one.
    pub fn new(track_id: TrackId, parent_id: Option<TrackId>) -> Self {
        Self {
            track_id,
            parent_id,
            pdgid: 0,
            energy: 0.0,
            energy_at_boundary: 0.0,
            has_hits: false,
            position: Vector3::zeros(),
            vertex: Vector3::zeros(),
            boundary_position: Vector3::zeros(),
            crossed_boundary: false,
            no_parent: parent_id.is_none(),
        }
    }

    /// Sets the `has_hits` flag.
    pub fn with_hits(mut self, has_hits: bool) -> Self {
        self.has_hits = has_hits;
        self
    }

    /// Sets the track position.
    pub fn at(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    /// Checks the record for values the builder cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.track_id == NO_TRACK {
            return Err(TreeError::malformed(format!(
                "track id {} is reserved",
                NO_TRACK
            )));
        }
        if self.parent_id == Some(self.track_id) {
            return Err(TreeError::malformed(format!(
                "track {} names itself as parent",
                self.track_id
            )));
        }
        let finite = [self.position, self.vertex, self.boundary_position]
            .iter()
            .all(|v| v.iter().all(|c| c.is_finite()));
        if !finite {
            return Err(TreeError::malformed(format!(
                "track {} has non-finite coordinates",
                self.track_id
            )));
        }
        if !self.energy.is_finite() || !self.energy_at_boundary.is_finite() {
            return Err(TreeError::malformed(format!(
                "track {} has non-finite energy",
                self.track_id
            )));
        }
        Ok(())
    }

    /// Negates one coordinate of every position the track carries.
    pub(crate) fn mirror(&mut self, axis: usize) {
        self.position[axis] = -self.position[axis];
        self.vertex[axis] = -self.vertex[axis];
        self.boundary_position[axis] = -self.boundary_position[axis];
    }
}

/// An energy deposit in one detector cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    /// Detector cell id
    pub detid: u32,

    /// Hit position [x, y, z] in cm
    pub position: Vector3<f64>,

    /// Deposited energy (GeV)
    pub energy: f64,

    /// Track that produced the deposit
    pub track_id: TrackId,
}

impl HitRecord {
    /// Creates a hit record.
    pub fn new(detid: u32, position: Vector3<f64>, energy: f64, track_id: TrackId) -> Self {
        Self {
            detid,
            position,
            energy,
            track_id,
        }
    }

    /// Checks that energy and coordinates are finite.
    pub fn validate(&self) -> Result<()> {
        if !self.energy.is_finite() || !self.position.iter().all(|c| c.is_finite()) {
            return Err(TreeError::malformed(format!(
                "hit in cell {} of track {} has non-finite values",
                self.detid, self.track_id
            )));
        }
        Ok(())
    }

    pub(crate) fn mirror(&mut self, axis: usize) {
        self.position[axis] = -self.position[axis];
    }
}
