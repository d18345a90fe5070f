//! Columnar event input adapter.
//!
//! Simulation ntuples store one array per quantity (`simtrack_*` for tracks,
//! `simhit_*` for hits). This module reads those columns from JSON and turns
//! each event into typed [`TrackRecord`]s and [`HitRecord`]s, validating
//! column lengths and id ranges on the way.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::EventError;
use truthtree_core::{HitRecord, TrackId, TrackRecord, NO_TRACK};

/// One event in columnar layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnarEvent {
    pub simtrack_trackid: Vec<i64>,
    pub simtrack_parenttrackid: Vec<i64>,
    pub simtrack_pdgid: Vec<i32>,
    pub simtrack_energy: Vec<f64>,
    pub simtrack_boundary_energy: Vec<f64>,
    pub simtrack_hashits: Vec<bool>,
    pub simtrack_x: Vec<f64>,
    pub simtrack_y: Vec<f64>,
    pub simtrack_z: Vec<f64>,
    pub simtrack_vertex_x: Vec<f64>,
    pub simtrack_vertex_y: Vec<f64>,
    pub simtrack_vertex_z: Vec<f64>,
    pub simtrack_boundary_x: Vec<f64>,
    pub simtrack_boundary_y: Vec<f64>,
    pub simtrack_boundary_z: Vec<f64>,
    pub simtrack_crossedboundary: Vec<bool>,
    pub simtrack_noparent: Vec<bool>,

    pub simhit_detid: Vec<u32>,
    pub simhit_x: Vec<f64>,
    pub simhit_y: Vec<f64>,
    pub simhit_z: Vec<f64>,
    pub simhit_energy: Vec<f64>,
    pub simhit_trackid: Vec<i64>,
}

/// A file of events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFile {
    pub events: Vec<ColumnarEvent>,
}

fn check_len(column: &'static str, expected: usize, found: usize) -> Result<(), EventError> {
    if expected == found {
        Ok(())
    } else {
        Err(EventError::column_length(column, expected, found))
    }
}

fn to_track_id(column: &'static str, row: usize, value: i64) -> Result<TrackId, EventError> {
    TrackId::try_from(value)
        .ok()
        .filter(|&id| id > 0)
        .ok_or(EventError::InvalidValue { column, row, value })
}

/// Hit owner ids outside the track id range can name no track.
fn to_owner_id(value: i64) -> TrackId {
    TrackId::try_from(value)
        .ok()
        .filter(|&id| id > 0)
        .unwrap_or(NO_TRACK)
}

impl ColumnarEvent {
    pub fn track_count(&self) -> usize {
        self.simtrack_trackid.len()
    }

    pub fn hit_count(&self) -> usize {
        self.simhit_detid.len()
    }

    fn validate_columns(&self) -> Result<(), EventError> {
        let n = self.track_count();
        let track_columns = [
            ("simtrack_parenttrackid", self.simtrack_parenttrackid.len()),
            ("simtrack_pdgid", self.simtrack_pdgid.len()),
            ("simtrack_energy", self.simtrack_energy.len()),
            ("simtrack_boundary_energy", self.simtrack_boundary_energy.len()),
            ("simtrack_hashits", self.simtrack_hashits.len()),
            ("simtrack_x", self.simtrack_x.len()),
            ("simtrack_y", self.simtrack_y.len()),
            ("simtrack_z", self.simtrack_z.len()),
            ("simtrack_vertex_x", self.simtrack_vertex_x.len()),
            ("simtrack_vertex_y", self.simtrack_vertex_y.len()),
            ("simtrack_vertex_z", self.simtrack_vertex_z.len()),
            ("simtrack_boundary_x", self.simtrack_boundary_x.len()),
            ("simtrack_boundary_y", self.simtrack_boundary_y.len()),
            ("simtrack_boundary_z", self.simtrack_boundary_z.len()),
            ("simtrack_crossedboundary", self.simtrack_crossedboundary.len()),
            ("simtrack_noparent", self.simtrack_noparent.len()),
        ];
        for (column, len) in track_columns {
            check_len(column, n, len)?;
        }

        let m = self.hit_count();
        let hit_columns = [
            ("simhit_x", self.simhit_x.len()),
            ("simhit_y", self.simhit_y.len()),
            ("simhit_z", self.simhit_z.len()),
            ("simhit_energy", self.simhit_energy.len()),
            ("simhit_trackid", self.simhit_trackid.len()),
        ];
        for (column, len) in hit_columns {
            check_len(column, m, len)?;
        }
        Ok(())
    }

    /// Typed records for the tree builder.
    ///
    /// A track is a primary when `noparent` is set or its parent id is not
    /// positive. Hits whose owner id is not positive get [`NO_TRACK`], so the
    /// builder's orphan policy decides their fate.
    pub fn to_records(&self) -> Result<(Vec<TrackRecord>, Vec<HitRecord>), EventError> {
        self.validate_columns()?;

        let mut tracks = Vec::with_capacity(self.track_count());
        for i in 0..self.track_count() {
            let track_id = to_track_id("simtrack_trackid", i, self.simtrack_trackid[i])?;
            let raw_parent = self.simtrack_parenttrackid[i];
            let parent_id = if self.simtrack_noparent[i] || raw_parent <= 0 {
                None
            } else {
                Some(to_track_id("simtrack_parenttrackid", i, raw_parent)?)
            };

            tracks.push(TrackRecord {
                track_id,
                parent_id,
                pdgid: self.simtrack_pdgid[i],
                energy: self.simtrack_energy[i],
                energy_at_boundary: self.simtrack_boundary_energy[i],
                has_hits: self.simtrack_hashits[i],
                position: Vector3::new(self.simtrack_x[i], self.simtrack_y[i], self.simtrack_z[i]),
                vertex: Vector3::new(
                    self.simtrack_vertex_x[i],
                    self.simtrack_vertex_y[i],
                    self.simtrack_vertex_z[i],
                ),
                boundary_position: Vector3::new(
                    self.simtrack_boundary_x[i],
                    self.simtrack_boundary_y[i],
                    self.simtrack_boundary_z[i],
                ),
                crossed_boundary: self.simtrack_crossedboundary[i],
                no_parent: self.simtrack_noparent[i],
            });
        }

        let mut hits = Vec::with_capacity(self.hit_count());
        for i in 0..self.hit_count() {
            hits.push(HitRecord {
                detid: self.simhit_detid[i],
                position: Vector3::new(self.simhit_x[i], self.simhit_y[i], self.simhit_z[i]),
                energy: self.simhit_energy[i],
                track_id: to_owner_id(self.simhit_trackid[i]),
            });
        }

        Ok((tracks, hits))
    }

    /// Columnar form of typed records (primaries get parent id 0).
    pub fn from_records(tracks: &[TrackRecord], hits: &[HitRecord]) -> Self {
        let mut event = ColumnarEvent::default();
        for t in tracks {
            event.simtrack_trackid.push(i64::from(t.track_id));
            event.simtrack_parenttrackid.push(t.parent_id.map(i64::from).unwrap_or(0));
            event.simtrack_pdgid.push(t.pdgid);
            event.simtrack_energy.push(t.energy);
            event.simtrack_boundary_energy.push(t.energy_at_boundary);
            event.simtrack_hashits.push(t.has_hits);
            event.simtrack_x.push(t.position.x);
            event.simtrack_y.push(t.position.y);
            event.simtrack_z.push(t.position.z);
            event.simtrack_vertex_x.push(t.vertex.x);
            event.simtrack_vertex_y.push(t.vertex.y);
            event.simtrack_vertex_z.push(t.vertex.z);
            event.simtrack_boundary_x.push(t.boundary_position.x);
            event.simtrack_boundary_y.push(t.boundary_position.y);
            event.simtrack_boundary_z.push(t.boundary_position.z);
            event.simtrack_crossedboundary.push(t.crossed_boundary);
            event.simtrack_noparent.push(t.parent_id.is_none());
        }
        for h in hits {
            event.simhit_detid.push(h.detid);
            event.simhit_x.push(h.position.x);
            event.simhit_y.push(h.position.y);
            event.simhit_z.push(h.position.z);
            event.simhit_energy.push(h.energy);
            event.simhit_trackid.push(i64::from(h.track_id));
        }
        event
    }
}

/// Reads an event file.
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<ColumnarEvent>, EventError> {
    let reader = BufReader::new(File::open(path)?);
    let file: EventFile = serde_json::from_reader(reader)?;
    Ok(file.events)
}

/// Writes an event file.
pub fn save_events(path: impl AsRef<Path>, events: &[ColumnarEvent]) -> Result<(), EventError> {
    let file = EventFile {
        events: events.to_vec(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &file)?;
    writer.flush()?;
    Ok(())
}
