//! JSON exporter for processed events.
//!
//! Writes scenes, merge maps and counters of a batch to one JSON file for
//! web front-ends, plus an optional JavaScript merge-map snippet.

use serde::Serialize;
use std::fs::File;
use std::io::Write;

use crate::runner::{BatchSummary, EventResult, EventStats, EventView};

/// Export of a single event.
#[derive(Debug, Clone, Serialize)]
pub struct EventExport {
    pub index: usize,
    pub passed: bool,
    pub stats: EventStats,
    pub views: Vec<EventView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl From<&EventResult> for EventExport {
    fn from(result: &EventResult) -> Self {
        Self {
            index: result.index,
            passed: result.passed,
            stats: result.stats.clone(),
            views: result.views.clone(),
            failure_reason: result.failure_reason.clone(),
        }
    }
}

/// Complete batch export.
#[derive(Debug, Clone, Serialize)]
pub struct TruthExport {
    /// Where the events came from (input path or "generated")
    pub source: String,

    /// Seed used for generated events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub split_endcaps: bool,
    pub flip: bool,

    /// All events, in input order
    pub events: Vec<EventExport>,

    pub passed: usize,
    pub failed: usize,
}

impl TruthExport {
    /// Creates a new export container.
    pub fn new(source: &str, seed: Option<u64>) -> Self {
        Self {
            source: source.to_string(),
            seed,
            split_endcaps: false,
            flip: false,
            events: Vec::new(),
            passed: 0,
            failed: 0,
        }
    }

    /// Records how the views were produced.
    pub fn with_endcaps(mut self, split_endcaps: bool, flip: bool) -> Self {
        self.split_endcaps = split_endcaps;
        self.flip = flip;
        self
    }

    /// Adds an event.
    pub fn add_event(&mut self, result: &EventResult) {
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.events.push(EventExport::from(result));
    }

    /// Adds every event of a batch.
    pub fn add_batch(&mut self, summary: &BatchSummary) {
        for result in &summary.results {
            self.add_event(result);
        }
    }

    /// JavaScript merge-map declarations, one `var` per event view.
    pub fn merge_maps_js(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            for view in &event.views {
                let name = format!("mergemap_{}_{}", event.index, view.label);
                out.push_str(&view.merge_map.to_js(&name));
                out.push_str(";\n");
            }
        }
        out
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Writes the merge-map snippet next to the export.
    pub fn write_js_to_file(&self, path: &str) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.merge_maps_js().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ShowerGenerator;
    use crate::runner::EventRunner;

    fn export() -> TruthExport {
        let events = ShowerGenerator::with_defaults(11).generate_batch(3);
        let summary = EventRunner::default().run_batch(&events);
        let mut export = TruthExport::new("generated", Some(11));
        export.add_batch(&summary);
        export
    }

    #[test]
    fn test_counts() {
        let export = export();
        assert_eq!(export.events.len(), 3);
        assert_eq!(export.passed + export.failed, 3);
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(export()).unwrap();
        assert_eq!(value["source"], "generated");
        assert_eq!(value["seed"], 11);
        assert_eq!(value["events"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["events"][0]["views"][0]["label"], "all");
        assert!(value["events"][0].get("failure_reason").is_none());
    }

    #[test]
    fn test_merge_maps_js() {
        let js = export().merge_maps_js();
        assert!(js.contains("var mergemap_0_all = {"));
        assert!(js.contains("var mergemap_2_all = {"));
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join("truthtree_export_test.json");
        let path = path.to_string_lossy().to_string();
        export().write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["events"].as_array().map(Vec::len), Some(3));
        std::fs::remove_file(&path).unwrap();
    }
}
