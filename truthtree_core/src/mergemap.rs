//! Merge map export for linking viewers.
//!
//! Collapsing a decay tree merges every track below a top-level track into
//! it. A [`MergeMap`] records, per top-level track, which track ids were
//! merged, so a front-end showing the merged and unmerged trees side by side
//! can toggle the matching tracks together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::records::TrackId;
use crate::truth_tree::{ShowerTree, ROOT};

/// Top-level track id -> ids of every track in its subtree (pre-order,
/// itself first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeMap {
    pub entries: BTreeMap<TrackId, Vec<TrackId>>,
}

impl MergeMap {
    /// Collects the merge map of a pruned tree.
    pub fn from_tree(tree: &ShowerTree) -> Self {
        let entries = tree
            .children_of(ROOT)
            .filter_map(|top| {
                let id = top.track_id()?;
                let merged = tree.traverse(top.id()).filter_map(|n| n.track_id()).collect();
                Some((id, merged))
            })
            .collect();
        Self { entries }
    }

    /// Tracks merged into `top`.
    pub fn merged(&self, top: TrackId) -> Option<&[TrackId]> {
        self.entries.get(&top).map(Vec::as_slice)
    }

    /// Top-level track that `track_id` was merged into.
    pub fn owner_of(&self, track_id: TrackId) -> Option<TrackId> {
        self.entries
            .iter()
            .find(|(_, merged)| merged.contains(&track_id))
            .map(|(top, _)| *top)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object with string keys and string arrays, as the legend-linking
    /// script expects.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .entries
            .iter()
            .map(|(top, merged)| {
                let ids = merged.iter().map(|id| serde_json::Value::from(id.to_string())).collect();
                (top.to_string(), serde_json::Value::Array(ids))
            })
            .collect();
        serde_json::Value::Object(object)
    }

    /// JavaScript declaration `var <name> = {...}` for embedding in HTML.
    pub fn to_js(&self, var_name: &str) -> String {
        let mut lines = vec![format!("var {} = {{", var_name)];
        for (top, merged) in &self.entries {
            let ids: Vec<String> = merged.iter().map(|id| format!("\"{}\"", id)).collect();
            lines.push(format!("\"{}\" : [{}],", top, ids.join(",")));
        }
        lines.push("}".to_string());
        lines.join("\n    ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{HitRecord, TrackRecord};
    use nalgebra::Vector3;

    fn tree() -> ShowerTree {
        let tracks = vec![
            TrackRecord::new(1, None).with_hits(false),
            TrackRecord::new(2, Some(1)).with_hits(true),
            TrackRecord::new(3, Some(2)).with_hits(true),
            TrackRecord::new(4, None).with_hits(true),
            TrackRecord::new(5, Some(4)).with_hits(false),
        ];
        let hits = vec![
            HitRecord::new(1, Vector3::zeros(), 1.0, 2),
            HitRecord::new(2, Vector3::zeros(), 1.0, 3),
            HitRecord::new(3, Vector3::zeros(), 1.0, 4),
        ];
        ShowerTree::build(&tracks, &hits).unwrap()
    }

    #[test]
    fn test_merge_map_collects_subtrees() {
        let map = MergeMap::from_tree(&tree());

        assert_eq!(map.len(), 2);
        assert_eq!(map.merged(1), Some(&[1, 2, 3][..]));
        assert_eq!(map.merged(4), Some(&[4][..]));
        assert_eq!(map.owner_of(3), Some(1));
        assert_eq!(map.owner_of(5), None);
    }

    #[test]
    fn test_merge_map_js() {
        let js = MergeMap::from_tree(&tree()).to_js("mergemap");
        assert!(js.starts_with("var mergemap = {"));
        assert!(js.contains("\"1\" : [\"1\",\"2\",\"3\"],"));
        assert!(js.contains("\"4\" : [\"4\"],"));
        assert!(js.ends_with('}'));
    }

    #[test]
    fn test_merge_map_json() {
        let json = MergeMap::from_tree(&tree()).to_json();
        assert_eq!(json["1"], serde_json::json!(["1", "2", "3"]));
        assert_eq!(json["4"], serde_json::json!(["4"]));
    }

    #[test]
    fn test_empty_tree_has_empty_map() {
        assert!(MergeMap::from_tree(&ShowerTree::empty()).is_empty());
    }
}
