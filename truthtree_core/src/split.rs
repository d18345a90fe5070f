//! Splitting a tree into independent halves, re-merging, and mirroring.
//!
//! The usual use is separating the two calorimeter endcaps so each can be
//! analysed (or drawn side by side) on its own.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::truth_tree::{NodeId, ShowerTree, TrackNode, ROOT};

/// Coordinate axis for the mirroring transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl ShowerTree {
    /// Partitions the root's immediate children into two new trees.
    ///
    /// Children for which `predicate` holds go to the first tree, the rest to
    /// the second. Only top-level children are redistributed; everything
    /// below them moves along untouched.
    pub fn split<F>(mut self, predicate: F) -> (ShowerTree, ShowerTree)
    where
        F: Fn(&TrackNode) -> bool,
    {
        let (first, second): (Vec<NodeId>, Vec<NodeId>) = self.nodes[ROOT]
            .children
            .iter()
            .copied()
            .partition(|&id| predicate(&self.nodes[id]));

        let mut a = ShowerTree::empty();
        for top in first {
            a.graft(&mut self, top, ROOT);
        }
        a.recompute_aggregates();

        let mut b = ShowerTree::empty();
        for top in second {
            b.graft(&mut self, top, ROOT);
        }
        b.recompute_aggregates();

        (a, b)
    }

    /// Splits into `(positive, negative)` endcaps by the sign of each
    /// top-level track's z position; `flip` mirrors the negative side onto
    /// positive z.
    pub fn split_endcaps(self, flip: bool) -> (ShowerTree, ShowerTree) {
        let (pos, mut neg) = self.split(|node| node.track().is_some_and(|t| t.position.z >= 0.0));
        if flip {
            neg.mirror(Axis::Z);
        }
        (pos, neg)
    }

    /// Puts the top-level children of both trees under one synthetic root,
    /// those of `a` first.
    pub fn merge(mut a: ShowerTree, mut b: ShowerTree) -> Result<ShowerTree> {
        if let Some(clash) = a.index.keys().find(|id| b.index.contains_key(*id)) {
            return Err(TreeError::malformed(format!(
                "track id {} present in both trees",
                clash
            )));
        }

        let mut merged = ShowerTree::empty();
        let tops_a = a.nodes[ROOT].children.clone();
        for top in tops_a {
            merged.graft(&mut a, top, ROOT);
        }
        let tops_b = b.nodes[ROOT].children.clone();
        for top in tops_b {
            merged.graft(&mut b, top, ROOT);
        }
        merged.recompute_aggregates();
        Ok(merged)
    }

    /// Negates one coordinate on every node and hit of the tree.
    ///
    /// Topology and all other attributes are left alone; applying it twice
    /// restores the original coordinates exactly.
    pub fn mirror(&mut self, axis: Axis) {
        let axis = axis.index();
        let attached: Vec<NodeId> = self.traverse(ROOT).map(|n| n.id()).collect();
        for id in attached {
            let node = &mut self.nodes[id];
            if let Some(track) = node.track.as_mut() {
                track.mirror(axis);
            }
            for hit in &mut node.hits {
                hit.mirror(axis);
            }
        }
        self.recompute_aggregates();
    }

    /// Moves the subtree at `top` out of `src` and hangs it below `parent`.
    fn graft(&mut self, src: &mut ShowerTree, top: NodeId, parent: NodeId) {
        let mut stack = vec![(top, parent)];
        while let Some((src_id, new_parent)) = stack.pop() {
            let mut node = std::mem::take(&mut src.nodes[src_id]);
            let id = self.nodes.len();

            for &child in node.children.iter().rev() {
                stack.push((child, id));
            }

            node.id = id;
            node.parent = Some(new_parent);
            node.children.clear();
            if let Some(track_id) = node.track_id() {
                src.index.remove(&track_id);
                self.index.insert(track_id, id);
            }

            self.nodes.push(node);
            self.nodes[new_parent].children.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{HitRecord, TrackId, TrackRecord};
    use nalgebra::Vector3;

    fn endcap_event() -> ShowerTree {
        let tracks = vec![
            TrackRecord::new(1, None).with_hits(true).at(Vector3::new(1.0, 1.0, 330.0)),
            TrackRecord::new(2, None).with_hits(false).at(Vector3::new(-1.0, 2.0, -330.0)),
            TrackRecord::new(3, Some(2)).with_hits(true).at(Vector3::new(-1.0, 2.0, -340.0)),
            TrackRecord::new(4, None).with_hits(true).at(Vector3::new(0.5, 0.5, 325.0)),
        ];
        let hits = vec![
            HitRecord::new(10, Vector3::new(1.0, 1.0, 331.0), 0.1, 1),
            HitRecord::new(11, Vector3::new(-1.5, 2.5, -345.0), 0.2, 3),
            HitRecord::new(12, Vector3::new(0.5, 0.25, 326.0), 0.3, 4),
        ];
        ShowerTree::build(&tracks, &hits).unwrap()
    }

    fn top_ids(tree: &ShowerTree) -> Vec<TrackId> {
        tree.children_of(ROOT).filter_map(|n| n.track_id()).collect()
    }

    #[test]
    fn test_split_endcaps_by_sign() {
        let (pos, neg) = endcap_event().split_endcaps(false);

        assert_eq!(top_ids(&pos), vec![1, 4]);
        assert_eq!(top_ids(&neg), vec![2]);

        // Deeper structure moves with its top-level track
        let two = neg.find(2).unwrap();
        let three = neg.find(3).unwrap();
        assert_eq!(three.parent(), Some(two.id()));
        assert_eq!(two.parent(), Some(ROOT));
        assert_eq!(neg.root().hit_count(), 1);
        assert_eq!(pos.root().hit_count(), 2);
    }

    #[test]
    fn test_split_then_merge_restores_children() {
        let tree = endcap_event();
        let original = top_ids(&tree);
        let hits = tree.root().hit_count();

        let (pos, neg) = tree.split_endcaps(false);
        let merged = ShowerTree::merge(pos, neg).unwrap();

        let mut restored = top_ids(&merged);
        restored.sort_unstable();
        let mut expected = original;
        expected.sort_unstable();
        assert_eq!(restored, expected);
        assert_eq!(merged.root().hit_count(), hits);
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_merge_rejects_shared_ids() {
        let a = endcap_event();
        let b = endcap_event();
        assert!(matches!(
            ShowerTree::merge(a, b),
            Err(TreeError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_flip_mirrors_negative_endcap() {
        let (_, neg) = endcap_event().split_endcaps(true);
        let three = neg.find(3).unwrap();

        assert_eq!(three.track().unwrap().position, Vector3::new(-1.0, 2.0, 340.0));
        assert_eq!(three.hits()[0].position, Vector3::new(-1.5, 2.5, 345.0));
        assert_eq!(three.hits()[0].energy, 0.2);
        assert!(three.centroid().unwrap().z > 0.0);
    }

    #[test]
    fn test_mirror_twice_is_identity() {
        let mut tree = endcap_event();
        let before: Vec<HitRecord> = tree.all_hits(ROOT).cloned().collect();
        let tracks_before: Vec<TrackRecord> = tree.tracks().filter_map(|n| n.track().cloned()).collect();

        tree.mirror(Axis::X);
        assert_ne!(tree.all_hits(ROOT).cloned().collect::<Vec<_>>(), before);
        tree.mirror(Axis::X);

        let after: Vec<HitRecord> = tree.all_hits(ROOT).cloned().collect();
        let tracks_after: Vec<TrackRecord> = tree.tracks().filter_map(|n| n.track().cloned()).collect();
        assert_eq!(before, after);
        assert_eq!(tracks_before, tracks_after);
    }
}
