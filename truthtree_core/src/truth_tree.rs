//! The "TREE" Engine - Decay Tree Reconstruction & Pruning
//!
//! Turns the flat per-event track table (each track naming its parent) into
//! a hierarchy rooted at a synthetic node, attaches hits to their owning
//! tracks, and prunes every branch that deposits no energy.
//!
//! Nodes live in an arena (`Vec<TrackNode>`) and refer to each other by
//! [`NodeId`], so the parent/child back-references never fight ownership.
//!
//! The build pipeline:
//! 1. Node construction (id -> node lookup)
//! 2. Hit attachment (hits grouped by owner in one pass)
//! 3. Linking (unresolved parents hang off the synthetic root)
//! 4. Marking (walk up from every hit-bearing node)
//! 5. Excision (unmarked nodes leave their parent's child list)
//! 6. Finalization (bottom-up aggregates)

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, TreeError};
use crate::records::{HitRecord, TrackId, TrackRecord};

/// Index of a node inside a [`ShowerTree`] arena.
///
/// Only meaningful for the tree that produced it.
pub type NodeId = usize;

/// The synthetic root always sits at index 0.
pub const ROOT: NodeId = 0;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// What to do with a hit that no track accepts.
///
/// A hit is orphaned when its owner id is unknown, or when the owner's
/// `has_hits` flag is false. Exactly one policy is in force per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrphanPolicy {
    /// Fail the build with [`TreeError::OrphanHit`]
    #[default]
    Reject,
    /// Discard the hit and count it in [`ShowerTree::dropped_hits`]
    Drop,
}

impl std::str::FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(OrphanPolicy::Reject),
            "drop" => Ok(OrphanPolicy::Drop),
            _ => Err(format!("Unknown orphan policy: {}", s)),
        }
    }
}

/// Configuration for [`ShowerTree::build_with`]
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Handling of hits without an accepting track (default: Reject)
    pub orphan_policy: OrphanPolicy,
}

// ============================================================================
// NODE
// ============================================================================

/// Lifecycle of a node during one build.
///
/// `Unbuilt -> Linked -> Marked -> {Pruned | Retained}`; no node re-enters an
/// earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeState {
    #[default]
    Unbuilt,
    Linked,
    Marked,
    Pruned,
    Retained,
}

/// Hit statistics summed over a node and all of its descendants.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aggregate {
    hit_count: usize,
    energy: f64,
    weighted_sum: Vector3<f64>,
    position_sum: Vector3<f64>,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            hit_count: 0,
            energy: 0.0,
            weighted_sum: Vector3::zeros(),
            position_sum: Vector3::zeros(),
        }
    }
}

impl Aggregate {
    fn from_hits(hits: &[HitRecord]) -> Self {
        hits.iter().fold(Self::default(), |mut acc, hit| {
            acc.hit_count += 1;
            acc.energy += hit.energy;
            acc.weighted_sum += hit.position * hit.energy;
            acc.position_sum += hit.position;
            acc
        })
    }

    fn centroid(&self) -> Option<Vector3<f64>> {
        if self.hit_count == 0 {
            None
        } else if self.energy != 0.0 {
            Some(self.weighted_sum / self.energy)
        } else {
            Some(self.position_sum / self.hit_count as f64)
        }
    }

    fn absorb(&mut self, other: &Aggregate) {
        self.hit_count += other.hit_count;
        self.energy += other.energy;
        self.weighted_sum += other.weighted_sum;
        self.position_sum += other.position_sum;
    }
}

/// One track in the decay tree, or the synthetic root.
#[derive(Debug, Clone, Default)]
pub struct TrackNode {
    pub(crate) id: NodeId,
    pub(crate) track: Option<TrackRecord>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) hits: Vec<HitRecord>,
    pub(crate) keep: bool,
    pub(crate) state: NodeState,
    aggregate: Aggregate,
}

impl TrackNode {
    fn synthetic_root() -> Self {
        Self {
            id: ROOT,
            keep: true,
            state: NodeState::Retained,
            ..Default::default()
        }
    }

    fn from_record(id: NodeId, track: TrackRecord) -> Self {
        Self {
            id,
            track: Some(track),
            ..Default::default()
        }
    }

    /// Arena index of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The track record, `None` for a synthetic root.
    pub fn track(&self) -> Option<&TrackRecord> {
        self.track.as_ref()
    }

    /// Track id, `None` for a synthetic root.
    pub fn track_id(&self) -> Option<TrackId> {
        self.track.as_ref().map(|t| t.track_id)
    }

    pub fn is_root(&self) -> bool {
        self.track.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in input order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Hits owned directly by this track.
    pub fn hits(&self) -> &[HitRecord] {
        &self.hits
    }

    /// Number of hits owned directly by this track.
    pub fn nhits(&self) -> usize {
        self.hits.len()
    }

    pub fn keep(&self) -> bool {
        self.keep
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Hits owned by this node and all its descendants.
    pub fn hit_count(&self) -> usize {
        self.aggregate.hit_count
    }

    /// Total deposited energy of the subtree.
    pub fn energy_sum(&self) -> f64 {
        self.aggregate.energy
    }

    /// Energy-weighted average hit position over the subtree.
    ///
    /// Falls back to the plain mean when every deposit has zero energy.
    pub fn centroid(&self) -> Result<Vector3<f64>> {
        self.aggregate
            .centroid()
            .ok_or_else(|| TreeError::empty(self))
    }

    /// Energy-weighted average of the hits this track owns directly.
    pub fn own_centroid(&self) -> Result<Vector3<f64>> {
        Aggregate::from_hits(&self.hits)
            .centroid()
            .ok_or_else(|| TreeError::empty(self))
    }
}

impl std::fmt::Display for TrackNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.track_id() {
            Some(id) => write!(f, "track {}", id),
            None => write!(f, "root"),
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

/// A pruned decay tree for one event.
///
/// Built once by [`ShowerTree::build`]; afterwards only read, split, or
/// mirrored. Each tree owns its node set exclusively, so independent events
/// can be built on separate threads.
#[derive(Debug, Clone)]
pub struct ShowerTree {
    pub(crate) nodes: Vec<TrackNode>,
    pub(crate) index: HashMap<TrackId, NodeId>,
    dropped_hits: usize,
}

impl Default for ShowerTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl ShowerTree {
    /// A tree holding only a synthetic root.
    pub fn empty() -> Self {
        Self {
            nodes: vec![TrackNode::synthetic_root()],
            index: HashMap::new(),
            dropped_hits: 0,
        }
    }

    /// Builds and prunes a tree with the default configuration.
    pub fn build(tracks: &[TrackRecord], hits: &[HitRecord]) -> Result<Self> {
        Self::build_with(tracks, hits, &BuildConfig::default())
    }

    /// Builds and prunes a tree.
    ///
    /// Runs in O(T + H) plus one O(depth) walk per hit-bearing track. The
    /// input slices are not modified.
    pub fn build_with(
        tracks: &[TrackRecord],
        hits: &[HitRecord],
        config: &BuildConfig,
    ) -> Result<Self> {
        let mut tree = Self::empty();
        tree.nodes.reserve(tracks.len());
        tree.index.reserve(tracks.len());

        // Step 1: one node per track
        for track in tracks {
            track.validate()?;
            let id = tree.nodes.len();
            if tree.index.insert(track.track_id, id).is_some() {
                return Err(TreeError::malformed(format!(
                    "duplicate track id {}",
                    track.track_id
                )));
            }
            tree.nodes.push(TrackNode::from_record(id, track.clone()));
        }

        // Step 2: group hits by owner, then hand each group to its track
        let mut grouped: HashMap<NodeId, Vec<HitRecord>> = HashMap::new();
        for (hit_index, hit) in hits.iter().enumerate() {
            hit.validate()?;
            match tree.accepting_node(hit.track_id) {
                Some(owner) => grouped.entry(owner).or_default().push(hit.clone()),
                None => match config.orphan_policy {
                    OrphanPolicy::Reject => {
                        return Err(TreeError::OrphanHit {
                            hit_index,
                            owner: hit.track_id,
                        })
                    }
                    OrphanPolicy::Drop => tree.dropped_hits += 1,
                },
            }
        }
        for (owner, owned) in grouped {
            tree.nodes[owner].hits = owned;
        }

        // Step 3: bidirectional links
        tree.link();
        tree.check_reachable()?;

        // Steps 4-6
        tree.prune();

        Ok(tree)
    }

    /// Node that takes ownership of hits claiming `track_id`, if any.
    fn accepting_node(&self, track_id: TrackId) -> Option<NodeId> {
        let id = *self.index.get(&track_id)?;
        let accepts = self.nodes[id].track.as_ref().is_some_and(|t| t.has_hits);
        accepts.then_some(id)
    }

    fn link(&mut self) {
        for id in 1..self.nodes.len() {
            let parent = self.nodes[id]
                .track
                .as_ref()
                .and_then(|t| t.parent_id)
                .and_then(|pid| self.index.get(&pid).copied())
                .unwrap_or(ROOT);
            self.nodes[id].parent = Some(parent);
            self.nodes[parent].children.push(id);
            self.nodes[id].state = NodeState::Linked;
        }
    }

    /// Every node must hang below the root; a parent cycle breaks that.
    fn check_reachable(&self) -> Result<()> {
        let reached = self.traverse(ROOT).count();
        if reached == self.nodes.len() {
            return Ok(());
        }

        let mut seen = vec![false; self.nodes.len()];
        for node in self.traverse(ROOT) {
            seen[node.id] = true;
        }
        let stranded: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| !seen[n.id])
            .take(5)
            .map(|n| n.to_string())
            .collect();
        Err(TreeError::malformed(format!(
            "parent cycle detected, unreachable: {}",
            stranded.join(", ")
        )))
    }

    /// Removes every branch without hits and re-derives aggregates.
    ///
    /// Returns the number of excised track nodes. Calling it again on a
    /// pruned tree removes nothing.
    pub fn prune(&mut self) -> usize {
        let attached: Vec<NodeId> = self
            .traverse(ROOT)
            .map(|n| n.id)
            .filter(|&id| id != ROOT)
            .collect();

        for &id in &attached {
            let node = &mut self.nodes[id];
            node.keep = false;
            if node.state == NodeState::Linked {
                node.state = NodeState::Marked;
            }
        }

        for &id in &attached {
            if self.nodes[id].hits.is_empty() {
                continue;
            }
            let mut cursor = Some(id);
            while let Some(current) = cursor {
                // An already marked node has all its ancestors marked too
                if current == ROOT || self.nodes[current].keep {
                    break;
                }
                self.nodes[current].keep = true;
                cursor = self.nodes[current].parent;
            }
        }

        let mut removed = 0;
        for &id in &attached {
            if self.nodes[id].keep {
                if self.nodes[id].state == NodeState::Marked {
                    self.nodes[id].state = NodeState::Retained;
                }
                continue;
            }
            if let Some(parent) = self.nodes[id].parent.take() {
                self.nodes[parent].children.retain(|&c| c != id);
            }
            let node = &mut self.nodes[id];
            node.children.clear();
            node.state = NodeState::Pruned;
            if let Some(track_id) = node.track_id() {
                self.index.remove(&track_id);
            }
            removed += 1;
        }

        self.recompute_aggregates();
        removed
    }

    /// Bottom-up pass over the attached nodes.
    pub(crate) fn recompute_aggregates(&mut self) {
        let order: Vec<NodeId> = self.traverse(ROOT).map(|n| n.id).collect();
        for &id in &order {
            self.nodes[id].aggregate = Aggregate::from_hits(&self.nodes[id].hits);
        }
        // Reversed pre-order visits children before their parents
        for &id in order.iter().rev() {
            if let Some(parent) = self.nodes[id].parent {
                let child = self.nodes[id].aggregate;
                self.nodes[parent].aggregate.absorb(&child);
            }
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// The synthetic root.
    pub fn root(&self) -> &TrackNode {
        &self.nodes[ROOT]
    }

    /// Looks up a node by arena index.
    pub fn node(&self, id: NodeId) -> Result<&TrackNode> {
        self.nodes.get(id).ok_or(TreeError::UnknownNode(id))
    }

    /// Looks up a retained node by track id.
    pub fn find(&self, track_id: TrackId) -> Option<&TrackNode> {
        self.index.get(&track_id).map(|&id| &self.nodes[id])
    }

    /// Children of a node as node references.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &TrackNode> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(move |n| n.children.iter().map(move |&c| &self.nodes[c]))
    }

    /// Number of retained track nodes (the root excluded).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Hits discarded under [`OrphanPolicy::Drop`].
    pub fn dropped_hits(&self) -> usize {
        self.dropped_hits
    }

    /// Lazy pre-order walk starting at (and including) `from`.
    ///
    /// Unknown or pruned start nodes yield nothing.
    pub fn traverse(&self, from: NodeId) -> Traverse<'_> {
        let start = self
            .nodes
            .get(from)
            .filter(|n| n.state != NodeState::Pruned)
            .map(|n| n.id);
        Traverse {
            tree: self,
            stack: start.into_iter().collect(),
        }
    }

    /// All retained track nodes in pre-order, root excluded.
    pub fn tracks(&self) -> impl Iterator<Item = &TrackNode> + '_ {
        self.traverse(ROOT).filter(|n| !n.is_root())
    }

    /// Every hit owned by `from` or its descendants, in traversal order.
    pub fn all_hits(&self, from: NodeId) -> impl Iterator<Item = &HitRecord> + '_ {
        self.traverse(from).flat_map(|n| n.hits.iter())
    }

    /// Walk from `from` up to, but excluding, the synthetic root.
    pub fn ancestors(&self, from: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            cursor: self.nodes.get(from).map(|n| n.id),
        }
    }

    /// Number of edges between the root and `id`.
    ///
    /// Pruned nodes are no longer part of the tree and fail like unknown ones.
    pub fn depth(&self, id: NodeId) -> Result<usize> {
        if self.node(id)?.state == NodeState::Pruned {
            return Err(TreeError::UnknownNode(id));
        }
        Ok(self.ancestors(id).count())
    }

    /// Axis-aligned bounding box `(min, max)` of the subtree's hits.
    pub fn hit_bounds(&self, from: NodeId) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let node = self.node(from)?;
        let mut hits = self.all_hits(from);
        let first = hits.next().ok_or_else(|| TreeError::empty(node))?;
        Ok(hits.fold((first.position, first.position), |(lo, hi), hit| {
            (lo.inf(&hit.position), hi.sup(&hit.position))
        }))
    }
}

/// Pre-order iterator returned by [`ShowerTree::traverse`].
#[derive(Debug, Clone)]
pub struct Traverse<'a> {
    tree: &'a ShowerTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a TrackNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id];
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Upward iterator returned by [`ShowerTree::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a ShowerTree,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TrackNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor.filter(|&id| id != ROOT)?;
        let node = &self.tree.nodes[id];
        self.cursor = node.parent;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NO_TRACK;
    use approx::assert_relative_eq;

    fn hit(detid: u32, x: f64, y: f64, z: f64, energy: f64, owner: TrackId) -> HitRecord {
        HitRecord::new(detid, Vector3::new(x, y, z), energy, owner)
    }

    fn track(id: TrackId, parent: Option<TrackId>, has_hits: bool) -> TrackRecord {
        TrackRecord::new(id, parent).with_hits(has_hits)
    }

    fn child_ids(tree: &ShowerTree, id: NodeId) -> Vec<TrackId> {
        tree.children_of(id).filter_map(|n| n.track_id()).collect()
    }

    #[test]
    fn test_prunes_hitless_sibling() {
        let tracks = vec![
            track(1, None, false),
            track(2, Some(1), true),
            track(3, Some(1), false),
        ];
        let hits = vec![hit(100, 0.0, 0.0, 330.0, 0.2, 2)];

        let tree = ShowerTree::build(&tracks, &hits).unwrap();

        assert_eq!(child_ids(&tree, ROOT), vec![1]);
        let one = tree.find(1).unwrap();
        assert_eq!(child_ids(&tree, one.id()), vec![2]);
        assert!(tree.find(3).is_none());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_all_hitless_yields_bare_root() {
        let tracks = vec![track(1, None, false), track(2, Some(1), false)];
        let tree = ShowerTree::build(&tracks, &[]).unwrap();

        assert!(tree.root().children().is_empty());
        assert!(tree.is_empty());
        assert_eq!(tree.root().hit_count(), 0);
    }

    #[test]
    fn test_centroid_energy_weighted() {
        let tracks = vec![track(1, None, true)];
        let hits = vec![
            hit(1, 0.0, 0.0, 0.0, 1.0, 1),
            hit(2, 2.0, 0.0, 0.0, 1.0, 1),
        ];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();
        let c = tree.find(1).unwrap().centroid().unwrap();

        assert_relative_eq!(c.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.z, 0.0, epsilon = 1e-12);

        let hits = vec![
            hit(1, 0.0, 0.0, 0.0, 3.0, 1),
            hit(2, 4.0, 0.0, 0.0, 1.0, 1),
        ];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();
        let c = tree.find(1).unwrap().centroid().unwrap();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_zero_energy_uses_plain_mean() {
        let tracks = vec![track(1, None, true)];
        let hits = vec![
            hit(1, 0.0, 2.0, 0.0, 0.0, 1),
            hit(2, 0.0, 4.0, 0.0, 0.0, 1),
        ];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();
        let c = tree.root().centroid().unwrap();
        assert_relative_eq!(c.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_on_empty_subtree_fails() {
        let tree = ShowerTree::build(&[track(1, None, false)], &[]).unwrap();
        assert!(matches!(
            tree.root().centroid(),
            Err(TreeError::EmptySubtree(_))
        ));
        assert!(tree.hit_bounds(ROOT).is_err());
    }

    #[test]
    fn test_duplicate_track_ids_rejected() {
        let tracks = vec![track(1, None, false), track(1, None, true)];
        let result = ShowerTree::build(&tracks, &[]);
        assert!(matches!(result, Err(TreeError::MalformedInput(_))));
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let tracks = vec![track(1, Some(2), true), track(2, Some(1), false)];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 1)];
        let result = ShowerTree::build(&tracks, &hits);
        assert!(matches!(result, Err(TreeError::MalformedInput(_))));
    }

    #[test]
    fn test_unresolved_parent_attaches_to_root() {
        let tracks = vec![track(5, Some(99), true)];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 5)];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();
        assert_eq!(child_ids(&tree, ROOT), vec![5]);
    }

    #[test]
    fn test_parent_defined_after_child() {
        let tracks = vec![track(2, Some(1), true), track(1, None, false)];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 2)];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();

        assert_eq!(child_ids(&tree, ROOT), vec![1]);
        let two = tree.find(2).unwrap();
        assert_eq!(tree.depth(two.id()).unwrap(), 2);
        assert_eq!(two.parent(), Some(tree.find(1).unwrap().id()));
    }

    #[test]
    fn test_orphan_hit_rejected_by_default() {
        let tracks = vec![track(1, None, true)];
        let hits = vec![
            hit(1, 0.0, 0.0, 0.0, 1.0, 1),
            hit(2, 0.0, 0.0, 0.0, 1.0, 42),
        ];
        let result = ShowerTree::build(&tracks, &hits);
        assert_eq!(
            result.unwrap_err(),
            TreeError::OrphanHit {
                hit_index: 1,
                owner: 42
            }
        );
    }

    #[test]
    fn test_hit_on_track_without_hits_flag_is_orphan() {
        let tracks = vec![track(1, None, false)];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 1)];
        assert!(matches!(
            ShowerTree::build(&tracks, &hits),
            Err(TreeError::OrphanHit { .. })
        ));
    }

    #[test]
    fn test_orphan_policies_are_exclusive() {
        let tracks = vec![track(1, None, true)];
        let hits = vec![
            hit(1, 0.0, 0.0, 0.0, 1.0, 1),
            hit(2, 0.0, 0.0, 0.0, 1.0, 42),
        ];

        let drop = BuildConfig {
            orphan_policy: OrphanPolicy::Drop,
        };
        let tree = ShowerTree::build_with(&tracks, &hits, &drop).unwrap();
        assert_eq!(tree.dropped_hits(), 1);
        assert_eq!(tree.all_hits(ROOT).count(), 1);

        // The same input cannot both succeed and fail: Reject refuses it
        let reject = BuildConfig::default();
        assert!(ShowerTree::build_with(&tracks, &hits, &reject).is_err());
    }

    #[test]
    fn test_orphan_policy_from_str() {
        assert_eq!("drop".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Drop));
        assert_eq!("Reject".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Reject));
        assert!("maybe".parse::<OrphanPolicy>().is_err());
    }

    #[test]
    fn test_hit_count_aggregates_descendants() {
        let tracks = vec![
            track(1, None, true),
            track(2, Some(1), true),
            track(3, Some(2), true),
        ];
        let hits = vec![
            hit(1, 0.0, 0.0, 0.0, 1.0, 1),
            hit(2, 0.0, 0.0, 0.0, 1.0, 2),
            hit(3, 0.0, 0.0, 0.0, 1.0, 3),
            hit(4, 0.0, 0.0, 0.0, 1.0, 3),
        ];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();

        assert_eq!(tree.find(3).unwrap().hit_count(), 2);
        assert_eq!(tree.find(2).unwrap().hit_count(), 3);
        assert_eq!(tree.find(1).unwrap().hit_count(), 4);
        assert_eq!(tree.root().hit_count(), 4);
        assert_relative_eq!(tree.root().energy_sum(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_traverse_is_preorder_and_restartable() {
        let tracks = vec![
            track(1, None, true),
            track(2, Some(1), true),
            track(3, Some(1), true),
            track(4, Some(2), true),
        ];
        let hits: Vec<HitRecord> = (1..=4).map(|i| hit(i, 0.0, 0.0, 0.0, 1.0, i)).collect();
        let tree = ShowerTree::build(&tracks, &hits).unwrap();

        let order: Vec<Option<TrackId>> = tree.traverse(ROOT).map(|n| n.track_id()).collect();
        assert_eq!(order, vec![None, Some(1), Some(2), Some(4), Some(3)]);

        let again: Vec<Option<TrackId>> = tree.traverse(ROOT).map(|n| n.track_id()).collect();
        assert_eq!(order, again);

        let detids: Vec<u32> = tree.all_hits(ROOT).map(|h| h.detid).collect();
        assert_eq!(detids, vec![1, 2, 4, 3]);
    }

    #[test]
    fn test_states_after_build() {
        let tracks = vec![track(1, None, true), track(2, None, false)];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 1)];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();

        assert_eq!(tree.node(1).unwrap().state(), NodeState::Retained);
        assert_eq!(tree.node(2).unwrap().state(), NodeState::Pruned);
        assert!(!tree.node(2).unwrap().keep());
        assert_eq!(tree.traverse(2).count(), 0);
        assert!(matches!(tree.node(17), Err(TreeError::UnknownNode(17))));
    }

    #[test]
    fn test_depth_of_pruned_node_fails() {
        let tracks = vec![
            track(1, None, false),
            track(2, Some(1), true),
            track(3, Some(1), false),
        ];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 2)];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();

        assert_eq!(tree.depth(2).unwrap(), 2);
        assert_eq!(tree.node(3).unwrap().state(), NodeState::Pruned);
        assert!(matches!(tree.depth(3), Err(TreeError::UnknownNode(3))));
    }

    #[test]
    fn test_hits_on_reserved_owner_follow_policy() {
        let tracks = vec![track(1, None, true)];
        let hits = vec![
            hit(1, 0.0, 0.0, 0.0, 1.0, 1),
            hit(2, 0.0, 0.0, 0.0, 1.0, NO_TRACK),
        ];

        assert!(matches!(
            ShowerTree::build(&tracks, &hits),
            Err(TreeError::OrphanHit { hit_index: 1, owner: NO_TRACK })
        ));

        let config = BuildConfig {
            orphan_policy: OrphanPolicy::Drop,
        };
        let tree = ShowerTree::build_with(&tracks, &hits, &config).unwrap();
        assert_eq!(tree.dropped_hits(), 1);
        assert_eq!(tree.root().hit_count(), 1);
    }

    #[test]
    fn test_prune_is_idempotent() {
        let tracks = vec![
            track(1, None, false),
            track(2, Some(1), true),
            track(3, Some(1), false),
        ];
        let hits = vec![hit(1, 0.0, 0.0, 0.0, 1.0, 2)];
        let mut tree = ShowerTree::build(&tracks, &hits).unwrap();
        let before: Vec<NodeId> = tree.traverse(ROOT).map(|n| n.id()).collect();

        assert_eq!(tree.prune(), 0);
        let after: Vec<NodeId> = tree.traverse(ROOT).map(|n| n.id()).collect();
        assert_eq!(before, after);
        assert_eq!(tree.node(2).unwrap().state(), NodeState::Retained);
    }

    #[test]
    fn test_ancestors_and_bounds() {
        let tracks = vec![
            track(1, None, false),
            track(2, Some(1), false),
            track(3, Some(2), true),
        ];
        let hits = vec![
            hit(1, -1.0, 2.0, 330.0, 1.0, 3),
            hit(2, 3.0, -2.0, 340.0, 1.0, 3),
        ];
        let tree = ShowerTree::build(&tracks, &hits).unwrap();
        let leaf = tree.find(3).unwrap();

        let up: Vec<TrackId> = tree.ancestors(leaf.id()).filter_map(|n| n.track_id()).collect();
        assert_eq!(up, vec![3, 2, 1]);

        let (lo, hi) = tree.hit_bounds(ROOT).unwrap();
        assert_eq!(lo, Vector3::new(-1.0, -2.0, 330.0));
        assert_eq!(hi, Vector3::new(3.0, 2.0, 340.0));
    }

    #[test]
    fn test_inputs_not_mutated() {
        let tracks = vec![track(1, None, true), track(2, Some(1), false)];
        let hits = vec![hit(1, 1.0, 1.0, 1.0, 1.0, 1)];
        let tracks_before = tracks.clone();
        let hits_before = hits.clone();

        let _ = ShowerTree::build(&tracks, &hits).unwrap();
        assert_eq!(tracks, tracks_before);
        assert_eq!(hits, hits_before);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Forest shape: parent index strictly smaller than the child index,
        /// or no parent at all.
        fn event() -> impl Strategy<Value = (Vec<TrackRecord>, Vec<HitRecord>)> {
            prop::collection::vec((any::<prop::sample::Index>(), any::<bool>(), any::<bool>(), 0usize..4), 1..40)
                .prop_map(|specs| {
                    let mut tracks = Vec::new();
                    let mut hits = Vec::new();
                    for (i, (parent_pick, is_primary, has_hits, nhits)) in specs.into_iter().enumerate() {
                        let id = i as TrackId + 1;
                        let parent = if i == 0 || is_primary {
                            None
                        } else {
                            Some(parent_pick.index(i) as TrackId + 1)
                        };
                        tracks.push(track(id, parent, has_hits));
                        if has_hits {
                            for _ in 0..nhits {
                                let detid = hits.len() as u32;
                                hits.push(hit(detid, i as f64, 0.0, 320.0, 0.5, id));
                            }
                        }
                    }
                    (tracks, hits)
                })
        }

        proptest! {
            #[test]
            fn prop_retained_nodes_have_hits((tracks, hits) in event()) {
                let tree = ShowerTree::build(&tracks, &hits).unwrap();
                for node in tree.tracks() {
                    prop_assert!(node.hit_count() >= 1);
                    prop_assert!(node.keep());
                }
            }

            #[test]
            fn prop_hits_preserved((tracks, hits) in event()) {
                let tree = ShowerTree::build(&tracks, &hits).unwrap();
                let mut seen: Vec<u32> = tree.all_hits(ROOT).map(|h| h.detid).collect();
                seen.sort_unstable();
                let expected: Vec<u32> = (0..hits.len() as u32).collect();
                prop_assert_eq!(seen, expected);
                prop_assert_eq!(tree.root().hit_count(), hits.len());
            }

            #[test]
            fn prop_prune_idempotent((tracks, hits) in event()) {
                let mut tree = ShowerTree::build(&tracks, &hits).unwrap();
                let size = tree.len();
                prop_assert_eq!(tree.prune(), 0);
                prop_assert_eq!(tree.len(), size);
            }

            #[test]
            fn prop_leaves_own_hits((tracks, hits) in event()) {
                let tree = ShowerTree::build(&tracks, &hits).unwrap();
                for node in tree.tracks().filter(|n| n.children().is_empty()) {
                    prop_assert!(node.nhits() >= 1);
                }
            }
        }
    }
}
