//! Error types for tree reconstruction and queries.

use crate::records::TrackId;
use thiserror::Error;

/// Errors raised by the tree builder and by aggregate queries.
///
/// All errors are raised synchronously by the call that detects them.
/// Reconstruction is deterministic, so retrying a failed build never helps.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    /// Event arrays violate a structural constraint (duplicate ids, parent cycles,
    /// non-finite values).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A hit that no track accepts as owner.
    #[error("Orphan hit #{hit_index}: no track {owner} accepts hits")]
    OrphanHit {
        /// Position of the hit in the input sequence
        hit_index: usize,
        /// Track id the hit claims as its owner
        owner: TrackId,
    },

    /// Centroid (or another hit-derived quantity) requested on a subtree without hits.
    #[error("Subtree rooted at {0} has no hits")]
    EmptySubtree(String),

    /// A node handle that does not belong to this tree.
    #[error("Unknown node index {0}")]
    UnknownNode(usize),
}

impl TreeError {
    /// Creates a malformed input error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Creates an empty subtree error naming the subtree's top node.
    pub fn empty(node: impl std::fmt::Display) -> Self {
        Self::EmptySubtree(node.to_string())
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, TreeError>;
