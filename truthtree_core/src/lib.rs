//! TruthTree Core - Simulated Decay Tree Reconstruction
//!
//! This library turns flat per-event simulation output into decay trees:
//! 1. **Reconstruction**: tracks linked to their parents under a synthetic root
//! 2. **Pruning**: branches that deposit no energy are excised
//! 3. **Read-side adapters**: endcap splitting, scenes, color wheels, merge maps
//!
//! The core performs no I/O and never logs; errors are returned to the caller.

pub mod error;
pub mod records;
pub mod truth_tree;
pub mod split;
pub mod colors;
pub mod pdg;
pub mod geometry;
pub mod scene;
pub mod mergemap;

// Re-export key types for convenience
pub use error::TreeError;
pub use records::{HitRecord, TrackId, TrackRecord, NO_TRACK};
pub use truth_tree::{BuildConfig, NodeId, NodeState, OrphanPolicy, ShowerTree, TrackNode, ROOT};
pub use split::Axis;
pub use colors::{color_for_pdgid, IdColor, Rgb};
pub use geometry::Endcap;
pub use scene::{build_scene, Scene, SceneOptions};
pub use mergemap::MergeMap;
