//! TruthTree event harness
//!
//! Everything around the core that touches the outside world: reading
//! columnar event files, generating synthetic showers, processing batches in
//! parallel, exporting results, and optional Rerun visualization.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌───────────────┐
//! │ event file / │──►│ ColumnarEvent   │──►│  EventRunner  │
//! │  generator   │   │ -> records      │   │ (rayon batch) │
//! └──────────────┘   └─────────────────┘   └───────┬───────┘
//!                                                  │
//!                          ┌───────────────────────┼──────────────┐
//!                          ▼                       ▼              ▼
//!                   ShowerTree (core)       TruthExport     RerunLogger
//!                   scene + merge map         (JSON)        (optional)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use truthtree_sim::{EventRunner, RunConfig, ShowerGenerator};
//!
//! let events = ShowerGenerator::with_defaults(42).generate_batch(10);
//! let summary = EventRunner::new(RunConfig::default()).run_batch(&events);
//! assert_eq!(summary.failed(), 0);
//! ```

mod error;
pub mod event;
mod exporter;
mod generator;
mod runner;
mod visualizer;

pub use error::EventError;
pub use event::{load_events, save_events, ColumnarEvent, EventFile};
pub use exporter::{EventExport, TruthExport};
pub use generator::{GeneratorConfig, ShowerGenerator};
pub use runner::{BatchSummary, EventResult, EventRunner, EventStats, EventView, RunConfig};
pub use visualizer::RerunLogger;
