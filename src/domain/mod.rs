// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// system works with. No Burn types and no file I/O in here.
//
//   example.rs — a ragged document/query pair + padded capacity
//   mode.rs    — bilinear / trilinear scorer selection
//   report.rs  — per-example summaries printed by `fuse`
//   traits.rs  — ExampleSource, implemented by Layer 4
//   error.rs   — FusionError, the failure taxonomy of the core
//
// The ml layer converts examples into tensors; everything it
// rejects is reported with a FusionError from this module.

/// A ragged document/query pair and the capacity it must fit
pub mod example;

/// Scorer selection
pub mod mode;

/// Fusion report types
pub mod report;

/// Core abstractions implemented by other layers
pub mod traits;

/// Errors raised before any tensor computation starts
pub mod error;

pub use error::FusionError;
pub use example::{Capacity, FusionExample};
pub use mode::SimilarityMode;
