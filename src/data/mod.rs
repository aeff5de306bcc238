// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a source of ragged examples and padded
// tensors on the device.
//
//   JSON file / seeded generator
//       │
//       ▼
//   ExampleLoader / SyntheticSource  → Vec<FusionExample>
//       │
//       ▼
//   FusionBatcher                    → FusionBatch (tensors + masks)
//       │
//       ▼
//   FusionModel::forward (Layer 5)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads examples from a JSON file
pub mod loader;

/// Seeded random examples that fit a capacity
pub mod synthetic;

/// Pads ragged examples into fixed-capacity tensors and masks
pub mod batcher;

pub use batcher::{FusionBatch, FusionBatcher};
pub use loader::ExampleLoader;
pub use synthetic::SyntheticSource;
