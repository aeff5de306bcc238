// ============================================================
// Layer 3 — Core Traits
// ============================================================
// The application layer asks for examples without caring where
// they come from. Two implementations live in Layer 4:
//
//   ExampleLoader   → a JSON file produced by an upstream encoder
//   SyntheticSource → seeded random examples for smoke runs
//
// Anything else (a socket, a feature store) only has to
// implement ExampleSource to plug into the fuse use case.

use anyhow::Result;

use crate::domain::example::FusionExample;

/// Any component that can hand over a list of ragged examples.
pub trait ExampleSource {
    /// Short human-readable description used in log lines
    fn describe(&self) -> String;

    /// Load every available example
    fn load_all(&self) -> Result<Vec<FusionExample>>;
}
