// ============================================================
// Layer 3 — Fusion Errors
// ============================================================
// Every failure the attention core can report before it starts
// computing. Degenerate (fully masked) rows are NOT errors: the
// masked softmax turns them into a uniform distribution.
//
// The application and CLI layers wrap these in anyhow::Error,
// so they only need to implement std::error::Error (thiserror).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Feature widths, batch sizes or mask shapes disagree.
    #[error("shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what:     String,
        expected: Vec<usize>,
        found:    Vec<usize>,
    },

    /// A mask holds a value outside {0, 1} or has an interior gap.
    #[error("invalid mask '{name}': {reason}")]
    InvalidMask { name: String, reason: String },

    /// A ragged example does not fit the configured padded capacity.
    #[error("{axis} of example '{example}' is {found}, capacity is {limit}")]
    CapacityExceeded {
        example: String,
        axis:    &'static str,
        limit:   usize,
        found:   usize,
    },

    /// The mask magnitude cannot suppress padding in f32 without overflow.
    #[error("mask magnitude {value} is unusable: {reason}")]
    InvalidMagnitude { value: f64, reason: String },

    /// Tensor data could not be read back to the host.
    #[error("cannot read tensor data back to host: {0}")]
    Readback(String),

    #[error("cannot build a batch from zero examples")]
    EmptyBatch,
}

impl FusionError {
    pub fn shape(
        what:     impl Into<String>,
        expected: impl Into<Vec<usize>>,
        found:    impl Into<Vec<usize>>,
    ) -> Self {
        Self::ShapeMismatch {
            what:     what.into(),
            expected: expected.into(),
            found:    found.into(),
        }
    }

    pub fn mask(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMask { name: name.into(), reason: reason.into() }
    }
}
