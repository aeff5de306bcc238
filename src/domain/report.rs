// ============================================================
// Layer 3 — Fusion Report
// ============================================================
// What the `fuse` command prints: one summary per example plus
// a few batch-level facts. Plain serde structs, no tensors.
//
// Example JSON:
//   {
//     "mode": "trilinear",
//     "backend": "cpu",
//     "padded_shape": [4, 3, 12, 64],
//     "all_finite": true,
//     "examples": [
//       { "id": "synthetic-0", "document_tokens": 17, "query_tokens": 5,
//         "q2c_peak": { "sentence": 1, "token": 4, "weight": 0.21 },
//         "mean_fused_norm": 3.42, "finite": true }
//     ]
//   }

use serde::{Deserialize, Serialize};

use crate::domain::mode::SimilarityMode;

/// Document position that received the largest q2c weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPosition {
    pub sentence: usize,
    pub token:    usize,
    pub weight:   f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleSummary {
    pub id: String,

    /// Real (mask = 1) document tokens
    pub document_tokens: usize,

    /// Real (mask = 1) query tokens
    pub query_tokens: usize,

    /// None when the document has no real token
    pub q2c_peak: Option<TokenPosition>,

    /// Mean L2 norm of the fused vectors at real document tokens
    pub mean_fused_norm: f32,

    /// Every fused value of this example (padding included) is finite
    pub finite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuseReport {
    pub mode:    SimilarityMode,
    pub backend: String,

    /// `[batch, max_sentences, max_sentence_len, 4 * d_model]` of one full batch
    pub padded_shape: [usize; 4],

    pub all_finite: bool,
    pub examples:   Vec<ExampleSummary>,
}

impl FuseReport {
    pub fn new(mode: SimilarityMode, backend: impl Into<String>, padded_shape: [usize; 4]) -> Self {
        Self {
            mode,
            backend: backend.into(),
            padded_shape,
            all_finite: true,
            examples: Vec::new(),
        }
    }

    pub fn push(&mut self, summary: ExampleSummary) {
        self.all_finite &= summary.finite;
        self.examples.push(summary);
    }
}
