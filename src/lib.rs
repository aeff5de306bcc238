#![recursion_limit = "256"]

//! Attention-flow fusion core for extractive question answering.
//!
//! Encoded document tokens `[b, S, T, d]` and query tokens `[b, Q, d]`
//! go through a shared highway stack and bidirectional attention,
//! producing a query-aware `[b, S, T, 4d]` representation per
//! document token.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod ml;

pub use data::{FusionBatch, FusionBatcher};
pub use domain::{Capacity, FusionError, FusionExample, SimilarityMode};
pub use ml::bi_attention::{BiAttention, BiAttentionConfig, BiAttentionOutput};
pub use ml::highway::{HighwayConfig, HighwayGate, HighwayStack};
pub use ml::model::{FusionModel, FusionModelConfig};
pub use ml::similarity::{SimilarityConfig, SimilarityScorer};
