// ============================================================
// Layer 5 — Similarity Scorer
// ============================================================
// Produces one scalar per (document token, query token) pair.
//
//   Bilinear:   w · [a ; b]          + bias
//   Trilinear:  w · [a ; b ; a ⊙ b]  + bias   (default)
//
// The trilinear form adds the elementwise product block, so the
// score can express interaction between the two vectors instead
// of two independent linear terms.
//
// The mode is fixed when the scorer is built; forward() does a
// single match on a closed enum.
//
// Dropout on the concatenated features is only active on
// autodiff backends, so inference paths are deterministic.

use burn::{
    module::{Ignored, Param},
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
};

pub use crate::domain::SimilarityMode;
use crate::domain::FusionError;
use crate::ml::masking::apply_mask;

#[derive(Config, Debug)]
pub struct SimilarityConfig {
    pub d_model: usize,
    #[config(default = "SimilarityMode::Trilinear")]
    pub mode: SimilarityMode,
    #[config(default = 0.2)]
    pub dropout: f64,
    #[config(default = 1e30)]
    pub mask_magnitude: f64,
}

impl SimilarityConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimilarityScorer<B> {
        SimilarityScorer {
            projection:     LinearConfig::new(self.mode.blocks() * self.d_model, 1).init(device),
            dropout:        DropoutConfig::new(self.dropout).init(),
            mode:           Ignored(self.mode),
            d_model:        self.d_model,
            mask_magnitude: self.mask_magnitude,
        }
    }
}

#[derive(Module, Debug)]
pub struct SimilarityScorer<B: Backend> {
    projection:     Linear<B>,
    dropout:        Dropout,
    mode:           Ignored<SimilarityMode>,
    d_model:        usize,
    mask_magnitude: f64,
}

impl<B: Backend> SimilarityScorer<B> {
    pub fn mode(&self) -> SimilarityMode {
        self.mode.0
    }

    /// Feature width the projection expects on both sides
    pub fn d_model(&self) -> usize {
        self.d_model
    }

    /// Replace the projection with externally supplied parameters.
    ///
    /// `weight` is `[blocks * d_model, 1]` (Burn stores Linear weights as
    /// `[in, out]`), `bias` is `[1]`.
    pub fn with_projection(
        mut self,
        weight: Tensor<B, 2>,
        bias:   Tensor<B, 1>,
    ) -> Result<Self, FusionError> {
        let expected = [self.mode().blocks() * self.d_model, 1];
        if weight.dims() != expected {
            return Err(FusionError::shape("similarity weight", expected, weight.dims()));
        }
        if bias.dims() != [1] {
            return Err(FusionError::shape("similarity bias", [1], bias.dims()));
        }
        self.projection.weight = Param::from_tensor(weight);
        self.projection.bias   = Some(Param::from_tensor(bias));
        Ok(self)
    }

    /// Scores broadcast document/query grids `[b, S, T, Q, d]` and masks the
    /// result with `joint_mask` `[b, S, T, Q]`. Returns raw masked logits.
    pub fn score(
        &self,
        document:   Tensor<B, 5>,
        query:      Tensor<B, 5>,
        joint_mask: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, sentences, tokens, queries, _] = document.dims();

        let features = match self.mode() {
            SimilarityMode::Bilinear => Tensor::cat(vec![document, query], 4),
            SimilarityMode::Trilinear => {
                let interaction = document.clone() * query.clone();
                Tensor::cat(vec![document, query, interaction], 4)
            }
        };

        let logits = self
            .projection
            .forward(self.dropout.forward(features))
            .reshape([batch, sentences, tokens, queries]);

        apply_mask(logits, joint_mask, self.mask_magnitude)
    }
}
