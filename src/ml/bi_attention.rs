// ============================================================
// Layer 5 — Bidirectional Attention
// ============================================================
// Mixes query information into every document token.
//
// Shapes (b = batch, S = sentences, T = tokens per sentence,
//         Q = query tokens, d = feature width):
//
//   document  [b, S, T, d]      document_mask [b, S, T]
//   query     [b, Q, d]         query_mask    [b, Q]
//
//   1. Broadcast both sides to [b, S, T, Q, d] (expand, no copy)
//      and multiply the broadcast masks into a joint mask.
//   2. similarity = scorer(doc, query) masked      [b, S, T, Q]
//   3. c2q: softmax over Q, read out the query     [b, S, T, d]
//   4. q2c: max over Q → [b, S, T], mask again with the document
//      mask, softmax over all S·T tokens, read out the document
//      → [b, d], tiled back to                     [b, S, T, d]
//   5. fused = [doc ; c2q ; doc ⊙ c2q ; doc ⊙ q2c] [b, S, T, 4d]
//
// Padded document tokens still get a finite fused vector; the
// span decoder downstream must ignore them using the mask.

use burn::prelude::*;

use crate::domain::FusionError;
use crate::ml::masking::{check_mask_magnitude, masked_softmax, masked_weighted_sum, reduce_max};
use crate::ml::similarity::{SimilarityConfig, SimilarityMode, SimilarityScorer};
use crate::ml::validate::check_fusion_shapes;

#[derive(Config, Debug)]
pub struct BiAttentionConfig {
    pub d_model: usize,
    #[config(default = "SimilarityMode::Trilinear")]
    pub mode: SimilarityMode,
    #[config(default = 0.2)]
    pub dropout: f64,
    #[config(default = 1e30)]
    pub mask_magnitude: f64,
}

impl BiAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiAttention<B> {
        let scorer = SimilarityConfig::new(self.d_model)
            .with_mode(self.mode)
            .with_dropout(self.dropout)
            .with_mask_magnitude(self.mask_magnitude)
            .init(device);
        BiAttention::new(scorer, self.mask_magnitude)
    }
}

#[derive(Module, Debug)]
pub struct BiAttention<B: Backend> {
    scorer:         SimilarityScorer<B>,
    mask_magnitude: f64,
}

/// Everything one forward pass produces. Only `fused` is meant for the
/// span decoder; the attention weights are kept for inspection.
#[derive(Debug, Clone)]
pub struct BiAttentionOutput<B: Backend> {
    /// `[b, S, T, 4d]`
    pub fused: Tensor<B, 4>,
    /// Masked logits `[b, S, T, Q]`
    pub similarity: Tensor<B, 4>,
    /// Distribution over query tokens per document token `[b, S, T, Q]`
    pub c2q_weights: Tensor<B, 4>,
    /// Distribution over all document tokens `[b, S, T]`
    pub q2c_weights: Tensor<B, 3>,
}

impl<B: Backend> BiAttention<B> {
    pub fn new(scorer: SimilarityScorer<B>, mask_magnitude: f64) -> Self {
        Self { scorer, mask_magnitude }
    }

    pub fn mode(&self) -> SimilarityMode {
        self.scorer.mode()
    }

    pub fn d_model(&self) -> usize {
        self.scorer.d_model()
    }

    pub fn mask_magnitude(&self) -> f64 {
        self.mask_magnitude
    }

    /// Fails with `ShapeMismatch` when the inputs disagree with each other or
    /// with `d_model`, and with `InvalidMagnitude` when the mask magnitude
    /// cannot be represented in f32. Nothing is computed before both pass.

    pub fn forward(
        &self,
        document:      Tensor<B, 4>,
        document_mask: Tensor<B, 3>,
        query:         Tensor<B, 3>,
        query_mask:    Tensor<B, 2>,
    ) -> Result<BiAttentionOutput<B>, FusionError> {
        check_fusion_shapes(document.dims(), document_mask.dims(), query.dims(), query_mask.dims())?;
        check_mask_magnitude(self.mask_magnitude)?;

        let [batch, sentences, tokens, dim] = document.dims();
        if dim != self.d_model() {
            return Err(FusionError::shape("document feature width", [self.d_model()], [dim]));
        }
        let [_, queries, _] = query.dims();
        let grid  = [batch, sentences, tokens, queries, dim];
        let pairs = [batch, sentences, tokens, queries];
        tracing::debug!(
            "Bi-attention: batch={} sentences={} tokens={} queries={} dim={}",
            batch, sentences, tokens, queries, dim,
        );

        // ── 1. Broadcast onto the (document token, query token) grid ─────────
        let document_aug = document.clone().unsqueeze_dim::<5>(3).expand(grid);
        let query_aug    = query.clone().reshape([batch, 1, 1, queries, dim]).expand(grid);
        let joint_mask   = document_mask.clone().unsqueeze_dim::<4>(3).expand(pairs)
            * query_mask.reshape([batch, 1, 1, queries]).expand(pairs);

        // ── 2. Similarity ─────────────────────────────────────────────────────
        let similarity = self.scorer.score(document_aug, query_aug, joint_mask.clone());

        // ── 3. Document → query ───────────────────────────────────────────────
        let c2q_weights = masked_softmax(similarity.clone(), joint_mask, 3, self.mask_magnitude);
        let c2q = masked_weighted_sum(
            query,
            c2q_weights.clone().reshape([batch, sentences * tokens, queries]),
        )
        .reshape([batch, sentences, tokens, dim]);

        // ── 4. Query → document ───────────────────────────────────────────────
        let best_match = reduce_max(similarity.clone(), 3).reshape([batch, sentences * tokens]);
        let q2c_flat = masked_softmax(
            best_match,
            document_mask.reshape([batch, sentences * tokens]),
            1,
            self.mask_magnitude,
        );
        let q2c = masked_weighted_sum(
            document.clone().reshape([batch, sentences * tokens, dim]),
            q2c_flat.clone().reshape([batch, 1, sentences * tokens]),
        )
        .reshape([batch, 1, 1, dim])
        .expand([batch, sentences, tokens, dim]);

        // ── 5. Fuse ───────────────────────────────────────────────────────────
        let fused = Tensor::cat(
            vec![
                document.clone(),
                c2q.clone(),
                document.clone() * c2q,
                document * q2c,
            ],
            3,
        );

        Ok(BiAttentionOutput {
            fused,
            similarity,
            c2q_weights,
            q2c_weights: q2c_flat.reshape([batch, sentences, tokens]),
        })
    }
}
