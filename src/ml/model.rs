// ============================================================
// Layer 5 — Fusion Model
// ============================================================
// The full fusion core as one Burn Module:
//
//   document [b, S, T, d] ──┐
//                           ├─ HighwayStack (shared weights)
//   query    [b, Q, d]    ──┘
//                │
//                ▼
//           BiAttention ──► fused [b, S, T, 4d]
//
// The same highway stack transforms both sides so document and
// query features stay in one space before they are compared.
//
// forward() refuses a batch whose feature width differs from
// d_model or whose padded shape exceeds the configured capacity,
// and optionally validates both masks on the host first.
//
// summarise() turns one forward pass into per-example figures
// for the fuse report (Layer 3 report types).

use burn::{module::Ignored, prelude::*};

use crate::data::batcher::{FusionBatch, FusionBatcher};
use crate::domain::report::{ExampleSummary, TokenPosition};
use crate::domain::{Capacity, FusionError, SimilarityMode};
use crate::ml::bi_attention::{BiAttention, BiAttentionConfig, BiAttentionOutput};
use crate::ml::highway::{HighwayConfig, HighwayStack};
use crate::ml::masking::check_mask_magnitude;
use crate::ml::read_back;
use crate::ml::validate::{check_fusion_shapes, validate_mask};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct FusionModelConfig {
    pub d_model: usize,
    #[config(default = 4)]
    pub max_sentences: usize,
    #[config(default = 32)]
    pub max_sentence_len: usize,
    #[config(default = 16)]
    pub max_query_len: usize,
    #[config(default = "SimilarityMode::Trilinear")]
    pub mode: SimilarityMode,
    #[config(default = 0.2)]
    pub dropout: f64,
    #[config(default = 2)]
    pub highway_depth: usize,
    #[config(default = 0.0)]
    pub gate_bias: f64,
    #[config(default = 1e30)]
    pub mask_magnitude: f64,
    #[config(default = true)]
    pub validate_masks: bool,
}

impl FusionModelConfig {
    pub fn capacity(&self) -> Capacity {
        Capacity::new(self.max_sentences, self.max_sentence_len, self.max_query_len)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FusionModel<B> {
        let highway = HighwayConfig::new(self.d_model)
            .with_depth(self.highway_depth)
            .with_gate_bias(self.gate_bias)
            .init(device);
        let attention = BiAttentionConfig::new(self.d_model)
            .with_mode(self.mode)
            .with_dropout(self.dropout)
            .with_mask_magnitude(self.mask_magnitude)
            .init(device);

        tracing::debug!(
            "Fusion model: d_model={} mode={} highway_depth={} capacity={:?}",
            self.d_model, self.mode, self.highway_depth, self.capacity(),
        );

        FusionModel {
            highway,
            attention,
            capacity: Ignored(self.capacity()),
            d_model: self.d_model,
            validate_masks: self.validate_masks,
        }
    }
}

#[derive(Module, Debug)]
pub struct FusionModel<B: Backend> {
    pub highway:    HighwayStack<B>,
    pub attention:  BiAttention<B>,
    capacity:       Ignored<Capacity>,
    d_model:        usize,
    validate_masks: bool,
}

impl<B: Backend> FusionModel<B> {
    pub fn capacity(&self) -> Capacity {
        self.capacity.0
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }

    pub fn mode(&self) -> SimilarityMode {
        self.attention.mode()
    }

    pub fn mask_magnitude(&self) -> f64 {
        self.attention.mask_magnitude()
    }

    /// A batcher that pads examples to exactly this model's capacity.
    pub fn batcher(&self, device: B::Device) -> FusionBatcher<B> {
        FusionBatcher::new(device, self.d_model, self.capacity())
    }

    pub fn forward(&self, batch: &FusionBatch<B>) -> Result<BiAttentionOutput<B>, FusionError> {
        let [_, sentences, tokens, dim] = batch.document.dims();
        let [_, queries, _] = batch.query.dims();

        check_fusion_shapes(
            batch.document.dims(),
            batch.document_mask.dims(),
            batch.query.dims(),
            batch.query_mask.dims(),
        )?;
        if dim != self.d_model {
            return Err(FusionError::shape("document feature width", [self.d_model], [dim]));
        }
        let capacity = self.capacity();
        let limit = [capacity.max_sentences, capacity.max_sentence_len, capacity.max_query_len];
        if sentences > limit[0] || tokens > limit[1] || queries > limit[2] {
            return Err(FusionError::shape("padded (sentences, tokens, queries)", limit, [sentences, tokens, queries]));
        }

        check_mask_magnitude(self.mask_magnitude())?;

        if self.validate_masks {
            validate_mask(&batch.document_mask, "document")?;
            validate_mask(&batch.query_mask, "query")?;
        }

        let document = self.highway.forward(batch.document.clone())?;
        let query    = self.highway.forward(batch.query.clone())?;

        self.attention.forward(
            document,
            batch.document_mask.clone(),
            query,
            batch.query_mask.clone(),
        )
    }

    /// Per-example figures for the fuse report. Reads the fused tensor,
    /// the q2c weights and both masks back to the host.
    pub fn summarise(
        &self,
        batch:  &FusionBatch<B>,
        output: &BiAttentionOutput<B>,
    ) -> Result<Vec<ExampleSummary>, FusionError> {
        let [_, sentences, tokens, width] = output.fused.dims();
        let slots = sentences * tokens;

        let fused      = read_back(output.fused.clone())?;
        let q2c        = read_back(output.q2c_weights.clone())?;
        let doc_mask   = read_back(batch.document_mask.clone())?;
        let query_mask = read_back(batch.query_mask.clone())?;
        let queries    = batch.query_mask.dims()[1];

        let summaries = batch
            .ids
            .iter()
            .enumerate()
            .map(|(b, id)| {
                let mask    = &doc_mask[b * slots..(b + 1) * slots];
                let weights = &q2c[b * slots..(b + 1) * slots];
                let vectors = &fused[b * slots * width..(b + 1) * slots * width];

                let real: Vec<usize> = (0..slots).filter(|&i| mask[i] == 1.0).collect();

                let q2c_peak = real
                    .iter()
                    .copied()
                    .max_by(|&i, &j| weights[i].total_cmp(&weights[j]))
                    .map(|i| TokenPosition {
                        sentence: i / tokens,
                        token:    i % tokens,
                        weight:   weights[i],
                    });

                let norm_sum: f32 = real
                    .iter()
                    .map(|&i| {
                        vectors[i * width..(i + 1) * width]
                            .iter()
                            .map(|v| v * v)
                            .sum::<f32>()
                            .sqrt()
                    })
                    .sum();
                let mean_fused_norm = if real.is_empty() { 0.0 } else { norm_sum / real.len() as f32 };

                ExampleSummary {
                    id: id.clone(),
                    document_tokens: real.len(),
                    query_tokens: query_mask[b * queries..(b + 1) * queries]
                        .iter()
                        .filter(|v| **v == 1.0)
                        .count(),
                    q2c_peak,
                    mean_fused_norm,
                    finite: vectors.iter().all(|v| v.is_finite()),
                }
            })
            .collect();

        Ok(summaries)
    }
}
