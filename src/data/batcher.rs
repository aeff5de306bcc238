// ============================================================
// Layer 4 — Fusion Batcher
// ============================================================
// Turns a slice of ragged FusionExamples into fixed-capacity
// tensors plus their 0/1 masks.
//
// How padding works here:
//   Every example is laid into a zero-filled grid of
//   max_sentences × max_sentence_len document slots and
//   max_query_len query slots. A slot that received a real
//   token gets mask 1, everything else stays 0:
//
//     sentence lengths [3, 1], capacity 2 × 4
//
//       document_mask  [[1, 1, 1, 0],
//                       [1, 0, 0, 0]]
//
//   Real tokens always fill slots from the left, so the masks
//   satisfy the no-interior-gap invariant by construction.
//
// Output tensors (b = number of examples):
//   document       [b, S, T, d]     document_mask  [b, S, T]
//   query          [b, Q, d]        query_mask     [b, Q]
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;

use crate::domain::{Capacity, FusionError, FusionExample};

// ─── FusionBatch ──────────────────────────────────────────────────────────────
/// A padded batch ready for FusionModel::forward.
#[derive(Debug, Clone)]
pub struct FusionBatch<B: Backend> {
    /// Example ids in batch order
    pub ids: Vec<String>,

    /// Document features, shape: [batch, max_sentences, max_sentence_len, d_model]
    pub document: Tensor<B, 4>,

    /// 1 = real token, 0 = padding, shape: [batch, max_sentences, max_sentence_len]
    pub document_mask: Tensor<B, 3>,

    /// Query features, shape: [batch, max_query_len, d_model]
    pub query: Tensor<B, 3>,

    /// 1 = real token, 0 = padding, shape: [batch, max_query_len]
    pub query_mask: Tensor<B, 2>,
}

impl<B: Backend> FusionBatch<B> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ─── FusionBatcher ────────────────────────────────────────────────────────────
/// Holds the target device and the padded capacity.
#[derive(Clone, Debug)]
pub struct FusionBatcher<B: Backend> {
    pub device:   B::Device,
    pub d_model:  usize,
    pub capacity: Capacity,
}

impl<B: Backend> FusionBatcher<B> {
    pub fn new(device: B::Device, d_model: usize, capacity: Capacity) -> Self {
        Self { device, d_model, capacity }
    }

    /// Pad `items` into one batch.
    ///
    /// Fails on an empty slice, on an example that exceeds the capacity,
    /// and on any token whose width is not `d_model`.
    pub fn batch(&self, items: &[FusionExample]) -> Result<FusionBatch<B>, FusionError> {
        if items.is_empty() {
            return Err(FusionError::EmptyBatch);
        }

        let d = self.d_model;
        let Capacity { max_sentences, max_sentence_len, max_query_len } = self.capacity;
        let batch_size = items.len();

        let doc_slots   = max_sentences * max_sentence_len;
        let mut doc      = vec![0.0f32; batch_size * doc_slots * d];
        let mut doc_mask = vec![0.0f32; batch_size * doc_slots];
        let mut query      = vec![0.0f32; batch_size * max_query_len * d];
        let mut query_mask = vec![0.0f32; batch_size * max_query_len];

        for (b, item) in items.iter().enumerate() {
            self.capacity.check(item)?;
            if let Some((side, sentence, token, found)) = item.first_width_violation(d) {
                return Err(FusionError::shape(
                    format!("{side} token width (example '{}', sentence {sentence}, token {token})", item.id),
                    [d],
                    [found],
                ));
            }

            // ── Document: sentence s, token t → slot (b, s, t) ────────────────
            for (s, sentence) in item.document.iter().enumerate() {
                for (t, features) in sentence.iter().enumerate() {
                    let slot = b * doc_slots + s * max_sentence_len + t;
                    doc[slot * d..(slot + 1) * d].copy_from_slice(features);
                    doc_mask[slot] = 1.0;
                }
            }

            // ── Query: token q → slot (b, q) ─────────────────────────────────
            for (q, features) in item.query.iter().enumerate() {
                let slot = b * max_query_len + q;
                query[slot * d..(slot + 1) * d].copy_from_slice(features);
                query_mask[slot] = 1.0;
            }
        }

        tracing::debug!(
            "Batched {} examples into [{}, {}, {}, {}] / [{}, {}, {}]",
            batch_size, batch_size, max_sentences, max_sentence_len, d,
            batch_size, max_query_len, d,
        );

        Ok(FusionBatch {
            ids: items.iter().map(|item| item.id.clone()).collect(),
            document: Tensor::from_data(
                TensorData::new(doc, [batch_size, max_sentences, max_sentence_len, d]),
                &self.device,
            ),
            document_mask: Tensor::from_data(
                TensorData::new(doc_mask, [batch_size, max_sentences, max_sentence_len]),
                &self.device,
            ),
            query: Tensor::from_data(
                TensorData::new(query, [batch_size, max_query_len, d]),
                &self.device,
            ),
            query_mask: Tensor::from_data(
                TensorData::new(query_mask, [batch_size, max_query_len]),
                &self.device,
            ),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_util::{values, TestBackend};

    fn batcher() -> FusionBatcher<TestBackend> {
        FusionBatcher::new(Default::default(), 2, Capacity::new(2, 3, 2))
    }

    fn example(id: &str) -> FusionExample {
        FusionExample::new(
            id,
            vec![
                vec![vec![1.0, 1.0], vec![2.0, 2.0]],
                vec![vec![3.0, 3.0]],
            ],
            vec![vec![9.0, 8.0]],
        )
    }

    #[test]
    fn test_shapes_and_masks() {
        let batch = batcher().batch(&[example("a"), example("b")]).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(batch.document.dims(), [2, 2, 3, 2]);
        assert_eq!(batch.document_mask.dims(), [2, 2, 3]);
        assert_eq!(batch.query.dims(), [2, 2, 2]);
        assert_eq!(batch.query_mask.dims(), [2, 2]);

        let doc_mask = values(batch.document_mask);
        assert_eq!(&doc_mask[0..6], &[1.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(values(batch.query_mask), vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_features_land_in_their_slots() {
        let batch = batcher().batch(&[example("a")]).unwrap();
        let doc = values(batch.document);
        // sentence 0: [1,1] [2,2] [pad]; sentence 1: [3,3] [pad] [pad]
        assert_eq!(doc, vec![1.0, 1.0, 2.0, 2.0, 0.0, 0.0, 3.0, 3.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(values(batch.query), vec![9.0, 8.0, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_query_gives_fully_masked_row() {
        let mut ex = example("a");
        ex.query.clear();
        let batch = batcher().batch(&[ex]).unwrap();
        assert_eq!(values(batch.query_mask), vec![0.0, 0.0]);
    }

    #[test]
    fn test_rejects_empty_batch() {
        assert_eq!(batcher().batch(&[]).unwrap_err(), FusionError::EmptyBatch);
    }

    #[test]
    fn test_rejects_oversized_example() {
        let mut ex = example("big");
        ex.document[0].extend([vec![0.0, 0.0], vec![0.0, 0.0]]);
        let err = batcher().batch(&[ex]).unwrap_err();
        assert!(matches!(err, FusionError::CapacityExceeded { axis: "sentence length", found: 4, .. }));
    }

    #[test]
    fn test_rejects_wrong_width() {
        let mut ex = example("narrow");
        ex.query[0] = vec![1.0];
        let err = batcher().batch(&[ex]).unwrap_err();
        assert!(matches!(err, FusionError::ShapeMismatch { .. }));
        assert!(err.to_string().contains("query token width"));
    }
}
