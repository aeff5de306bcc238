// ============================================================
// Layer 5 — Input Validation
// ============================================================
// Two checks that run before any attention math:
//
//   check_fusion_shapes — cheap, always on. Batch sizes, feature
//                         widths and mask shapes must line up.
//
//   validate_mask       — reads the mask back to the host, so it
//                         is opt-in (FusionModelConfig::validate_masks).
//                         Values must be 0 or 1 and real positions
//                         must form a prefix along every padded axis:
//
//                           [1 1 1 0 0]   ok
//                           [1 0 1 0 0]   interior gap → InvalidMask
//
//                         For a document mask the sentence axis is
//                         checked too: an occupied sentence may not
//                         follow an empty one.
//
// Fully masked batch rows pass validation; they are logged at
// warn level because the softmax falls back to uniform weights.

use burn::prelude::*;

use crate::domain::FusionError;
use crate::ml::read_back;

/// Fails with `ShapeMismatch` unless document `[b, S, T, d]`,
/// document mask `[b, S, T]`, query `[b, Q, d]` and query mask `[b, Q]`
/// agree on every shared axis.
pub fn check_fusion_shapes(
    document:      [usize; 4],
    document_mask: [usize; 3],
    query:         [usize; 3],
    query_mask:    [usize; 2],
) -> Result<(), FusionError> {
    let [batch, sentences, tokens, dim] = document;
    let [q_batch, queries, q_dim] = query;

    if document_mask != [batch, sentences, tokens] {
        return Err(FusionError::shape("document mask", [batch, sentences, tokens], document_mask));
    }
    if q_batch != batch {
        return Err(FusionError::shape("query batch", [batch], [q_batch]));
    }
    if q_dim != dim {
        return Err(FusionError::shape("query feature width", [dim], [q_dim]));
    }
    if query_mask != [batch, queries] {
        return Err(FusionError::shape("query mask", [batch, queries], query_mask));
    }
    Ok(())
}

/// Validates a `[batch, ...]` mask. Returns how many batch rows contain no
/// real position at all.
pub fn validate_mask<B: Backend, const D: usize>(
    mask: &Tensor<B, D>,
    name: &str,
) -> Result<usize, FusionError> {
    let dims = mask.dims();
    let data = read_back(mask.clone())?;

    if let Some((index, value)) = data
        .iter()
        .enumerate()
        .find(|(_, v)| **v != 0.0 && **v != 1.0)
    {
        return Err(FusionError::mask(name, format!("value {value} at flat index {index}")));
    }

    let inner = &dims[1..];
    let block: usize = inner.iter().product();
    if block == 0 {
        return Ok(dims[0]);
    }

    let mut empty_rows = 0;
    for (row, chunk) in data.chunks(block).enumerate() {
        let occupied = check_prefix(chunk, inner)
            .map_err(|reason| FusionError::mask(name, format!("batch row {row}: {reason}")))?;
        if !occupied {
            tracing::warn!("{} mask: batch row {} is fully masked", name, row);
            empty_rows += 1;
        }
    }
    Ok(empty_rows)
}

/// Checks that the real positions of `data` (laid out as `dims`) form a
/// prefix on every axis. Returns whether any position is real.
fn check_prefix(data: &[f32], dims: &[usize]) -> Result<bool, String> {
    match dims {
        [] => Ok(data.first().is_some_and(|v| *v == 1.0)),
        [_] => {
            let real = data.iter().take_while(|v| **v == 1.0).count();
            match data[real..].iter().position(|v| *v == 1.0) {
                Some(offset) => Err(format!(
                    "real position {} follows padding at {}",
                    real + offset,
                    real
                )),
                None => Ok(real > 0),
            }
        }
        [_, rest @ ..] => {
            let block: usize = rest.iter().product();
            if block == 0 {
                return Ok(false);
            }
            let mut first_empty = None;
            let mut any_real    = false;
            for (i, chunk) in data.chunks(block).enumerate() {
                let occupied = check_prefix(chunk, rest).map_err(|r| format!("index {i}: {r}"))?;
                match (occupied, first_empty) {
                    (true, Some(empty)) => {
                        return Err(format!("index {i} is occupied but index {empty} before it is empty"));
                    }
                    (true, None)  => any_real = true,
                    (false, None) => first_empty = Some(i),
                    (false, Some(_)) => {}
                }
            }
            Ok(any_real)
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_util::{tensor, TestBackend};

    #[test]
    fn test_shapes_accepted() {
        assert!(check_fusion_shapes([2, 3, 4, 8], [2, 3, 4], [2, 5, 8], [2, 5]).is_ok());
    }

    #[test]
    fn test_shape_mismatches() {
        let width = check_fusion_shapes([2, 3, 4, 8], [2, 3, 4], [2, 5, 6], [2, 5]).unwrap_err();
        assert_eq!(width, FusionError::shape("query feature width", [8], [6]));

        let batch = check_fusion_shapes([2, 3, 4, 8], [2, 3, 4], [1, 5, 8], [1, 5]).unwrap_err();
        assert_eq!(batch, FusionError::shape("query batch", [2], [1]));

        let doc_mask = check_fusion_shapes([2, 3, 4, 8], [2, 4, 3], [2, 5, 8], [2, 5]).unwrap_err();
        assert!(matches!(doc_mask, FusionError::ShapeMismatch { ref what, .. } if what == "document mask"));

        let q_mask = check_fusion_shapes([2, 3, 4, 8], [2, 3, 4], [2, 5, 8], [2, 4]).unwrap_err();
        assert!(matches!(q_mask, FusionError::ShapeMismatch { ref what, .. } if what == "query mask"));
    }

    #[test]
    fn test_prefix_masks_pass() {
        let device = Default::default();
        let mask = tensor::<2>(vec![1.0, 1.0, 0.0, 1.0, 0.0, 0.0], [2, 3], &device);
        assert_eq!(validate_mask::<TestBackend, 2>(&mask, "query"), Ok(0));
    }

    #[test]
    fn test_interior_gap_rejected() {
        let device = Default::default();
        let mask = tensor::<2>(vec![1.0, 0.0, 1.0], [1, 3], &device);
        let err = validate_mask::<TestBackend, 2>(&mask, "query").unwrap_err();
        assert!(matches!(err, FusionError::InvalidMask { .. }));
        assert!(err.to_string().contains("real position 2 follows padding at 1"));
    }

    #[test]
    fn test_non_binary_value_rejected() {
        let device = Default::default();
        let mask = tensor::<2>(vec![1.0, 0.5], [1, 2], &device);
        let err = validate_mask::<TestBackend, 2>(&mask, "query").unwrap_err();
        assert!(err.to_string().contains("value 0.5"));
    }

    #[test]
    fn test_empty_sentence_before_real_one_rejected() {
        let device = Default::default();
        // sentence 0 empty, sentence 1 occupied
        let mask = tensor::<3>(vec![0.0, 0.0, 1.0, 0.0], [1, 2, 2], &device);
        let err = validate_mask::<TestBackend, 3>(&mask, "document").unwrap_err();
        assert!(err.to_string().contains("index 1 is occupied but index 0"));
    }

    #[test]
    fn test_trailing_empty_sentence_and_empty_row_allowed() {
        let device = Default::default();
        let mask = tensor::<3>(
            vec![
                1.0, 1.0, 1.0, 0.0, 0.0, 0.0, // row 0: one real sentence, one empty
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // row 1: nothing real
            ],
            [2, 2, 3],
            &device,
        );
        assert_eq!(validate_mask::<TestBackend, 3>(&mask, "document"), Ok(1));
    }
}
