// ============================================================
// Layer 5 — Masked Reductions
// ============================================================
// The four primitives everything else in the ml layer is
// built from:
//
//   apply_mask          — push padded positions to -MAGNITUDE
//   masked_softmax      — apply_mask, then a max-shifted softmax
//   masked_weighted_sum — attention read-out (batched matmul)
//   reduce_max          — drop an axis by taking its maximum
//
// Masks are float tensors holding 1.0 (real) and 0.0 (padding).
//
// Why a finite magnitude instead of f32::NEG_INFINITY?
//   A row where EVERY position is masked would become
//   (-inf) - (-inf) = NaN after the max shift. With a finite
//   magnitude the row collapses to equal values and the softmax
//   returns a uniform distribution instead.
//
// 1e30 suits f32: exp(-1e30) underflows to exactly 0.0, and
// 2 * 1e30 (a value masked twice) is still far below f32::MAX.
// check_mask_magnitude rejects values that would overflow to
// -inf once doubled, or that are too small to suppress anything.

use burn::prelude::*;

use crate::domain::FusionError;

/// Default magnitude used to suppress padded logits in f32.
pub const MASK_MAGNITUDE: f64 = 1e30;

/// Smallest accepted magnitude; exp(-1e4) is already 0.0 in f32.
pub const MIN_MASK_MAGNITUDE: f64 = 1e4;

/// Exclusive upper bound. Logits can be masked twice and the max shift
/// subtracts two such values, so four times the magnitude must stay finite.
pub const MAX_MASK_MAGNITUDE: f64 = f32::MAX as f64 / 4.0;

pub fn check_mask_magnitude(magnitude: f64) -> Result<(), FusionError> {
    let reason = if !magnitude.is_finite() {
        "not finite"
    } else if magnitude < MIN_MASK_MAGNITUDE {
        "too small to suppress padded logits (minimum 1e4)"
    } else if magnitude >= MAX_MASK_MAGNITUDE {
        "overflows f32 once a logit is masked twice"
    } else {
        return Ok(());
    };
    Err(FusionError::InvalidMagnitude { value: magnitude, reason: reason.into() })
}

/// `logits + (1 - mask) * -magnitude`. Real positions are unchanged.
pub fn apply_mask<B: Backend, const D: usize>(
    logits:    Tensor<B, D>,
    mask:      Tensor<B, D>,
    magnitude: f64,
) -> Tensor<B, D> {
    let penalty = mask.neg().add_scalar(1.0).mul_scalar(-magnitude);
    logits + penalty
}

/// Masks `logits` with `mask` and takes the softmax along `dim`.
///
/// The per-axis maximum is subtracted before exponentiating, so the largest
/// entry always contributes exp(0) = 1 and the denominator never reaches zero.
/// When every entry on the axis is masked they are all equal after the shift
/// and the result is uniform over the whole axis.
///
/// Logits that were masked before (the similarity scores are) may pass
/// through again; a padded entry just moves further down.
pub fn masked_softmax<B: Backend, const D: usize>(
    logits:    Tensor<B, D>,
    mask:      Tensor<B, D>,
    dim:       usize,
    magnitude: f64,
) -> Tensor<B, D> {
    let masked  = apply_mask(logits, mask, magnitude);
    let shifted = masked.clone() - masked.max_dim(dim);
    let exp     = shifted.exp();
    exp.clone() / exp.sum_dim(dim)
}

/// Contracts `weights` `[batch, rows, n]` against `values` `[batch, n, dim]`
/// along `n`, giving `[batch, rows, dim]`.
///
/// Positions with zero weight contribute nothing, whatever their values.
pub fn masked_weighted_sum<B: Backend>(
    values:  Tensor<B, 3>,
    weights: Tensor<B, 3>,
) -> Tensor<B, 3> {
    weights.matmul(values)
}

/// Maximum along `dim` of a rank-4 tensor, with that axis removed.
pub fn reduce_max<B: Backend>(tensor: Tensor<B, 4>, dim: usize) -> Tensor<B, 3> {
    let dims = tensor.dims();
    let mut kept = [0usize; 3];
    for (slot, size) in dims
        .iter()
        .enumerate()
        .filter(|(axis, _)| *axis != dim)
        .map(|(_, size)| *size)
        .enumerate()
    {
        kept[slot] = size;
    }
    tensor.max_dim(dim).reshape(kept)
}
