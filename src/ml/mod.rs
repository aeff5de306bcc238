// ============================================================
// Layer 5 — ML / Attention Layer (Burn)
// ============================================================
// All Burn tensor code lives here. The other layers only see
// configs, batches and the outputs of FusionModel::forward.
//
//   masking.rs      — masked softmax / weighted sum / max
//   similarity.rs   — bilinear and trilinear pair scorers
//   bi_attention.rs — c2q + q2c attention and the 4·d fusion
//   highway.rs      — highway gate and stack
//   validate.rs     — shape checks and mask validation
//   model.rs        — highway → bi-attention, plus summaries
//
// Everything is generic over the Burn Backend, so the same
// code runs on NdArray (CPU, tests) and Wgpu.
//
// Reference: Seo et al. (2017) Bidirectional Attention Flow
//            Srivastava et al. (2015) Highway Networks

use burn::prelude::*;

use crate::domain::FusionError;

/// Masked softmax, weighted sum and max reductions
pub mod masking;

/// Pairwise document/query similarity
pub mod similarity;

/// Bidirectional attention fusion
pub mod bi_attention;

/// Highway gates
pub mod highway;

/// Shape and mask validation
pub mod validate;

/// Highway + bi-attention model and output summaries
pub mod model;

/// Copies a tensor to the host as f32 values in row-major order.
pub(crate) fn read_back<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> Result<Vec<f32>, FusionError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| FusionError::Readback(format!("{e:?}")))
}

#[cfg(test)]
pub(crate) mod test_util {
    use burn::prelude::*;

    pub type TestBackend = burn::backend::NdArray<f32>;
    pub type TestDevice  = <TestBackend as Backend>::Device;

    pub fn tensor<const D: usize>(
        data:   Vec<f32>,
        shape:  [usize; D],
        device: &TestDevice,
    ) -> Tensor<TestBackend, D> {
        Tensor::from_data(TensorData::new(data, shape), device)
    }

    pub fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        super::read_back(tensor).unwrap()
    }

    /// Deterministic pseudo-random values in [-1.25, 1.25]
    pub fn ramp(n: usize, salt: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (((i + salt) * 37 % 11) as f32 - 5.0) / 4.0)
            .collect()
    }

    pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(actual.len(), expected.len(), "length differs");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() <= tol, "index {i}: {a} vs {e}");
        }
    }
}
