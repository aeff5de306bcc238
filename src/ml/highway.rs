// ============================================================
// Layer 5 — Highway Gate and Stack
// ============================================================
// One highway gate blends a transformed signal with its input:
//
//   t   = relu(W_t x + b_t)
//   g   = sigmoid(W_g x + b_g)        in (0, 1)
//   out = t ⊙ g + x ⊙ (1 − g)
//
// g → 0 carries x through unchanged, g → 1 keeps only the
// transform. b_g starts at a configurable offset; a negative
// offset biases a freshly built stack towards carrying.
//
// A HighwayStack is a plain Vec of gates with their own
// parameters, applied in order. Width never changes, so the
// stack works on tensors of any rank whose last axis is d_model.
// Any other last axis is a ShapeMismatch, raised before the
// first gate runs.

use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::domain::FusionError;

#[derive(Config, Debug)]
pub struct HighwayConfig {
    pub d_model: usize,
    #[config(default = 2)]
    pub depth: usize,
    #[config(default = 0.0)]
    pub gate_bias: f64,
}

impl HighwayConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HighwayStack<B> {
        let layers = (0..self.depth).map(|_| self.init_gate(device)).collect();
        HighwayStack { layers, d_model: self.d_model }
    }

    /// A single gate with freshly initialised parameters.
    pub fn init_gate<B: Backend>(&self, device: &B::Device) -> HighwayGate<B> {
        let transform = LinearConfig::new(self.d_model, self.d_model).init(device);
        let mut gate  = LinearConfig::new(self.d_model, self.d_model).init(device);
        gate.bias = Some(Param::from_tensor(Tensor::full(
            [self.d_model],
            self.gate_bias,
            device,
        )));
        HighwayGate { transform, gate, d_model: self.d_model }
    }
}

#[derive(Module, Debug)]
pub struct HighwayGate<B: Backend> {
    transform: Linear<B>,
    gate:      Linear<B>,
    d_model:   usize,
}

impl<B: Backend> HighwayGate<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Result<Tensor<B, D>, FusionError> {
        check_width(&x, self.d_model)?;
        Ok(self.apply(x))
    }

    fn apply<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let transformed = relu(self.transform.forward(x.clone()));
        let g           = sigmoid(self.gate.forward(x.clone()));
        let carry       = g.clone().neg().add_scalar(1.0);
        transformed * g + x * carry
    }

    /// Replace W_t / b_t. `weight` is `[d_model, d_model]`, `bias` `[d_model]`.
    pub fn with_transform(mut self, weight: Tensor<B, 2>, bias: Tensor<B, 1>) -> Result<Self, FusionError> {
        replace_linear(&mut self.transform, self.d_model, "highway transform", weight, bias)?;
        Ok(self)
    }

    /// Replace W_g / b_g. `weight` is `[d_model, d_model]`, `bias` `[d_model]`.
    pub fn with_gate(mut self, weight: Tensor<B, 2>, bias: Tensor<B, 1>) -> Result<Self, FusionError> {
        replace_linear(&mut self.gate, self.d_model, "highway gate", weight, bias)?;
        Ok(self)
    }
}

fn check_width<B: Backend, const D: usize>(x: &Tensor<B, D>, d_model: usize) -> Result<(), FusionError> {
    let dims  = x.dims();
    let width = dims.last().copied().unwrap_or(0);
    if width != d_model {
        return Err(FusionError::shape("highway input width", [d_model], [width]));
    }
    Ok(())
}

fn replace_linear<B: Backend>(
    linear: &mut Linear<B>,
    d:      usize,
    what:   &str,
    weight: Tensor<B, 2>,
    bias:   Tensor<B, 1>,
) -> Result<(), FusionError> {
    if weight.dims() != [d, d] {
        return Err(FusionError::shape(format!("{what} weight"), [d, d], weight.dims()));
    }
    if bias.dims() != [d] {
        return Err(FusionError::shape(format!("{what} bias"), [d], bias.dims()));
    }
    linear.weight = Param::from_tensor(weight);
    linear.bias   = Some(Param::from_tensor(bias));
    Ok(())
}

#[derive(Module, Debug)]
pub struct HighwayStack<B: Backend> {
    layers:  Vec<HighwayGate<B>>,
    d_model: usize,
}

impl<B: Backend> HighwayStack<B> {
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }

    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Result<Tensor<B, D>, FusionError> {
        check_width(&x, self.d_model)?;
        Ok(self.layers.iter().fold(x, |x, layer| layer.apply(x)))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_util::{assert_close, tensor, values, TestBackend};

    const D: usize = 3;

    fn input(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        tensor::<3>(vec![0.5, -1.0, 2.0, -3.0, 0.25, 1.5], [1, 2, D], device)
    }

    fn forced_gate(bias: f32, device: &<TestBackend as Backend>::Device) -> HighwayGate<TestBackend> {
        HighwayConfig::new(D)
            .init_gate::<TestBackend>(device)
            .with_transform(
                tensor::<2>(vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, -1.0], [D, D], device),
                tensor::<1>(vec![0.1, 0.0, 0.0], [D], device),
            )
            .unwrap()
            .with_gate(
                tensor::<2>(vec![0.0; D * D], [D, D], device),
                tensor::<1>(vec![bias; D], [D], device),
            )
            .unwrap()
    }

    #[test]
    fn test_closed_gate_is_identity() {
        let device = Default::default();
        let x = input(&device);
        let out = forced_gate(-1e4, &device).forward(x.clone()).unwrap();
        assert_close(&values(out), &values(x), 1e-6);
    }

    #[test]
    fn test_open_gate_is_transform_branch() {
        let device = Default::default();
        let out = forced_gate(1e4, &device).forward(input(&device)).unwrap();
        // relu(diag(1, 2, -1) x + [0.1, 0, 0])
        let expected = vec![0.6, 0.0, 0.0, 0.0, 0.5, 0.0];
        assert_close(&values(out), &expected, 1e-6);
    }

    #[test]
    fn test_half_open_gate_blends() {
        let device = Default::default();
        let x = input(&device);
        let out = values(forced_gate(0.0, &device).forward(x.clone()).unwrap());
        let x = values(x);
        // g = 0.5 everywhere: out = 0.5 * relu(t) + 0.5 * x
        assert!((out[0] - 0.5 * (0.6 + 0.5)).abs() < 1e-6);
        assert!((out[1] - 0.5 * x[1]).abs() < 1e-6);
    }

    #[test]
    fn test_gate_bias_offset() {
        let device = Default::default();
        let gate: HighwayGate<TestBackend> = HighwayConfig::new(4)
            .with_gate_bias(-2.0)
            .init_gate(&device);
        let bias = gate.gate.bias.as_ref().map(|b| values(b.val())).unwrap();
        assert_eq!(bias, vec![-2.0; 4]);
    }

    #[test]
    fn test_depth_zero_is_identity() {
        let device = Default::default();
        let stack: HighwayStack<TestBackend> = HighwayConfig::new(D).with_depth(0).init(&device);
        let x = input(&device);
        assert_eq!(stack.depth(), 0);
        assert_eq!(values(stack.forward(x.clone()).unwrap()), values(x));
    }

    #[test]
    fn test_stack_applies_gates_in_order() {
        let device = Default::default();
        let stack: HighwayStack<TestBackend> = HighwayConfig::new(D).with_depth(3).init(&device);
        let x = input(&device);

        let manual = stack
            .layers
            .iter()
            .fold(x.clone(), |acc, gate| gate.forward(acc).unwrap());
        assert_close(&values(stack.forward(x).unwrap()), &values(manual), 1e-6);
    }

    #[test]
    fn test_stack_layers_are_independent() {
        let device = Default::default();
        let stack: HighwayStack<TestBackend> = HighwayConfig::new(8).with_depth(2).init(&device);
        let w0 = values(stack.layers[0].transform.weight.val());
        let w1 = values(stack.layers[1].transform.weight.val());
        assert_ne!(w0, w1);
        assert_eq!(stack.d_model(), 8);
    }

    #[test]
    fn test_stack_preserves_shape_for_any_rank() {
        let device = Default::default();
        let stack: HighwayStack<TestBackend> = HighwayConfig::new(2).init(&device);
        let x4 = Tensor::<TestBackend, 4>::zeros([2, 3, 5, 2], &device);
        assert_eq!(stack.forward(x4).unwrap().dims(), [2, 3, 5, 2]);
    }

    #[test]
    fn test_rejects_wrong_weight_shape() {
        let device = Default::default();
        let err = HighwayConfig::new(D)
            .init_gate::<TestBackend>(&device)
            .with_gate(
                tensor::<2>(vec![0.0; 6], [2, D], &device),
                tensor::<1>(vec![0.0; D], [D], &device),
            )
            .unwrap_err();
        assert!(matches!(err, FusionError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_input_of_other_width() {
        let device = Default::default();
        let stack: HighwayStack<TestBackend> = HighwayConfig::new(4).init(&device);
        let x = Tensor::<TestBackend, 3>::zeros([1, 2, 3], &device);
        assert_eq!(
            stack.forward(x.clone()).unwrap_err(),
            FusionError::shape("highway input width", [4], [3])
        );

        let gate: HighwayGate<TestBackend> = HighwayConfig::new(4).init_gate(&device);
        assert!(matches!(gate.forward(x), Err(FusionError::ShapeMismatch { .. })));

        // depth 0 still checks the width
        let empty: HighwayStack<TestBackend> = HighwayConfig::new(4).with_depth(0).init(&device);
        assert!(empty.forward(Tensor::<TestBackend, 2>::zeros([2, 3], &device)).is_err());
    }
}
