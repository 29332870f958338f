use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;
use crate::arch::activations::softmax;

/// Categorical cross-entropy over raw logits, with softmax fused in.
///
/// Fusing keeps the backward pass at `(softmax(logits) - y) / n`, so the
/// network's output layer stays a plain logits layer and never needs an
/// element-wise softmax derivative.
#[derive(Default, Clone, Copy)]
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    /// Returns a new `SoftmaxCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for SoftmaxCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let probs = softmax(y_pred);
        let mut total = 0.0;

        Zip::from(&probs).and(&y).for_each(|&p, &y| {
            if y > 0.0 {
                total -= y * p.max(1e-12).ln();
            }
        });

        total / y.nrows() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (softmax(y_pred) - &y) / y.nrows() as f32
    }
}
