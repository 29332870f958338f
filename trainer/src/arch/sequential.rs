use ndarray::{Array2, ArrayView2};

use super::{layers::Dense, loss::LossFn};
use crate::error::{Result, TrainerError};
use crate::optimization::Optimizer;

/// A feed-forward stack of dense layers over one flat parameter buffer.
///
/// Information flows forward when computing an output and backward when
/// computing the deltas of its layers. Each layer reads its own slice of
/// `params`, in layer order.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential` from the given layers.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// The total amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Makes a forward pass through the network.
    ///
    /// # Errors
    /// Returns a `SizeMismatch` when `params` does not match the model size.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if params.len() != self.size() {
            return Err(TrainerError::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: self.size(),
            });
        }

        let mut params = params;
        let mut x = x.to_owned();

        for layer in self.layers.iter_mut() {
            let (head, rest) = params.split_at(layer.size());
            params = rest;
            x = layer.forward(head, x.view());
        }

        Ok(x)
    }

    /// Runs one epoch of mini-batch backpropagation: for every batch the
    /// gradient is recomputed and `params` is updated in place by the
    /// optimizer.
    ///
    /// # Returns
    /// The epoch loss, approximated by averaging the per-batch losses.
    pub fn backprop<'a, L, O, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        batches: I,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        if grad.len() != self.size() {
            return Err(TrainerError::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: self.size(),
            });
        }

        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            grad.fill(0.0);

            let y_pred = self.forward(params, x)?;
            total_loss += loss_fn.loss(y_pred.view(), y);
            num_batches += 1;

            let mut d = loss_fn.loss_prime(y_pred.view(), y);
            let mut offset = params.len();

            for layer in self.layers.iter_mut().rev() {
                let size = layer.size();
                offset -= size;
                d = layer.backward(
                    &params[offset..offset + size],
                    &mut grad[offset..offset + size],
                    d,
                );
            }

            optimizer.update_params(params, grad);
        }

        if num_batches == 0 {
            return Err(TrainerError::EmptyDataset);
        }

        Ok(total_loss / num_batches as f32)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::activations::ActFn;
    use ndarray::array;

    #[test]
    fn size_sums_over_layers() {
        let model = Sequential::new([
            Dense::new((1, 8), Some(ActFn::Relu)),
            Dense::new((8, 3), None),
        ]);

        assert_eq!(model.size(), 16 + 27);
    }

    #[test]
    fn forward_rejects_wrong_param_count() {
        let mut model = Sequential::new([Dense::new((1, 2), None)]);
        let x = array![[1.0]];

        let err = model.forward(&[0.0; 3], x.view()).unwrap_err();

        assert!(matches!(
            err,
            TrainerError::SizeMismatch {
                what: "params",
                got: 3,
                expected: 4,
            }
        ));
    }

    #[test]
    fn forward_chains_layers() {
        // First layer doubles, second adds one: y = 2x + 1.
        let params = [2.0, 0.0, 1.0, 1.0];
        let mut model = Sequential::new([Dense::new((1, 1), None), Dense::new((1, 1), None)]);

        let out = model.forward(&params, array![[3.0]].view()).unwrap();

        assert_eq!(out, array![[7.0]]);
    }
}
