use std::num::NonZeroUsize;

use ndarray::{ArrayView1, ArrayView2};
use rand::Rng;

use crate::arch::{loss::LossFn, Sequential};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::optimization::Optimizer;

/// Runs the training loop: holds the model, the optimizer, the loss function
/// and both dataset splits, and owns the gradient buffer reused across
/// batches.
pub struct Trainer<O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: Sequential,
    optimizer: O,
    loss_fn: L,
    train_set: Dataset,
    valid_set: Dataset,
    grad: Vec<f32>,

    epochs: usize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<O, L, R> Trainer<O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - Dictates how to update the weights on each gradient.
    /// * `loss_fn` - Measures the difference between predicted and expected outputs.
    /// * `train_set` - The split used for fitting.
    /// * `valid_set` - The held-out split used for per-epoch metrics.
    /// * `epochs` - The amount of passes over the training set.
    /// * `batch_size` - Rows per gradient update.
    /// * `rng` - Drives the per-epoch shuffle.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: Sequential,
        optimizer: O,
        loss_fn: L,
        train_set: Dataset,
        valid_set: Dataset,
        epochs: usize,
        batch_size: NonZeroUsize,
        rng: R,
    ) -> Self {
        Self {
            grad: vec![0.0; model.size()],
            model,
            optimizer,
            loss_fn,
            train_set,
            valid_set,
            epochs,
            batch_size,
            rng,
        }
    }

    /// Trains for the configured amount of epochs, updating `params` in
    /// place. After each epoch the validation split is evaluated and the
    /// progress is logged.
    ///
    /// # Returns
    /// The per-epoch statistics, in order.
    pub fn train(&mut self, params: &mut [f32]) -> Result<Vec<EpochStats>> {
        let mut history = Vec::with_capacity(self.epochs);

        for epoch in 1..=self.epochs {
            self.train_set.shuffle(&mut self.rng);
            let batches = self.train_set.batches(self.batch_size.get());

            let train_loss = self.model.backprop(
                params,
                &mut self.grad,
                &self.loss_fn,
                &mut self.optimizer,
                batches,
            )?;

            let (x, y) = self.valid_set.xy();
            let y_pred = self.model.forward(params, x)?;
            let valid_loss = self.loss_fn.loss(y_pred.view(), y);
            let valid_accuracy = accuracy(y_pred.view(), y);

            log::info!(
                "epoch {epoch}/{}: loss {train_loss:.4}, val_loss {valid_loss:.4}, val_accuracy {valid_accuracy:.4}",
                self.epochs
            );

            history.push(EpochStats {
                epoch,
                train_loss,
                valid_loss,
                valid_accuracy,
            });
        }

        Ok(history)
    }

    /// Consumes the trainer and hands back the model, e.g. for exporting.
    pub fn into_model(self) -> Sequential {
        self.model
    }
}

/// Statistics produced by a single training epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    epoch: usize,
    train_loss: f32,
    valid_loss: f32,
    valid_accuracy: f32,
}

impl EpochStats {
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn train_loss(&self) -> f32 {
        self.train_loss
    }

    pub fn valid_loss(&self) -> f32 {
        self.valid_loss
    }

    pub fn valid_accuracy(&self) -> f32 {
        self.valid_accuracy
    }
}

/// Fraction of rows where the predicted and expected classes agree.
/// Softmax is monotonic, so comparing argmax over logits is enough.
pub fn accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    if y.nrows() == 0 {
        return 0.0;
    }

    let hits = y_pred
        .rows()
        .into_iter()
        .zip(y.rows())
        .filter(|&(pred, expected)| argmax(pred) == argmax(expected))
        .count();

    hits as f32 / y.nrows() as f32
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}
