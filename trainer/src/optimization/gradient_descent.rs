use super::Optimizer;

/// Plain gradient descent.
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    /// Updates the parameters by making a step in the opposite direction of
    /// the gradient, with a length of `learning_rate`.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let lr = self.learning_rate;

        for (w, g) in params.iter_mut().zip(grad) {
            *w -= lr * g;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn step_moves_against_gradient() {
        let mut params = [1.0, -2.0, 0.5];
        let grad = [0.5, -1.0, 0.0];

        GradientDescent::new(0.1).update_params(&mut params, &grad);

        assert_eq!(params, [0.95, -1.9, 0.5]);
    }
}
