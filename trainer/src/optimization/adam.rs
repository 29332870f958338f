use super::Optimizer;

/// Adam optimization algorithm (Kingma & Ba), the original trainer's choice.
///
/// Keeps exponentially decayed first and second moment estimates per
/// parameter and applies bias correction on every step. The moment buffers
/// are sized lazily on the first `update_params` call.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,

    m: Vec<f32>,
    v: Vec<f32>,
    t: i32,
}

impl Adam {
    /// Returns a new `Adam` with the standard β1 = 0.9, β2 = 0.999,
    /// ε = 1e-8 defaults.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        if self.m.len() != params.len() {
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
            self.t = 0;
        }

        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        let moments = self.m.iter_mut().zip(self.v.iter_mut());
        for ((w, &g), (m, v)) in params.iter_mut().zip(grad).zip(moments) {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;

            let m_hat = *m / bias1;
            let v_hat = *v / bias2;

            *w -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}
