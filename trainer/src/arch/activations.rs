use ndarray::{Array2, ArrayView2};

/// Element-wise activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActFn {
    Relu,
}

impl ActFn {
    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Relu => z.max(0.0),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Row-wise softmax over a batch of logits.
///
/// Uses the max-subtracted form so large logits cannot overflow. Every
/// output row sums to 1.
pub fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut out = logits.to_owned();

    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|z| (z - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|e| e / sum);
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn relu_clamps_negatives() {
        assert_eq!(ActFn::Relu.f(-3.0), 0.0);
        assert_eq!(ActFn::Relu.f(2.5), 2.5);
        assert_eq!(ActFn::Relu.df(-3.0), 0.0);
        assert_eq!(ActFn::Relu.df(2.5), 1.0);
    }

    #[test]
    fn softmax_rows_are_normalized() {
        let logits = array![[1.0, 2.0, 3.0], [-5.0, 0.0, 5.0], [0.0, 0.0, 0.0]];
        let probs = softmax(logits.view());

        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let logits = array![[1000.0, 1001.0, 999.0]];
        let probs = softmax(logits.view());

        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.row(0).sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_preserves_ordering() {
        let logits = array![[0.2, 1.7, -0.4]];
        let probs = softmax(logits.view());

        assert!(probs[[0, 1]] > probs[[0, 0]]);
        assert!(probs[[0, 0]] > probs[[0, 2]]);
    }
}
