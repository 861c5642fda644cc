use ratehead_core::error::{Error, Result};
use ratehead_core::types::LinearHead;

use super::OptimizerBackend;

/// Plain minibatch gradient descent on MSE, in f64, zero-initialised.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    weights: Vec<f64>,
    bias: f64,
    lr: f64,
}

impl GradientDescent {
    pub fn new(dim: usize, lr: f64) -> Self { Self { weights: vec![0.0; dim], bias: 0.0, lr } }
}

impl OptimizerBackend for GradientDescent {
    fn dim(&self) -> usize { self.weights.len() }

    #[allow(clippy::cast_precision_loss)]
    fn step(&mut self, xs: &[&[f32]], ys: &[f64]) -> Result<f64> {
        if xs.is_empty() || xs.len() != ys.len() {
            return Err(Error::Training(format!("batch of {} rows with {} labels", xs.len(), ys.len())));
        }
        let n = xs.len() as f64;
        let mut grad_w = vec![0.0f64; self.weights.len()];
        let mut grad_b = 0.0f64;
        let mut loss = 0.0f64;
        for (x, &y) in xs.iter().zip(ys) {
            if x.len() != self.weights.len() {
                return Err(Error::Training(format!("row has {} features, layer expects {}", x.len(), self.weights.len())));
            }
            let pred = x.iter().zip(&self.weights).map(|(&xi, &w)| f64::from(xi) * w).sum::<f64>() + self.bias;
            let err = pred - y;
            loss += err * err;
            for (g, &xi) in grad_w.iter_mut().zip(x.iter()) {
                *g += err * f64::from(xi);
            }
            grad_b += err;
        }
        let scale = 2.0 / n;
        for (w, g) in self.weights.iter_mut().zip(&grad_w) {
            *w -= self.lr * scale * g;
        }
        self.bias -= self.lr * scale * grad_b;
        Ok(loss / n)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn head(&self) -> Result<LinearHead> {
        Ok(LinearHead {
            weights: self.weights.iter().map(|&w| w as f32).collect(),
            bias: self.bias as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_a_line() {
        // y = 2*x0 - x1 + 0.5
        let xs: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0], vec![0.5, 0.25]];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * f64::from(x[0]) - f64::from(x[1]) + 0.5).collect();
        let rows: Vec<&[f32]> = xs.iter().map(Vec::as_slice).collect();

        let mut gd = GradientDescent::new(2, 0.2);
        let first = gd.step(&rows, &ys).unwrap();
        let mut last = first;
        for _ in 0..2000 {
            last = gd.step(&rows, &ys).unwrap();
        }
        assert!(last < first);
        assert!(last < 1e-6, "loss={last}");
        let head = gd.head().unwrap();
        assert!((head.weights[0] - 2.0).abs() < 1e-2);
        assert!((head.weights[1] + 1.0).abs() < 1e-2);
        assert!((head.bias - 0.5).abs() < 1e-2);
    }

    #[test]
    fn rejects_mismatched_rows() {
        let mut gd = GradientDescent::new(3, 0.1);
        let row = [1.0f32, 2.0];
        assert!(matches!(gd.step(&[&row], &[1.0]), Err(Error::Training(_))));
        assert!(matches!(gd.step(&[], &[]), Err(Error::Training(_))));
    }
}
