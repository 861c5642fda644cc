//! Adam on candle tensors.
//!
//! Mirrors a `Dense(1)` layer compiled with `adam` and `mse`: Glorot-uniform
//! weights, zero bias, β1 0.9, β2 0.999, ε 1e-7, no weight decay.

use candle_core::{DType, Device, Module, Tensor, Var};
use candle_nn::{AdamW, Linear, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ratehead_core::error::{Error, Result};
use ratehead_core::types::LinearHead;

use super::OptimizerBackend;

fn candle_err(e: candle_core::Error) -> Error { Error::Training(e.to_string()) }

/// Glorot-uniform init for a `dim -> 1` kernel.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn glorot_uniform(dim: usize, seed: u64) -> Vec<f32> {
    let limit = (6.0 / (dim as f64 + 1.0)).sqrt();
    let mut rng = StdRng::seed_from_u64(seed);
    (0..dim).map(|_| rng.gen_range(-limit..limit) as f32).collect()
}

pub struct CandleAdam {
    weight: Var,
    bias: Var,
    linear: Linear,
    opt: AdamW,
    device: Device,
    dim: usize,
}

impl CandleAdam {
    pub fn new(dim: usize, lr: f64, seed: u64, device: &Device) -> Result<Self> {
        Self::build(dim, lr, seed, device).map_err(candle_err)
    }

    fn build(dim: usize, lr: f64, seed: u64, device: &Device) -> candle_core::Result<Self> {
        let init = Tensor::from_vec(glorot_uniform(dim, seed), (1, dim), device)?;
        let weight = Var::from_tensor(&init)?;
        let bias = Var::zeros(1, DType::F32, device)?;
        let linear = Linear::new(weight.as_tensor().clone(), Some(bias.as_tensor().clone()));
        let params = ParamsAdamW { lr, beta1: 0.9, beta2: 0.999, eps: 1e-7, weight_decay: 0.0 };
        let opt = AdamW::new(vec![weight.clone(), bias.clone()], params)?;
        Ok(Self { weight, bias, linear, opt, device: device.clone(), dim })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn step_inner(&mut self, xs: &[&[f32]], ys: &[f64]) -> candle_core::Result<f32> {
        let flat: Vec<f32> = xs.iter().flat_map(|row| row.iter().copied()).collect();
        let x = Tensor::from_vec(flat, (xs.len(), self.dim), &self.device)?;
        let targets: Vec<f32> = ys.iter().map(|&y| y as f32).collect();
        let y = Tensor::from_vec(targets, (ys.len(), 1), &self.device)?;
        let pred = self.linear.forward(&x)?;
        let loss = candle_nn::loss::mse(&pred, &y)?;
        self.opt.backward_step(&loss)?;
        loss.to_scalar::<f32>()
    }

    fn head_inner(&self) -> candle_core::Result<(Vec<f32>, Vec<f32>)> {
        let w = self.weight.as_tensor().flatten_all()?.to_vec1::<f32>()?;
        let b = self.bias.as_tensor().to_vec1::<f32>()?;
        Ok((w, b))
    }
}

impl OptimizerBackend for CandleAdam {
    fn dim(&self) -> usize { self.dim }

    fn step(&mut self, xs: &[&[f32]], ys: &[f64]) -> Result<f64> {
        if xs.is_empty() || xs.len() != ys.len() {
            return Err(Error::Training(format!("batch of {} rows with {} labels", xs.len(), ys.len())));
        }
        if let Some(bad) = xs.iter().find(|row| row.len() != self.dim) {
            return Err(Error::Training(format!("row has {} features, layer expects {}", bad.len(), self.dim)));
        }
        self.step_inner(xs, ys).map(f64::from).map_err(candle_err)
    }

    fn head(&self) -> Result<LinearHead> {
        let (weights, bias) = self.head_inner().map_err(candle_err)?;
        // A Dense(1) layer: one weight per input and a single bias.
        match bias.as_slice() {
            [b] if weights.len() == self.dim => Ok(LinearHead { weights, bias: *b }),
            _ => Err(Error::InvalidHead(format!("layer has {} weights and {} biases", weights.len(), bias.len()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_seeded_and_bounded() {
        let a = glorot_uniform(768, 42);
        assert_eq!(a, glorot_uniform(768, 42));
        let limit = (6.0f32 / 769.0).sqrt();
        assert!(a.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn adam_reduces_loss_on_constant_target() {
        let mut adam = CandleAdam::new(3, 0.05, 42, &Device::Cpu).unwrap();
        let xs: Vec<Vec<f32>> = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        let rows: Vec<&[f32]> = xs.iter().map(Vec::as_slice).collect();
        let ys = [3.0, 3.0, 3.0];

        let first = adam.step(&rows, &ys).unwrap();
        let mut last = first;
        for _ in 0..300 {
            last = adam.step(&rows, &ys).unwrap();
        }
        assert!(last < first * 0.1, "first={first} last={last}");

        let head = adam.head().unwrap();
        assert_eq!(head.weights.len(), 3);
        assert!(head.bias > 0.0);
    }
}
