//! Optimizer backends that fit the single affine layer.
//!
//! The trainer only drives `step` over minibatches and reads the current
//! weights back with `head`, so numeric backends can be swapped freely.

use candle_core::Device;

use ratehead_core::config::{BackendKind, TrainingSettings};
use ratehead_core::error::Result;
use ratehead_core::types::LinearHead;

pub mod candle;
pub mod gd;

pub use self::candle::CandleAdam;
pub use self::gd::GradientDescent;

pub trait OptimizerBackend {
    /// Input dimension of the layer.
    fn dim(&self) -> usize;
    /// Apply one update on a minibatch and return its MSE before the update.
    fn step(&mut self, xs: &[&[f32]], ys: &[f64]) -> Result<f64>;
    /// Snapshot of the current weights.
    fn head(&self) -> Result<LinearHead>;
}

impl<B: OptimizerBackend + ?Sized> OptimizerBackend for Box<B> {
    fn dim(&self) -> usize { (**self).dim() }
    fn step(&mut self, xs: &[&[f32]], ys: &[f64]) -> Result<f64> { (**self).step(xs, ys) }
    fn head(&self) -> Result<LinearHead> { (**self).head() }
}

pub fn build_backend(dim: usize, settings: &TrainingSettings, device: &Device) -> Result<Box<dyn OptimizerBackend>> {
    Ok(match settings.backend {
        BackendKind::Adam => Box::new(CandleAdam::new(dim, settings.learning_rate, settings.seed, device)?),
        BackendKind::Gd => Box::new(GradientDescent::new(dim, settings.learning_rate)),
    })
}
