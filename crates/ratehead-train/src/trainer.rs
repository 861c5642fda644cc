//! Epoch-driven fitting of the linear head.
//!
//! `HeadTrainer` is an explicit state machine: it owns the epoch counter and
//! the optimizer backend (which owns the current weights). Each
//! `step_epoch` reshuffles the train partition with a seeded RNG, feeds it to
//! the backend in minibatches, then scores the snapshot on validation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use candle_core::Device;
use ratehead_core::config::TrainingSettings;
use ratehead_core::error::{Error, Result};
use ratehead_core::types::LinearHead;

use crate::backend::{build_backend, OptimizerBackend};
use crate::split::{train_val_split, Split};

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    pub train_loss: f64,
    pub val_mse: Option<f64>,
    pub val_mae: Option<f64>,
}

pub struct HeadTrainer<'a, B> {
    backend: B,
    xs: &'a [Vec<f32>],
    ys: &'a [f64],
    split: Split,
    epochs: usize,
    batch_size: usize,
    epoch: usize,
    rng: StdRng,
}

impl<'a, B: OptimizerBackend> HeadTrainer<'a, B> {
    pub fn new(backend: B, xs: &'a [Vec<f32>], ys: &'a [f64], settings: &TrainingSettings) -> Result<Self> {
        settings.validate()?;
        if xs.len() != ys.len() {
            return Err(Error::Training(format!("{} vectors but {} labels", xs.len(), ys.len())));
        }
        let dim = backend.dim();
        if let Some((row, x)) = xs.iter().enumerate().find(|(_, x)| x.len() != dim) {
            return Err(Error::DimensionMismatch { row, expected: dim, actual: x.len() });
        }
        let split = train_val_split(xs.len(), settings.val_frac, settings.seed)?;
        info!(
            "Training head: {} train / {} validation rows, {} epochs, batch {}",
            split.train.len(),
            split.validation.len(),
            settings.epochs,
            settings.batch_size
        );
        Ok(Self {
            backend,
            xs,
            ys,
            split,
            epochs: settings.epochs,
            batch_size: settings.batch_size,
            epoch: 0,
            rng: StdRng::seed_from_u64(settings.seed),
        })
    }

    /// Number of completed epochs.
    pub fn epoch(&self) -> usize { self.epoch }

    pub fn is_done(&self) -> bool { self.epoch >= self.epochs }

    /// Validation MSE/MAE of `head`, or `None` with an empty validation set.
    fn validation_metrics(&self, head: &LinearHead) -> Option<(f64, f64)> {
        head.mse_mae(self.split.validation.iter().map(|&i| (self.xs[i].as_slice(), self.ys[i])))
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn step_epoch(&mut self) -> Result<EpochReport> {
        let mut order = self.split.train.clone();
        order.shuffle(&mut self.rng);

        let mut weighted_loss = 0.0;
        for batch in order.chunks(self.batch_size) {
            let xs: Vec<&[f32]> = batch.iter().map(|&i| self.xs[i].as_slice()).collect();
            let ys: Vec<f64> = batch.iter().map(|&i| self.ys[i]).collect();
            weighted_loss += self.backend.step(&xs, &ys)? * batch.len() as f64;
        }
        self.epoch += 1;

        let head = self.backend.head()?;
        let metrics = self.validation_metrics(&head);
        let report = EpochReport {
            epoch: self.epoch,
            train_loss: weighted_loss / order.len() as f64,
            val_mse: metrics.map(|m| m.0),
            val_mae: metrics.map(|m| m.1),
        };
        match metrics {
            Some((mse, mae)) => info!(
                "Epoch {}/{} - loss: {:.4} - val_loss: {:.4} - val_mae: {:.4}",
                report.epoch, self.epochs, report.train_loss, mse, mae
            ),
            None => info!("Epoch {}/{} - loss: {:.4}", report.epoch, self.epochs, report.train_loss),
        }
        Ok(report)
    }

    /// Drive the remaining epochs and return the fitted head with its history.
    pub fn run(mut self) -> Result<TrainOutcome> {
        let mut history = Vec::with_capacity(self.epochs.saturating_sub(self.epoch));
        while !self.is_done() {
            history.push(self.step_epoch()?);
        }
        let head = self.backend.head()?;
        Ok(TrainOutcome { head, history, split: self.split })
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub head: LinearHead,
    pub history: Vec<EpochReport>,
    pub split: Split,
}

/// Fit a head on `(xs, ys)` with the backend named in `settings`.
pub fn train_head(xs: &[Vec<f32>], ys: &[f64], settings: &TrainingSettings, device: &Device) -> Result<TrainOutcome> {
    let dim = xs.first().map_or(0, Vec::len);
    if dim == 0 {
        return Err(Error::EmptyPartition("train"));
    }
    let backend = build_backend(dim, settings, device)?;
    HeadTrainer::new(backend, xs, ys, settings)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GradientDescent;
    use ratehead_core::config::BackendKind;

    fn data(n: usize) -> (Vec<Vec<f32>>, Vec<f64>) {
        let xs: Vec<Vec<f32>> = (0..n).map(|i| vec![(i % 4) as f32 / 4.0, 1.0 - (i % 3) as f32 / 3.0]).collect();
        let ys = xs.iter().map(|x| 1.5 * f64::from(x[0]) + 0.5 * f64::from(x[1]) + 2.0).collect();
        (xs, ys)
    }

    fn settings(epochs: usize) -> TrainingSettings {
        TrainingSettings { epochs, batch_size: 4, learning_rate: 0.1, backend: BackendKind::Gd, ..TrainingSettings::default() }
    }

    #[test]
    fn state_machine_counts_epochs() {
        let (xs, ys) = data(20);
        let mut t = HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &settings(3)).unwrap();
        assert_eq!(t.epoch(), 0);
        let r = t.step_epoch().unwrap();
        assert_eq!(r.epoch, 1);
        assert_eq!(t.epoch(), 1);
        assert!(!t.is_done());
        let out = t.run().unwrap();
        assert_eq!(out.history.len(), 2);
        assert_eq!(out.history.last().unwrap().epoch, 3);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let (xs, ys) = data(30);
        let a = HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &settings(5)).unwrap().run().unwrap();
        let b = HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &settings(5)).unwrap().run().unwrap();
        assert_eq!(a.split, b.split);
        assert_eq!(a.head, b.head);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn epoch_report_scores_the_validation_rows() {
        let (xs, ys) = data(24);
        let out = HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &settings(4)).unwrap().run().unwrap();
        let (mse, mae) = out.head.mse_mae(out.split.validation.iter().map(|&i| (xs[i].as_slice(), ys[i]))).unwrap();
        let last = out.history.last().unwrap();
        assert_eq!(last.val_mse, Some(mse));
        assert_eq!(last.val_mae, Some(mae));
    }

    #[test]
    fn validation_error_drops_below_zero_baseline() {
        let (xs, ys) = data(40);
        let out = HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &settings(50)).unwrap().run().unwrap();
        let trainer_baseline = LinearHead::zeros(2);
        let val = out.split.validation.iter().map(|&i| (xs[i].as_slice(), ys[i]));
        let (baseline, _) = trainer_baseline.mse_mae(val).unwrap();
        let final_mse = out.history.last().unwrap().val_mse.unwrap();
        assert!(final_mse < baseline, "final={final_mse} baseline={baseline}");
    }

    #[test]
    fn empty_validation_reports_no_metrics() {
        let (xs, ys) = data(8);
        let s = TrainingSettings { val_frac: 0.0, ..settings(2) };
        let out = HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &s).unwrap().run().unwrap();
        assert!(out.split.validation.is_empty());
        assert!(out.history.iter().all(|r| r.val_mse.is_none() && r.val_mae.is_none()));
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        let (xs, mut ys) = data(8);
        ys.pop();
        assert!(matches!(
            HeadTrainer::new(GradientDescent::new(2, 0.1), &xs, &ys, &settings(1)),
            Err(Error::Training(_))
        ));
        let (xs, ys) = data(8);
        assert!(matches!(
            HeadTrainer::new(GradientDescent::new(3, 0.1), &xs, &ys, &settings(1)),
            Err(Error::DimensionMismatch { row: 0, expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn train_head_with_adam_backend() {
        let (xs, ys) = data(20);
        let s = TrainingSettings { backend: BackendKind::Adam, learning_rate: 0.05, ..settings(10) };
        let out = train_head(&xs, &ys, &s, &Device::Cpu).unwrap();
        assert_eq!(out.head.dim(), 2);
        assert_eq!(out.history.len(), 10);
    }
}
