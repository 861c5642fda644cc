//! Seeded train/validation partition.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use ratehead_core::error::{Error, Result};

/// Row indices of each partition, ascending within a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Partition `0..n` with `ceil(val_frac * n)` rows held out for validation.
///
/// The same `(n, val_frac, seed)` always yields the same partition. An empty
/// validation side is allowed; an empty train side is an error.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn train_val_split(n: usize, val_frac: f64, seed: u64) -> Result<Split> {
    if !(0.0..1.0).contains(&val_frac) {
        return Err(Error::InvalidConfig(format!("val_frac must be in [0, 1), got {val_frac}")));
    }
    let n_val = ((val_frac * n as f64).ceil() as usize).min(n);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut validation = order[..n_val].to_vec();
    let mut train = order[n_val..].to_vec();
    if train.is_empty() {
        return Err(Error::EmptyPartition("train"));
    }
    validation.sort_unstable();
    train.sort_unstable();
    Ok(Split { train, validation })
}
