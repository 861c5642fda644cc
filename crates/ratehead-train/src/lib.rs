#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod backend;
pub mod device;
pub mod export;
pub mod split;
pub mod trainer;

pub use backend::{build_backend, CandleAdam, GradientDescent, OptimizerBackend};
pub use device::select_device;
pub use export::{export_head, load_head};
pub use split::{train_val_split, Split};
pub use trainer::{train_head, EpochReport, HeadTrainer, TrainOutcome};
