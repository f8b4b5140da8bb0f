pub mod checkpoint;
pub mod flush_stats;
pub mod loop_fn;
pub mod options;
pub mod validate;

pub use checkpoint::CheckpointManager;
pub use flush_stats::FlushStats;
pub use loop_fn::{train_loop, TrainError};
pub use options::{ConfigError, TrainOptions};
pub use validate::run_validation;
