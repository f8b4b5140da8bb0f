pub mod math;
pub mod sample;
pub mod loss;
pub mod model;
pub mod optim;
pub mod monitor;
pub mod train;

// Convenience re-exports
pub use math::tensor::Tensor;
pub use sample::fetch::{MaskedSampleFetcher, Sampler};
pub use sample::sample::Sample;
pub use sample::spec::SampleSpec;
pub use loss::{BceLoss, Loss, LossType, MseLoss};
pub use model::{Model, Optimizer};
pub use optim::sgd::Sgd;
pub use monitor::{LearningMonitor, Phase};
pub use train::{train_loop, CheckpointManager, FlushStats, TrainError, TrainOptions};
