pub mod monitor;
pub mod phase;

pub use monitor::{Accumulator, HistoryPoint, LearningMonitor, ITER_TIME};
pub use phase::Phase;
