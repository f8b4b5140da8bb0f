use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::monitor::Phase;

/// Statistics emitted whenever the monitor flushes a phase.
///
/// When a progress channel is configured in `TrainOptions`, the loop sends
/// one `FlushStats` per train flush and per completed validation run.
/// Receivers drive dashboards or progress displays; the values match the
/// console report (averages rounded to 5 decimals).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushStats {
    /// Iteration the flush was computed at.
    pub iteration: u64,
    /// Which phase was flushed.
    pub phase: Phase,
    /// Flushed per-task average losses, keyed by label name.
    pub avg_losses: BTreeMap<String, f64>,
    /// Flushed average wall time per iteration, in seconds.
    pub avg_iter_time: f64,
}
