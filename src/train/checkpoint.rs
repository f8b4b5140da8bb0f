use std::io;
use std::path::{Path, PathBuf};

use crate::model::Model;
use crate::monitor::LearningMonitor;

/// Persists iteration-tagged snapshots under a base experiment directory:
/// model parameters to `models/model_{i}.json` and statistics history to
/// `logs/stats_{i}.json`.
///
/// The two writes are independent; there is no cross-artifact transaction,
/// and a failed write propagates without rollback. The stats artifact alone
/// is sufficient to reconstruct monitor history up to the checkpointed
/// iteration.
pub struct CheckpointManager {
    models_dir: PathBuf,
    logs_dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the storage areas under `base_dir` (fail-fast I/O).
    pub fn new(base_dir: impl AsRef<Path>) -> io::Result<CheckpointManager> {
        let base_dir = base_dir.as_ref();
        let models_dir = base_dir.join("models");
        let logs_dir = base_dir.join("logs");
        std::fs::create_dir_all(&models_dir)?;
        std::fs::create_dir_all(&logs_dir)?;
        Ok(CheckpointManager {
            models_dir,
            logs_dir,
        })
    }

    pub fn model_path(&self, iteration: u64) -> PathBuf {
        self.models_dir.join(format!("model_{iteration}.json"))
    }

    pub fn stats_path(&self, iteration: u64) -> PathBuf {
        self.logs_dir.join(format!("stats_{iteration}.json"))
    }

    /// Writes the model checkpoint and matching statistics history.
    pub fn save(
        &self,
        model: &dyn Model,
        monitor: &LearningMonitor,
        iteration: u64,
    ) -> io::Result<()> {
        model.save_snapshot(&self.model_path(iteration))?;
        monitor.save(&self.stats_path(iteration), iteration)
    }

    /// Restores monitor history from the stats artifact tagged `iteration`.
    pub fn load_stats(&self, iteration: u64) -> io::Result<(u64, LearningMonitor)> {
        LearningMonitor::load(&self.stats_path(iteration))
    }
}
