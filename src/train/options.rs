use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::train::flush_stats::FlushStats;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("option \"{0}\" must be nonzero")]
    ZeroOption(&'static str),
    #[error("loss weight for task \"{task}\" must be finite and non-negative (got {value})")]
    BadWeight { task: String, value: f64 },
}

/// Configuration for a `train_loop` run.
///
/// Every cadence field is required and validated before the loop touches
/// anything; a zero interval would turn a cadence check into a division by
/// zero, so validation rejects it up front.
///
/// # Fields
/// - `max_iter`           — total iteration count (exclusive upper bound)
/// - `test_intv`          — validation cadence, in iterations
/// - `test_iter`          — forward-only iterations per validation run
/// - `avgs_intv`          — statistics flush/report cadence
/// - `chkpt_intv`         — checkpoint cadence
/// - `expt_dir`           — base experiment directory for all artifacts
/// - `max_fetch_attempts` — retry budget for the nonempty-mask fetch
/// - `loss_weights`       — per-task objective weights; tasks absent from
///   the map weigh 1.0, so an empty map is the unweighted sum
/// - `progress_tx`        — optional channel sender; one `FlushStats` is
///   sent per flush. Sends are best-effort: a dropped receiver never
///   terminates the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOptions {
    pub max_iter: u64,
    pub test_intv: u64,
    pub test_iter: u64,
    pub avgs_intv: u64,
    pub chkpt_intv: u64,
    pub expt_dir: PathBuf,
    pub max_fetch_attempts: usize,
    #[serde(default)]
    pub loss_weights: BTreeMap<String, f64>,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<FlushStats>>,
}

impl TrainOptions {
    /// Creates options with the six required cadence/output settings, a
    /// default fetch budget of 100 attempts, unweighted losses and no
    /// progress channel. Override fields directly where needed.
    pub fn new(
        max_iter: u64,
        test_intv: u64,
        test_iter: u64,
        avgs_intv: u64,
        chkpt_intv: u64,
        expt_dir: impl Into<PathBuf>,
    ) -> TrainOptions {
        TrainOptions {
            max_iter,
            test_intv,
            test_iter,
            avgs_intv,
            chkpt_intv,
            expt_dir: expt_dir.into(),
            max_fetch_attempts: 100,
            loss_weights: BTreeMap::new(),
            progress_tx: None,
        }
    }

    /// Fail-fast validation, run before the loop starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iter == 0 {
            return Err(ConfigError::ZeroOption("max_iter"));
        }
        if self.test_intv == 0 {
            return Err(ConfigError::ZeroOption("test_intv"));
        }
        if self.test_iter == 0 {
            return Err(ConfigError::ZeroOption("test_iter"));
        }
        if self.avgs_intv == 0 {
            return Err(ConfigError::ZeroOption("avgs_intv"));
        }
        if self.chkpt_intv == 0 {
            return Err(ConfigError::ZeroOption("chkpt_intv"));
        }
        if self.max_fetch_attempts == 0 {
            return Err(ConfigError::ZeroOption("max_fetch_attempts"));
        }
        for (task, &value) in &self.loss_weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::BadWeight {
                    task: task.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Objective weight for `task`; tasks without an entry weigh 1.0.
    pub fn weight_for(&self, task: &str) -> f64 {
        self.loss_weights.get(task).copied().unwrap_or(1.0)
    }

    /// Serializes the options to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    /// Deserializes options from a JSON file previously written by
    /// `save_json`. The progress channel always comes back `None`.
    pub fn load_json(path: &str) -> io::Result<TrainOptions> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TrainOptions {
        TrainOptions::new(100, 10, 5, 10, 20, "/tmp/expt")
    }

    #[test]
    fn valid_options_pass() {
        options().validate().unwrap();
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut opts = options();
        opts.avgs_intv = 0;
        assert_eq!(
            opts.validate().unwrap_err(),
            ConfigError::ZeroOption("avgs_intv")
        );

        let mut opts = options();
        opts.max_fetch_attempts = 0;
        assert_eq!(
            opts.validate().unwrap_err(),
            ConfigError::ZeroOption("max_fetch_attempts")
        );
    }

    #[test]
    fn bad_weights_are_rejected() {
        let mut opts = options();
        opts.loss_weights.insert("depth".to_string(), -1.0);
        assert!(matches!(
            opts.validate().unwrap_err(),
            ConfigError::BadWeight { .. }
        ));
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let mut opts = options();
        opts.loss_weights.insert("depth".to_string(), 0.25);
        assert_eq!(opts.weight_for("depth"), 0.25);
        assert_eq!(opts.weight_for("score"), 1.0);
    }

    #[test]
    fn json_roundtrip_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        let mut opts = options();
        opts.loss_weights.insert("depth".to_string(), 0.5);
        opts.save_json(path.to_str().unwrap()).unwrap();

        let restored = TrainOptions::load_json(path.to_str().unwrap()).unwrap();
        assert_eq!(restored.max_iter, opts.max_iter);
        assert_eq!(restored.expt_dir, opts.expt_dir);
        assert_eq!(restored.weight_for("depth"), 0.5);
        assert!(restored.progress_tx.is_none());
    }
}
