use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::monitor::phase::Phase;

/// Metric name under which per-iteration wall time is accumulated.
pub const ITER_TIME: &str = "iter_time";

/// Running numerator/denominator for one metric within one phase.
///
/// Created on first contribution, additively mutated, and reset to exactly
/// zero when the phase is flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    pub num: f64,
    pub denom: f64,
}

/// One flushed average: the iteration it was computed at and its value.
/// History entries are immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub iteration: u64,
    pub value: f64,
}

/// Accumulators plus flushed history for a single phase.
///
/// Accumulators are deliberately not serialized: a persisted stats artifact
/// carries flushed history only, and a monitor reloaded from disk starts
/// with empty accumulation windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PhaseState {
    #[serde(skip)]
    accums: BTreeMap<String, Accumulator>,
    history: BTreeMap<String, Vec<HistoryPoint>>,
}

impl PhaseState {
    fn add_to_num(&mut self, values: &BTreeMap<String, f64>) {
        for (name, value) in values {
            self.accums.entry(name.clone()).or_default().num += value;
        }
    }

    fn add_to_denom(&mut self, counts: &BTreeMap<String, f64>) {
        for (name, count) in counts {
            self.accums.entry(name.clone()).or_default().denom += count;
        }
    }

    fn compute_avgs(&mut self, iteration: u64) {
        for (name, accum) in self.accums.iter_mut() {
            // A metric that received no counts this window is skipped: no
            // division by zero, no history entry for this flush.
            if accum.denom == 0.0 {
                continue;
            }
            let points = self.history.entry(name.clone()).or_default();
            if let Some(last) = points.last() {
                assert!(
                    last.iteration < iteration,
                    "history for \"{}\" must advance monotonically (last {}, got {})",
                    name,
                    last.iteration,
                    iteration
                );
            }
            points.push(HistoryPoint {
                iteration,
                value: accum.num / accum.denom,
            });
            *accum = Accumulator::default();
        }
    }
}

/// Tracks running averages of per-task losses and timing across the train
/// and test phases of a run.
///
/// Per (phase, metric) the state machine is `accumulating -> flush ->
/// accumulating`: contributions add into a numerator/denominator pair,
/// [`LearningMonitor::compute_avgs`] converts the pair into one history
/// point and resets it to zero. History is append-only with monotonically
/// increasing iteration indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningMonitor {
    train: PhaseState,
    test: PhaseState,
}

/// Serialized form of a stats artifact: the full two-phase history tagged
/// with the iteration it was saved at.
#[derive(Serialize)]
struct StatsSnapshotRef<'a> {
    iteration: u64,
    train: &'a PhaseState,
    test: &'a PhaseState,
}

#[derive(Deserialize)]
struct StatsSnapshot {
    iteration: u64,
    train: PhaseState,
    test: PhaseState,
}

impl LearningMonitor {
    pub fn new() -> LearningMonitor {
        LearningMonitor::default()
    }

    fn phase(&self, phase: Phase) -> &PhaseState {
        match phase {
            Phase::Train => &self.train,
            Phase::Test => &self.test,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut PhaseState {
        match phase {
            Phase::Train => &mut self.train,
            Phase::Test => &mut self.test,
        }
    }

    /// Adds each value to its metric's running numerator in `phase`,
    /// creating accumulators on first use.
    pub fn add_to_num(&mut self, values: &BTreeMap<String, f64>, phase: Phase) {
        self.phase_mut(phase).add_to_num(values);
    }

    /// Adds each count to its metric's running denominator in `phase`.
    pub fn add_to_denom(&mut self, counts: &BTreeMap<String, f64>, phase: Phase) {
        self.phase_mut(phase).add_to_denom(counts);
    }

    /// Flushes `phase`: every metric with a nonzero denominator records
    /// `numerator / denominator` against `iteration` and resets to zero.
    pub fn compute_avgs(&mut self, iteration: u64, phase: Phase) {
        self.phase_mut(phase).compute_avgs(iteration);
    }

    /// The most recently flushed value for (metric, phase). Never reflects
    /// in-progress, unflushed accumulation.
    pub fn get_last_value(&self, metric: &str, phase: Phase) -> Option<f64> {
        self.phase(phase)
            .history
            .get(metric)
            .and_then(|points| points.last())
            .map(|point| point.value)
    }

    /// Full flushed history for (metric, phase).
    pub fn history(&self, metric: &str, phase: Phase) -> Option<&[HistoryPoint]> {
        self.phase(phase)
            .history
            .get(metric)
            .map(Vec::as_slice)
    }

    /// Current accumulator for (metric, phase), if one has been created.
    pub fn accumulator(&self, metric: &str, phase: Phase) -> Option<Accumulator> {
        self.phase(phase).accums.get(metric).copied()
    }

    /// Serializes the complete two-phase history to a pretty-printed JSON
    /// file, tagged with `iteration`.
    pub fn save(&self, path: &Path, iteration: u64) -> io::Result<()> {
        let snapshot = StatsSnapshotRef {
            iteration,
            train: &self.train,
            test: &self.test,
        };
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &snapshot)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    /// Reconstructs a monitor from a stats artifact written by
    /// [`LearningMonitor::save`]: full history, empty accumulation windows.
    /// Returns the iteration the artifact was tagged with.
    pub fn load(path: &Path) -> io::Result<(u64, LearningMonitor)> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let snapshot: StatsSnapshot = serde_json::from_reader(reader)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok((
            snapshot.iteration,
            LearningMonitor {
                train: snapshot.train,
                test: snapshot.test,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributions(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn flush_records_average_and_zeroes_accumulators() {
        let mut monitor = LearningMonitor::new();
        monitor.add_to_num(&contributions(&[("depth", 6.0)]), Phase::Train);
        monitor.add_to_denom(&contributions(&[("depth", 3.0)]), Phase::Train);
        monitor.add_to_num(&contributions(&[("depth", 2.0)]), Phase::Train);
        monitor.add_to_denom(&contributions(&[("depth", 1.0)]), Phase::Train);

        monitor.compute_avgs(10, Phase::Train);

        assert_eq!(monitor.get_last_value("depth", Phase::Train), Some(2.0));
        let accum = monitor.accumulator("depth", Phase::Train).unwrap();
        assert_eq!(accum.num, 0.0);
        assert_eq!(accum.denom, 0.0);
    }

    #[test]
    fn last_value_is_stable_until_next_flush() {
        let mut monitor = LearningMonitor::new();
        monitor.add_to_num(&contributions(&[("depth", 4.0)]), Phase::Train);
        monitor.add_to_denom(&contributions(&[("depth", 2.0)]), Phase::Train);
        monitor.compute_avgs(5, Phase::Train);

        // New unflushed contributions must not leak into get_last_value.
        monitor.add_to_num(&contributions(&[("depth", 100.0)]), Phase::Train);
        monitor.add_to_denom(&contributions(&[("depth", 1.0)]), Phase::Train);
        assert_eq!(monitor.get_last_value("depth", Phase::Train), Some(2.0));

        monitor.compute_avgs(10, Phase::Train);
        assert_eq!(monitor.get_last_value("depth", Phase::Train), Some(100.0));
    }

    #[test]
    fn zero_denominator_metric_is_skipped() {
        let mut monitor = LearningMonitor::new();
        monitor.add_to_num(&contributions(&[("depth", 4.0)]), Phase::Train);
        monitor.compute_avgs(5, Phase::Train);

        assert_eq!(monitor.get_last_value("depth", Phase::Train), None);
        // The numerator survives for the next window.
        assert_eq!(monitor.accumulator("depth", Phase::Train).unwrap().num, 4.0);
    }

    #[test]
    fn phases_accumulate_independently() {
        let mut monitor = LearningMonitor::new();
        monitor.add_to_num(&contributions(&[("depth", 1.0)]), Phase::Train);
        monitor.add_to_denom(&contributions(&[("depth", 1.0)]), Phase::Train);
        monitor.add_to_num(&contributions(&[("depth", 3.0)]), Phase::Test);
        monitor.add_to_denom(&contributions(&[("depth", 1.0)]), Phase::Test);

        monitor.compute_avgs(7, Phase::Test);

        assert_eq!(monitor.get_last_value("depth", Phase::Test), Some(3.0));
        assert_eq!(monitor.get_last_value("depth", Phase::Train), None);
        // Train accumulation is untouched by the test flush.
        assert_eq!(
            monitor.accumulator("depth", Phase::Train).unwrap().num,
            1.0
        );
    }

    #[test]
    fn history_is_append_only_and_monotone() {
        let mut monitor = LearningMonitor::new();
        for (iter, value) in [(5u64, 1.0), (10, 2.0), (15, 3.0)] {
            monitor.add_to_num(&contributions(&[("depth", value)]), Phase::Train);
            monitor.add_to_denom(&contributions(&[("depth", 1.0)]), Phase::Train);
            monitor.compute_avgs(iter, Phase::Train);
        }
        let points = monitor.history("depth", Phase::Train).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points.windows(2).all(|w| w[0].iteration < w[1].iteration));
    }

    #[test]
    fn save_then_load_reconstructs_history() {
        let mut monitor = LearningMonitor::new();
        monitor.add_to_num(&contributions(&[("depth", 6.0), ("score", 1.0)]), Phase::Train);
        monitor.add_to_denom(&contributions(&[("depth", 3.0), ("score", 2.0)]), Phase::Train);
        monitor.compute_avgs(5, Phase::Train);
        monitor.add_to_num(&contributions(&[("depth", 8.0)]), Phase::Test);
        monitor.add_to_denom(&contributions(&[("depth", 4.0)]), Phase::Test);
        monitor.compute_avgs(5, Phase::Test);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats_5.json");
        monitor.save(&path, 5).unwrap();

        let (iteration, restored) = LearningMonitor::load(&path).unwrap();
        assert_eq!(iteration, 5);
        assert_eq!(
            restored.history("depth", Phase::Train),
            monitor.history("depth", Phase::Train)
        );
        assert_eq!(
            restored.history("score", Phase::Train),
            monitor.history("score", Phase::Train)
        );
        assert_eq!(
            restored.history("depth", Phase::Test),
            monitor.history("depth", Phase::Test)
        );
        // Accumulation windows come back empty.
        assert_eq!(restored.accumulator("depth", Phase::Train), None);
    }
}
