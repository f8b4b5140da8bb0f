use std::sync::mpsc;
use std::time::Instant;

use log::info;

use crate::loss::evaluator::evaluate;
use crate::loss::Loss;
use crate::model::Model;
use crate::monitor::{LearningMonitor, Phase, ITER_TIME};
use crate::sample::fetch::{MaskedSampleFetcher, Sampler};
use crate::sample::spec::SampleSpec;
use crate::train::flush_stats::FlushStats;
use crate::train::loop_fn::{last_values, log_elapsed_time, log_errors, round5, TrainError};

/// Runs `num_iters` forward-only passes against a held-out source.
///
/// No gradients are cleared or computed and no optimizer step is applied;
/// losses, counts and per-pass wall time log into the monitor's test phase,
/// which is flushed against `iteration` once the passes complete. Train
/// accumulators and the training clock are never touched.
#[allow(clippy::too_many_arguments)]
pub fn run_validation(
    model: &mut dyn Model,
    sampler: &mut dyn Sampler,
    num_iters: u64,
    loss_fn: &dyn Loss,
    spec: &SampleSpec,
    monitor: &mut LearningMonitor,
    iteration: u64,
    fetcher: &MaskedSampleFetcher,
    progress_tx: Option<&mpsc::Sender<FlushStats>>,
) -> Result<(), TrainError> {
    let mut start = Instant::now();

    for _ in 0..num_iters {
        let sample = fetcher.fetch(sampler, spec.masks())?;
        let (inputs, labels, masks) = spec.split(&sample)?;

        let preds = model.forward(&inputs);

        let (losses, counts) = evaluate(&preds, &labels, &masks, loss_fn, spec)?;

        log_errors(monitor, &losses, &counts, Phase::Test);
        log_elapsed_time(monitor, start.elapsed().as_secs_f64(), Phase::Test);
        start = Instant::now();
    }

    monitor.compute_avgs(iteration, Phase::Test);

    let avg_losses = last_values(monitor, spec, Phase::Test);
    let avg_time = monitor
        .get_last_value(ITER_TIME, Phase::Test)
        .map(round5)
        .unwrap_or(0.0);
    info!("TEST: {iteration} avg losses = {avg_losses:?} (elapsed = {avg_time} s avg)");

    if let Some(tx) = progress_tx {
        let _ = tx.send(FlushStats {
            iteration,
            phase: Phase::Test,
            avg_losses,
            avg_iter_time: avg_time,
        });
    }

    Ok(())
}
