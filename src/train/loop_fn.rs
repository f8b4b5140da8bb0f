use std::collections::BTreeMap;
use std::time::Instant;

use log::info;
use thiserror::Error;

use crate::loss::evaluator::{evaluate, EvalError};
use crate::loss::Loss;
use crate::model::updater::update_model;
use crate::model::{Model, Optimizer};
use crate::monitor::{LearningMonitor, Phase, ITER_TIME};
use crate::sample::fetch::{FetchError, MaskedSampleFetcher, Sampler};
use crate::sample::spec::{SampleSpec, SpecError};
use crate::train::checkpoint::CheckpointManager;
use crate::train::flush_stats::FlushStats;
use crate::train::options::{ConfigError, TrainOptions};
use crate::train::validate::run_validation;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("invalid training options: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("I/O error during training: {0}")]
    Io(#[from] std::io::Error),
}

/// Generalized multi-task training loop.
///
/// Iterates from `last_iter` (exclusive-bound resume point) to
/// `options.max_iter`. Each iteration fetches a mask-nonempty sample,
/// splits it by the schema's roles, runs the forward pass, evaluates
/// per-task losses and counts, applies one model update and logs into the
/// monitor's train phase. On their cadences it runs validation, flushes and
/// reports train averages, and persists checkpoints.
///
/// Cadence guards: the averages flush and the checkpoint skip
/// `i == last_iter`, while validation has no such guard and also fires at
/// the resume iteration. Validation wall time is
/// excluded from the train-phase iteration clock. Note that a checkpoint
/// cadence that is not a multiple of the averages cadence persists history
/// mid-accumulation; the unflushed window is not part of the artifact.
///
/// The caller hands in the monitor (fresh, or reloaded from a stats
/// artifact when resuming) and receives it back when the loop completes.
/// Reaching `max_iter` is the only way the loop ends without an error.
#[allow(clippy::too_many_arguments)]
pub fn train_loop(
    model: &mut dyn Model,
    loss_fn: &dyn Loss,
    optimizer: &mut dyn Optimizer,
    sampler: &mut dyn Sampler,
    mut val_sampler: Option<&mut dyn Sampler>,
    spec: &SampleSpec,
    last_iter: u64,
    mut monitor: LearningMonitor,
    options: &TrainOptions,
) -> Result<LearningMonitor, TrainError> {
    options.validate()?;

    let fetcher = MaskedSampleFetcher::new(options.max_fetch_attempts);
    let checkpoints = CheckpointManager::new(&options.expt_dir)?;

    info!("======= BEGIN TRAINING LOOP ========");
    let mut start = Instant::now();

    for i in last_iter..options.max_iter {
        let sample = fetcher.fetch(sampler, spec.masks())?;
        let (inputs, labels, masks) = spec.split(&sample)?;

        let preds = model.forward(&inputs);

        let (losses, counts) = evaluate(&preds, &labels, &masks, loss_fn, spec)?;

        update_model(
            model,
            optimizer,
            loss_fn,
            &preds,
            &labels,
            &masks,
            spec,
            &options.loss_weights,
        );

        log_errors(&mut monitor, &losses, &counts, Phase::Train);
        log_elapsed_time(&mut monitor, start.elapsed().as_secs_f64(), Phase::Train);
        start = Instant::now();

        if let Some(ref mut val) = val_sampler {
            if i % options.test_intv == 0 {
                run_validation(
                    model,
                    &mut **val,
                    options.test_iter,
                    loss_fn,
                    spec,
                    &mut monitor,
                    i,
                    &fetcher,
                    options.progress_tx.as_ref(),
                )?;
                // Validation time is not charged to the training clock.
                start = Instant::now();
            }
        }

        if i % options.avgs_intv == 0 && i != last_iter {
            monitor.compute_avgs(i, Phase::Train);

            let avg_losses = last_values(&monitor, spec, Phase::Train);
            let avg_time = monitor
                .get_last_value(ITER_TIME, Phase::Train)
                .map(round5)
                .unwrap_or(0.0);
            info!("iter: {i}; avg losses = {avg_losses:?} (iter_time = {avg_time} s on avg)");

            if let Some(tx) = options.progress_tx.as_ref() {
                // Best-effort: a dropped receiver never stops training.
                let _ = tx.send(FlushStats {
                    iteration: i,
                    phase: Phase::Train,
                    avg_losses,
                    avg_iter_time: avg_time,
                });
            }
        }

        if i % options.chkpt_intv == 0 && i != last_iter {
            info!("SAVE CHECKPOINT: {i} iters.");
            checkpoints.save(model, &monitor, i)?;
        }
    }

    Ok(monitor)
}

/// Adds the losses and their normalization counts to the running averages
/// within the monitor.
pub(crate) fn log_errors(
    monitor: &mut LearningMonitor,
    losses: &BTreeMap<String, f64>,
    counts: &BTreeMap<String, f64>,
    phase: Phase,
) {
    assert!(
        losses.keys().eq(counts.keys()),
        "Mismatched losses and counts"
    );
    monitor.add_to_num(losses, phase);
    monitor.add_to_denom(counts, phase);
}

/// Stores one iteration's wall time within the monitor.
pub(crate) fn log_elapsed_time(monitor: &mut LearningMonitor, elapsed: f64, phase: Phase) {
    let entry = BTreeMap::from([(ITER_TIME.to_string(), elapsed)]);
    monitor.add_to_num(&entry, phase);
    let unit = BTreeMap::from([(ITER_TIME.to_string(), 1.0)]);
    monitor.add_to_denom(&unit, phase);
}

/// Most recent flushed value per label, rounded for reporting.
pub(crate) fn last_values(
    monitor: &LearningMonitor,
    spec: &SampleSpec,
    phase: Phase,
) -> BTreeMap<String, f64> {
    spec.labels()
        .iter()
        .filter_map(|name| {
            monitor
                .get_last_value(name, phase)
                .map(|value| (name.clone(), round5(value)))
        })
        .collect()
}

/// Rounds to 5 decimal places for console reports.
pub(crate) fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}
