use std::collections::BTreeMap;

use thiserror::Error;

use crate::loss::Loss;
use crate::math::tensor::Tensor;
use crate::sample::spec::SampleSpec;

/// Structural mismatch between the model's outputs and the declared schema.
/// Indicates a wiring defect (wrong model paired with the spec), not a data
/// problem; the run aborts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EvalError {
    #[error("model produced {got} predictions for {expected} declared labels")]
    PredictionCount { expected: usize, got: usize },
    #[error("sample carried {got} labels for {expected} declared")]
    LabelCount { expected: usize, got: usize },
    #[error("sample carried {got} masks for {expected} declared")]
    MaskCount { expected: usize, got: usize },
}

/// Evaluates per-task losses and normalization counts.
///
/// Predictions, labels and masks are positional in schema order. For a
/// masked task the count is the mask's element sum; for an unmasked task an
/// all-ones mask stands in and the count is the label's element count. The
/// count is the denominator the monitor divides by when averaging, never a
/// loss weight.
///
/// The returned maps share an identical key set: one entry per declared
/// label.
pub fn evaluate(
    preds: &[Tensor],
    labels: &[Tensor],
    masks: &[Tensor],
    loss_fn: &dyn Loss,
    spec: &SampleSpec,
) -> Result<(BTreeMap<String, f64>, BTreeMap<String, f64>), EvalError> {
    let declared = spec.labels().len();
    if labels.len() != declared {
        return Err(EvalError::LabelCount {
            expected: declared,
            got: labels.len(),
        });
    }
    if preds.len() != declared {
        return Err(EvalError::PredictionCount {
            expected: declared,
            got: preds.len(),
        });
    }
    if masks.len() != spec.masks().len() {
        return Err(EvalError::MaskCount {
            expected: spec.masks().len(),
            got: masks.len(),
        });
    }

    let mut losses = BTreeMap::new();
    let mut counts = BTreeMap::new();

    for (i, name) in spec.labels().iter().enumerate() {
        let pred = &preds[i];
        let label = &labels[i];

        let (loss, count) = match spec.mask_index(name) {
            Some(m) => {
                let mask = &masks[m];
                (loss_fn.loss(pred, label, mask), mask.sum())
            }
            None => {
                let ones = label.ones_like();
                (loss_fn.loss(pred, label, &ones), label.len() as f64)
            }
        };
        losses.insert(name.clone(), loss);
        counts.insert(name.clone(), count);
    }

    Ok((losses, counts))
}
