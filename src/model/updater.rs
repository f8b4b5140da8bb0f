use std::collections::BTreeMap;

use crate::loss::Loss;
use crate::math::tensor::Tensor;
use crate::model::{Model, Optimizer};
use crate::sample::spec::SampleSpec;

/// Runs the backward pass and updates model parameters.
///
/// Clears previously accumulated gradients, forms the gradient of the
/// scalar objective Σ w_k·loss_k by scaling each task's loss derivative
/// with its configured weight (tasks absent from `weights` count at 1.0),
/// backpropagates through the model and applies one optimizer step.
///
/// Training phase only; validation never calls this.
pub fn update_model(
    model: &mut dyn Model,
    optimizer: &mut dyn Optimizer,
    loss_fn: &dyn Loss,
    preds: &[Tensor],
    labels: &[Tensor],
    masks: &[Tensor],
    spec: &SampleSpec,
    weights: &BTreeMap<String, f64>,
) {
    assert_eq!(
        preds.len(),
        spec.labels().len(),
        "Mismatched preds and labels"
    );

    model.zero_grad();

    let output_grads: Vec<Tensor> = spec
        .labels()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let ones;
            let mask = match spec.mask_index(name) {
                Some(m) => &masks[m],
                None => {
                    ones = labels[i].ones_like();
                    &ones
                }
            };
            let grad = loss_fn.derivative(&preds[i], &labels[i], mask);
            match weights.get(name) {
                Some(&w) => grad.map(|g| w * g),
                None => grad,
            }
        })
        .collect();

    model.backward(&output_grads);
    optimizer.step(model);
}
