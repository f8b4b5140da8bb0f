pub mod updater;

pub use updater::update_model;

use std::io;
use std::path::Path;

use crate::math::tensor::Tensor;

/// A multi-output prediction model.
///
/// The driver never looks inside the model; it only drives this seam. The
/// model consumes the sample's input tensors in schema order and returns one
/// prediction per declared label, in label order.
pub trait Model {
    /// Forward pass. Implementations may cache activations for `backward`.
    fn forward(&mut self, inputs: &[Tensor]) -> Vec<Tensor>;

    /// Resets all accumulated parameter gradients to zero.
    fn zero_grad(&mut self);

    /// Accumulates parameter gradients given the gradient of the scalar
    /// objective with respect to each prediction, in label order.
    fn backward(&mut self, output_grads: &[Tensor]);

    /// Visits every (parameter, gradient) pair. Optimizers apply their
    /// update rule through this hook.
    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Tensor, &Tensor));

    /// Writes a complete parameter snapshot to `path`.
    fn save_snapshot(&self, path: &Path) -> io::Result<()>;
}

/// An update rule over a model's parameters and their gradients.
pub trait Optimizer {
    /// Applies one update step using gradients already accumulated by
    /// [`Model::backward`].
    fn step(&mut self, model: &mut dyn Model);

    fn learning_rate(&self) -> f64;
}
