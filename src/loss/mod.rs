pub mod bce;
pub mod evaluator;
pub mod loss_type;
pub mod mse;

pub use bce::BceLoss;
pub use evaluator::{evaluate, EvalError};
pub use loss_type::LossType;
pub use mse::MseLoss;

use crate::math::tensor::Tensor;

/// A per-task loss with a uniform masked signature.
///
/// The mask is always present; for a task without one the caller passes an
/// all-ones mask of the label's shape, so dispatch never depends on call
/// arity. Implementations return the masked **sum** of elementwise losses;
/// the monitor later divides by the accumulated mask counts to report a
/// per-element average.
pub trait Loss {
    fn loss(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> f64;

    /// Gradient of [`Loss::loss`] with respect to `predicted`.
    fn derivative(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> Tensor;
}

/// Panics unless all three tensors share one shape.
pub(crate) fn check_shapes(predicted: &Tensor, expected: &Tensor, mask: &Tensor) {
    assert_eq!(
        predicted.shape, expected.shape,
        "prediction and label shapes differ"
    );
    assert_eq!(expected.shape, mask.shape, "label and mask shapes differ");
}
