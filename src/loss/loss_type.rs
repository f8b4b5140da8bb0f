use serde::{Deserialize, Serialize};

use crate::loss::{BceLoss, Loss, MseLoss};
use crate::math::tensor::Tensor;

/// Selects which loss function the training run uses.
///
/// - `Mse`                — masked squared error; pair with an identity or
///   sigmoid output.
/// - `BinaryCrossEntropy` — masked BCE; pair with a sigmoid output.
///
/// The enum itself implements [`Loss`], so a serialized options record can
/// name the loss and be handed straight to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Mse,
    BinaryCrossEntropy,
}

impl Loss for LossType {
    fn loss(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> f64 {
        match self {
            LossType::Mse => MseLoss.loss(predicted, expected, mask),
            LossType::BinaryCrossEntropy => BceLoss.loss(predicted, expected, mask),
        }
    }

    fn derivative(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> Tensor {
        match self {
            LossType::Mse => MseLoss.derivative(predicted, expected, mask),
            LossType::BinaryCrossEntropy => BceLoss.derivative(predicted, expected, mask),
        }
    }
}
