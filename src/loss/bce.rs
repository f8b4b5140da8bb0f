use crate::loss::{check_shapes, Loss};
use crate::math::tensor::Tensor;

/// Masked binary cross-entropy; pair with a sigmoid-activated prediction.
pub struct BceLoss;

const EPS: f64 = 1e-12;

impl Loss for BceLoss {
    /// Masked sum: Σ -m·(y·log(p+ε) + (1-y)·log(1-p+ε))
    fn loss(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> f64 {
        check_shapes(predicted, expected, mask);
        predicted
            .data
            .iter()
            .zip(expected.data.iter())
            .zip(mask.data.iter())
            .map(|((p, y), m)| -m * (y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln()))
            .sum()
    }

    /// Per-element gradient: m·(p - y) / ((p + ε)·(1 - p + ε))
    fn derivative(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> Tensor {
        check_shapes(predicted, expected, mask);
        let data = predicted
            .data
            .iter()
            .zip(expected.data.iter())
            .zip(mask.data.iter())
            .map(|((p, y), m)| m * (p - y) / ((p + EPS) * (1.0 - p + EPS)))
            .collect();
        Tensor::from_data(predicted.shape.clone(), data)
    }
}
