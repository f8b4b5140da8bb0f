use crate::loss::{check_shapes, Loss};
use crate::math::tensor::Tensor;

/// Masked mean-squared error.
pub struct MseLoss;

impl Loss for MseLoss {
    /// Masked sum of squared errors: Σ m·(p - y)²
    fn loss(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> f64 {
        check_shapes(predicted, expected, mask);
        predicted
            .data
            .iter()
            .zip(expected.data.iter())
            .zip(mask.data.iter())
            .map(|((p, y), m)| m * (p - y).powi(2))
            .sum()
    }

    /// Per-element gradient: m·(p - y)
    fn derivative(&self, predicted: &Tensor, expected: &Tensor, mask: &Tensor) -> Tensor {
        check_shapes(predicted, expected, mask);
        let data = predicted
            .data
            .iter()
            .zip(expected.data.iter())
            .zip(mask.data.iter())
            .map(|((p, y), m)| m * (p - y))
            .collect();
        Tensor::from_data(predicted.shape.clone(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_elements_are_excluded() {
        let pred = Tensor::from_vec(vec![1.0, 2.0, 5.0]);
        let label = Tensor::from_vec(vec![1.0, 0.0, 1.0]);
        let mask = Tensor::from_vec(vec![1.0, 1.0, 0.0]);
        // Third element is masked out; only (2 - 0)² contributes.
        assert_eq!(MseLoss.loss(&pred, &label, &mask), 4.0);

        let grad = MseLoss.derivative(&pred, &label, &mask);
        assert_eq!(grad.data, vec![0.0, 2.0, 0.0]);
    }

    #[test]
    fn all_ones_mask_recovers_plain_sse() {
        let pred = Tensor::from_vec(vec![1.0, 3.0]);
        let label = Tensor::from_vec(vec![0.0, 1.0]);
        let mask = label.ones_like();
        assert_eq!(MseLoss.loss(&pred, &label, &mask), 5.0);
    }
}
