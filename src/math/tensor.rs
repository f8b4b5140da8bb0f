use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A dense n-dimensional array of `f64` values stored flat in row-major order.
///
/// Samples carry arbitrary-rank fields (volumes, vectors, scalars), so unlike
/// a fixed rows/cols matrix the shape is an explicit dimension list. The
/// element count is always the product of the dimensions; constructors
/// enforce this and the arithmetic helpers panic on shape disagreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Tensor {
            shape: shape.to_vec(),
            data: vec![1.0; shape.iter().product()],
        }
    }

    /// Uniform random values in [-1, 1).
    pub fn random(shape: &[usize]) -> Tensor {
        let mut rng = rand::thread_rng();
        let mut res = Tensor::zeros(shape);
        for x in res.data.iter_mut() {
            *x = rng.gen::<f64>() * 2.0 - 1.0;
        }
        res
    }

    pub fn from_data(shape: Vec<usize>, data: Vec<f64>) -> Tensor {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            panic!(
                "Tensor shape {:?} holds {} elements but {} were given",
                shape,
                expected,
                data.len()
            )
        }
        Tensor { shape, data }
    }

    /// One-dimensional tensor over `data`.
    pub fn from_vec(data: Vec<f64>) -> Tensor {
        Tensor {
            shape: vec![data.len()],
            data,
        }
    }

    /// Number of elements (product of dimensions).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// True if at least one element is nonzero. The fetcher uses this as the
    /// "mask carries signal" test.
    pub fn any_nonzero(&self) -> bool {
        self.data.iter().any(|&x| x != 0.0)
    }

    /// Returns a copy with a new leading dimension of size 1 (unit batch).
    pub fn unsqueeze0(&self) -> Tensor {
        let mut shape = Vec::with_capacity(self.shape.len() + 1);
        shape.push(1);
        shape.extend_from_slice(&self.shape);
        Tensor {
            shape,
            data: self.data.clone(),
        }
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    pub fn zeros_like(&self) -> Tensor {
        Tensor::zeros(&self.shape)
    }

    pub fn ones_like(&self) -> Tensor {
        Tensor::ones(&self.shape)
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor {
            shape: vec![0],
            data: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_data_checks_element_count() {
        let t = Tensor::from_data(vec![2, 3], vec![0.0; 6]);
        assert_eq!(t.len(), 6);
    }

    #[test]
    #[should_panic]
    fn from_data_panics_on_mismatch() {
        Tensor::from_data(vec![2, 3], vec![0.0; 5]);
    }

    #[test]
    fn unsqueeze0_prepends_unit_dim() {
        let t = Tensor::from_data(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let b = t.unsqueeze0();
        assert_eq!(b.shape, vec![1, 2, 2]);
        assert_eq!(b.data, t.data);
    }

    #[test]
    fn any_nonzero_detects_signal() {
        assert!(!Tensor::zeros(&[4]).any_nonzero());
        assert!(Tensor::from_vec(vec![0.0, 0.0, 0.5]).any_nonzero());
        assert!(!Tensor::from_vec(vec![]).any_nonzero());
    }
}
