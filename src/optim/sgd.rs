use crate::model::{Model, Optimizer};

/// Plain stochastic gradient descent.
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Applies one descent step to every parameter the model exposes.
    fn step(&mut self, model: &mut dyn Model) {
        let lr = self.learning_rate;
        model.visit_params(&mut |param, grad| {
            for (p, g) in param.data.iter_mut().zip(grad.data.iter()) {
                *p -= lr * g;
            }
        });
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
