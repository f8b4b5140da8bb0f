use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use anyhow::Context;
use rand::prelude::*;
use serde::Serialize;

use multitrain::{
    train_loop, LearningMonitor, LossType, Model, Phase, Sample, SampleSpec, Sampler, Sgd, Tensor,
    TrainOptions,
};

/// Two linear heads over a shared 4-element input: a masked 2-element
/// "depth" regression and an unmasked scalar "score" regression.
#[derive(Serialize)]
struct TwoHeadLinear {
    depth_w: Tensor, // [2, 4]
    depth_b: Tensor, // [2]
    score_w: Tensor, // [1, 4]
    score_b: Tensor, // [1]
    #[serde(skip)]
    grads: Vec<Tensor>,
    #[serde(skip)]
    last_input: Tensor,
}

impl TwoHeadLinear {
    fn new() -> TwoHeadLinear {
        let depth_w = Tensor::random(&[2, 4]);
        let depth_b = Tensor::random(&[2]);
        let score_w = Tensor::random(&[1, 4]);
        let score_b = Tensor::random(&[1]);
        let grads = vec![
            depth_w.zeros_like(),
            depth_b.zeros_like(),
            score_w.zeros_like(),
            score_b.zeros_like(),
        ];
        TwoHeadLinear {
            depth_w,
            depth_b,
            score_w,
            score_b,
            grads,
            last_input: Tensor::default(),
        }
    }

    fn head(w: &Tensor, b: &Tensor, x: &[f64]) -> Vec<f64> {
        let rows = w.shape[0];
        let cols = w.shape[1];
        (0..rows)
            .map(|j| {
                let dot: f64 = (0..cols).map(|k| w.data[j * cols + k] * x[k]).sum();
                dot + b.data[j]
            })
            .collect()
    }
}

impl Model for TwoHeadLinear {
    fn forward(&mut self, inputs: &[Tensor]) -> Vec<Tensor> {
        let x = &inputs[0];
        self.last_input = x.clone();
        let depth = Self::head(&self.depth_w, &self.depth_b, &x.data);
        let score = Self::head(&self.score_w, &self.score_b, &x.data);
        // Predictions mirror the batched label shapes.
        vec![
            Tensor::from_data(vec![1, 2], depth),
            Tensor::from_data(vec![1, 1], score),
        ]
    }

    fn zero_grad(&mut self) {
        for g in self.grads.iter_mut() {
            *g = g.zeros_like();
        }
    }

    fn backward(&mut self, output_grads: &[Tensor]) {
        let x = &self.last_input.data;
        // Head j: d/dw[j,k] = g[j]·x[k], d/db[j] = g[j].
        let heads = [(0usize, 1usize, 4usize), (2, 3, 4)];
        for ((w_slot, b_slot, cols), grad) in heads.iter().zip(output_grads.iter()) {
            for (j, g) in grad.data.iter().enumerate() {
                for k in 0..*cols {
                    self.grads[*w_slot].data[j * cols + k] += g * x[k];
                }
                self.grads[*b_slot].data[j] += g;
            }
        }
    }

    fn visit_params(&mut self, f: &mut dyn FnMut(&mut Tensor, &Tensor)) {
        f(&mut self.depth_w, &self.grads[0]);
        f(&mut self.depth_b, &self.grads[1]);
        f(&mut self.score_w, &self.grads[2]);
        f(&mut self.score_b, &self.grads[3]);
    }

    fn save_snapshot(&self, path: &Path) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// Draws noisy samples from a fixed linear ground truth. Depth mask
/// elements drop out independently, so some samples arrive with an
/// all-zero mask and exercise the fetcher's rejection path.
struct Synthetic {
    rng: StdRng,
}

impl Synthetic {
    fn new(seed: u64) -> Synthetic {
        Synthetic {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for Synthetic {
    fn sample(&mut self) -> Sample {
        let x: Vec<f64> = (0..4).map(|_| self.rng.gen::<f64>() * 2.0 - 1.0).collect();
        let depth = vec![
            0.8 * x[0] - 0.3 * x[1] + 0.05 * self.rng.gen::<f64>(),
            0.5 * x[2] + 0.2 * x[3] + 0.05 * self.rng.gen::<f64>(),
        ];
        let score = vec![x.iter().sum::<f64>() / 4.0];
        let mask: Vec<f64> = (0..2)
            .map(|_| if self.rng.gen_bool(0.7) { 1.0 } else { 0.0 })
            .collect();

        Sample::new()
            .with_field("signal", Tensor::from_vec(x))
            .with_field("depth", Tensor::from_vec(depth))
            .with_field("depth_mask", Tensor::from_vec(mask))
            .with_field("score", Tensor::from_vec(score))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let spec = SampleSpec::infer(
        ["signal", "depth", "depth_mask", "score"],
        &["depth", "score"],
    )
    .context("deriving the sample schema")?;

    let mut options = TrainOptions::new(2000, 500, 25, 250, 1000, "twotask_expt");
    options.loss_weights = BTreeMap::from([("score".to_string(), 0.5)]);

    let mut model = TwoHeadLinear::new();
    let mut optimizer = Sgd::new(0.05);
    let mut sampler = Synthetic::new(17);
    let mut val_sampler = Synthetic::new(43);

    let monitor = train_loop(
        &mut model,
        &LossType::Mse,
        &mut optimizer,
        &mut sampler,
        Some(&mut val_sampler),
        &spec,
        0,
        LearningMonitor::new(),
        &options,
    )?;

    for task in spec.labels() {
        if let Some(value) = monitor.get_last_value(task, Phase::Train) {
            println!("final avg train loss [{task}] = {value:.5}");
        }
    }
    Ok(())
}
