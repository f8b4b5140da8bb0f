use thiserror::Error;

use crate::sample::sample::Sample;

/// A source of unbatched samples. Implementations own any shuffling,
/// augmentation or prefetching; the driver only ever asks for the next
/// sample.
pub trait Sampler {
    fn sample(&mut self) -> Sample;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FetchError {
    #[error("mask \"{mask}\" had no nonzero element in any of {attempts} samples")]
    RetriesExhausted { mask: String, attempts: usize },
}

/// Pulls samples from a source, rejecting any where a named mask carries no
/// signal (no nonzero element), so every task in the accepted sample has
/// something to learn from.
///
/// Retries are bounded: a source that cannot satisfy the mask constraint
/// within the attempt budget yields [`FetchError::RetriesExhausted`] instead
/// of blocking forever. Accepted samples are given a unit batch dimension.
#[derive(Debug, Clone, Copy)]
pub struct MaskedSampleFetcher {
    max_attempts: usize,
}

impl MaskedSampleFetcher {
    pub fn new(max_attempts: usize) -> MaskedSampleFetcher {
        assert!(max_attempts > 0, "max_attempts must be at least 1");
        MaskedSampleFetcher { max_attempts }
    }

    pub fn fetch(
        &self,
        source: &mut dyn Sampler,
        mask_names: &[String],
    ) -> Result<Sample, FetchError> {
        let mut last_empty = None;
        for _ in 0..self.max_attempts {
            let mut sample = source.sample();
            if let Some(empty) = first_empty_mask(&sample, mask_names) {
                last_empty = Some(empty);
                continue;
            }
            sample.batch_of_one();
            return Ok(sample);
        }
        Err(FetchError::RetriesExhausted {
            mask: last_empty.unwrap_or_default(),
            attempts: self.max_attempts,
        })
    }
}

/// Name of the first named mask that is absent or all-zero, if any.
fn first_empty_mask(sample: &Sample, mask_names: &[String]) -> Option<String> {
    mask_names
        .iter()
        .find(|name| match sample.get(name) {
            Some(mask) => !mask.any_nonzero(),
            None => true,
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;

    /// Replays a fixed list of samples, then repeats the last one.
    struct Scripted {
        samples: Vec<Sample>,
        next: usize,
    }

    impl Scripted {
        fn new(samples: Vec<Sample>) -> Scripted {
            Scripted { samples, next: 0 }
        }
    }

    impl Sampler for Scripted {
        fn sample(&mut self) -> Sample {
            let i = self.next.min(self.samples.len() - 1);
            self.next += 1;
            self.samples[i].clone()
        }
    }

    fn masked_sample(mask: Vec<f64>) -> Sample {
        Sample::new()
            .with_field("image", Tensor::from_vec(vec![1.0, 2.0]))
            .with_field("depth", Tensor::from_vec(vec![0.5, 0.5, 0.5]))
            .with_field("depth_mask", Tensor::from_vec(mask))
    }

    #[test]
    fn fetch_skips_empty_masks_and_batches() {
        let mut source = Scripted::new(vec![
            masked_sample(vec![0.0, 0.0, 0.0]),
            masked_sample(vec![0.0, 0.0, 0.0]),
            masked_sample(vec![0.0, 1.0, 0.0]),
        ]);
        let fetcher = MaskedSampleFetcher::new(10);
        let sample = fetcher
            .fetch(&mut source, &["depth_mask".to_string()])
            .unwrap();
        assert!(sample.get("depth_mask").unwrap().any_nonzero());
        // Every field gained a unit batch dimension.
        assert_eq!(sample.get("image").unwrap().shape, vec![1, 2]);
        assert_eq!(sample.get("depth_mask").unwrap().shape, vec![1, 3]);
    }

    #[test]
    fn fetch_fails_after_attempt_budget() {
        let mut source = Scripted::new(vec![masked_sample(vec![0.0, 0.0, 0.0])]);
        let fetcher = MaskedSampleFetcher::new(3);
        let err = fetcher
            .fetch(&mut source, &["depth_mask".to_string()])
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::RetriesExhausted {
                mask: "depth_mask".to_string(),
                attempts: 3,
            }
        );
    }

    #[test]
    fn fetch_treats_missing_mask_as_empty() {
        let mut source = Scripted::new(vec![Sample::new()
            .with_field("image", Tensor::from_vec(vec![1.0]))]);
        let fetcher = MaskedSampleFetcher::new(2);
        assert!(fetcher
            .fetch(&mut source, &["depth_mask".to_string()])
            .is_err());
    }

    #[test]
    fn fetch_without_masks_accepts_first_sample() {
        let mut source = Scripted::new(vec![masked_sample(vec![0.0, 0.0, 0.0])]);
        let fetcher = MaskedSampleFetcher::new(1);
        assert!(fetcher.fetch(&mut source, &[]).is_ok());
    }
}
