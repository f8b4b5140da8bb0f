pub mod fetch;
pub mod sample;
pub mod spec;

pub use fetch::{FetchError, MaskedSampleFetcher, Sampler};
pub use sample::Sample;
pub use spec::{SampleSpec, SpecError};
