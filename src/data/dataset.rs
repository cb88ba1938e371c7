use burn::data::dataset::Dataset;

use crate::data::encoder::{EncodedSample, SampleEncoder};
use crate::domain::sample::Sample;

/// Encoded training samples behind Burn's Dataset trait.
/// Samples are encoded once up front; every epoch reads the same vectors.
pub struct CscDataset {
    samples: Vec<EncodedSample>,
}

impl CscDataset {
    pub fn new(samples: Vec<EncodedSample>) -> Self { Self { samples } }

    pub fn encode(encoder: &SampleEncoder, samples: &[Sample]) -> Self {
        Self::new(samples.iter().map(|s| encoder.encode(s)).collect())
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EncodedSample> for CscDataset {
    fn get(&self, index: usize) -> Option<EncodedSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
