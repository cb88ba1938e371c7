// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the evaluator and its inputs: where samples come
// from, and what turns a sample into a prediction.

use anyhow::Result;
use crate::domain::sample::{Prediction, Sample};

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Anything that can produce annotated samples.
///
/// Implementations:
///   - CorpusLoader → JSON Lines / JSON array corpus files
pub trait SampleSource {
    fn load_all(&self) -> Result<Vec<Sample>>;
}

// ─── SpellingCorrector ────────────────────────────────────────────────────────
/// Anything that can decode one sample into a corrected sentence.
///
/// Implementations:
///   - Corrector → runs the soft-masked model on one sample
pub trait SpellingCorrector {
    /// Decode one sample.
    ///
    /// The caller is expected to pass a sample already pruned with
    /// `Sample::visible_to`, so the ground truth only names
    /// positions the model could see.
    fn extract(&self, sample: &Sample) -> Result<Prediction>;

    /// Encoded sequence length; used to prune annotations
    fn seq_len(&self) -> usize;
}
