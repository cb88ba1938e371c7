// ============================================================
// Layer 2 — CorrectUseCase
// ============================================================
// Loads best_model once and corrects raw sentences on demand.

use anyhow::Result;
use burn::prelude::*;
use std::path::Path;

use crate::domain::sample::Prediction;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{InferBackend, InferenceEngine};

pub struct CorrectUseCase<B: Backend = InferBackend> {
    engine: InferenceEngine<B>,
}

impl CorrectUseCase<InferBackend> {
    pub fn new(checkpoint_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_on(checkpoint_dir, Default::default())
    }
}

impl<B: Backend> CorrectUseCase<B> {
    pub fn open_on(checkpoint_dir: impl AsRef<Path>, device: B::Device) -> Result<Self> {
        let ckpt   = CheckpointManager::open(checkpoint_dir.as_ref())?;
        let engine = InferenceEngine::from_checkpoint(&ckpt, device)?;
        Ok(Self { engine })
    }

    pub fn correct(&self, text: &str) -> Result<Prediction> {
        self.engine.correct(text)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::tests::{seed_checkpoint, tiny_run};
    use burn::backend::NdArray;

    #[test]
    fn test_correct_returns_sentence_of_same_shape() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_run(dir.path());

        seed_checkpoint(&cfg);
        let device = Default::default();

        let use_case   = CorrectUseCase::<NdArray>::open_on(&cfg.checkpoint_dir, device).unwrap();
        let prediction = use_case.correct("他是我朋有").unwrap();

        // No annotations: the ground truth is the input itself
        assert_eq!(prediction.correct, "他是我朋有");
        assert!(prediction.mistakes.iter().all(|m| (1..=5).contains(&m.loc)));
        assert_eq!(use_case.correct("他是我朋有").unwrap(), prediction);
    }

    #[test]
    fn test_checkpoint_directory_is_self_contained() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_run(dir.path());
        seed_checkpoint(&cfg);

        // Only the checkpoint directory is needed after training
        std::fs::remove_dir_all(&cfg.pretrained_dir).unwrap();
        let use_case = CorrectUseCase::<NdArray>::open_on(&cfg.checkpoint_dir, Default::default()).unwrap();
        assert!(use_case.correct("他是我朋有").is_ok());
    }
}
