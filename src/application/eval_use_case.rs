// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Restores best_model from a checkpoint directory, scores a corpus
// and writes the per-sample predictions.

use anyhow::Result;
use burn::prelude::*;
use std::path::PathBuf;

use crate::data::loader::CorpusLoader;
use crate::domain::{evaluation::Scores, traits::SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    evaluator::Evaluator,
    inferencer::{InferBackend, InferenceEngine},
};

pub struct EvalUseCase {
    checkpoint_dir: PathBuf,
    corpus:         PathBuf,
    output_file:    PathBuf,
}

impl EvalUseCase {
    pub fn new(
        checkpoint_dir: impl Into<PathBuf>,
        corpus:         impl Into<PathBuf>,
        output_file:    impl Into<PathBuf>,
    ) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            corpus:         corpus.into(),
            output_file:    output_file.into(),
        }
    }

    pub fn execute(&self) -> Result<Scores> {
        self.execute_on::<InferBackend>(Default::default(), true)
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device, show_progress: bool) -> Result<Scores> {
        let ckpt    = CheckpointManager::open(&self.checkpoint_dir)?;
        let engine  = InferenceEngine::<B>::from_checkpoint(&ckpt, device)?;
        let samples = CorpusLoader::new(&self.corpus).load_all()?;

        Evaluator::new(&self.output_file)
            .with_progress(show_progress)
            .evaluate(&engine.corrector(), &samples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::tests::{seed_checkpoint, tiny_run};
    use burn::backend::NdArray;
    use std::fs;

    #[test]
    fn test_eval_scores_corpus_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_run(dir.path());

        seed_checkpoint(&cfg);
        let device = Default::default();

        let output = dir.path().join("eval_pred.jsonl");
        let scores = EvalUseCase::new(&cfg.checkpoint_dir, &cfg.train_corpus, &output)
            .execute_on::<NdArray>(device, false)
            .unwrap();

        assert!((0.0..=1.0).contains(&scores.accuracy));
        assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_eval_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = EvalUseCase::new(dir.path().join("none"), "corpus.jsonl", "out.jsonl")
            .execute_on::<NdArray>(Default::default(), false);
        assert!(result.is_err());
    }
}
