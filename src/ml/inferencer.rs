// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Corrector: runs the model on one sample (batch size 1) and
// decodes the result. It borrows the model, so the training
// session can evaluate its current weights without handing the
// model over.
//
// InferenceEngine: owns a model restored from the best checkpoint,
// for the `eval` and `correct` commands.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::data::encoder::{EncodedSample, SampleEncoder};
use crate::data::vocab::Vocabulary;
use crate::domain::sample::{Prediction, Sample};
use crate::domain::traits::SpellingCorrector;
use crate::infra::checkpoint::{CheckpointManager, BEST_MODEL};
use crate::ml::decoder::decode;
use crate::ml::model::SoftMaskedBert;

pub type InferBackend = burn::backend::Wgpu;

/// Raw model output for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    /// Argmax head class per position
    pub classes:     Vec<usize>,
    /// Detector error probability per position
    pub error_probs: Vec<f32>,
}

pub struct Corrector<'a, B: Backend> {
    model:   &'a SoftMaskedBert<B>,
    encoder: &'a SampleEncoder,
    device:  B::Device,
}

impl<'a, B: Backend> Corrector<'a, B> {
    pub fn new(model: &'a SoftMaskedBert<B>, encoder: &'a SampleEncoder, device: B::Device) -> Self {
        Self { model, encoder, device }
    }

    pub fn infer(&self, encoded: &EncodedSample) -> Result<Inference> {
        let seq_len = encoded.token_ids.len();
        let as_row = |values: &[u32]| {
            let ints: Vec<i32> = values.iter().map(|&v| v as i32).collect();
            Tensor::<B, 1, Int>::from_ints(ints.as_slice(), &self.device).reshape([1, seq_len])
        };

        let output = self.model.forward(
            as_row(&encoded.token_ids),
            as_row(&encoded.segment_ids),
            as_row(&encoded.mask),
        );

        let classes = output
            .logits
            .argmax(2)
            .flatten::<1>(0, 2)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow!("Cannot read head predictions: {e:?}"))?
            .into_iter()
            .map(|c| c as usize)
            .collect();

        let error_probs = output
            .error_prob
            .flatten::<1>(0, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read detector output: {e:?}"))?;

        Ok(Inference { classes, error_probs })
    }
}

impl<B: Backend> SpellingCorrector for Corrector<'_, B> {
    fn extract(&self, sample: &Sample) -> Result<Prediction> {
        let encoded   = self.encoder.encode(sample);
        let inference = self.infer(&encoded)?;

        let valid = encoded.valid_len();
        tracing::debug!(
            "Mean error probability {:.4} over {} positions",
            inference.error_probs.iter().take(valid).sum::<f32>() / valid.max(1) as f32,
            valid
        );

        let (predict, mistakes) = decode(
            &sample.text,
            &encoded.token_ids,
            &encoded.mask,
            &inference.classes,
            self.encoder.vocab(),
            self.encoder.range(),
        );

        // Ground truth only from positions the model could see
        let correct = sample.visible_to(self.seq_len()).corrected_text();

        Ok(Prediction { predict, correct, mistakes })
    }

    fn seq_len(&self) -> usize {
        self.encoder.seq_len()
    }
}

// ─── InferenceEngine ──────────────────────────────────────────────────────────
pub struct InferenceEngine<B: Backend> {
    model:   SoftMaskedBert<B>,
    encoder: SampleEncoder,
    device:  B::Device,
}

impl<B: Backend> InferenceEngine<B> {
    pub fn new(model: SoftMaskedBert<B>, encoder: SampleEncoder, device: B::Device) -> Self {
        Self { model, encoder, device }
    }

    /// Rebuild the architecture saved at training time and load the best weights
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let model_cfg = ckpt.load_model_config()?;

        let vocab   = Vocabulary::from_file(ckpt.vocab_path())?;
        let encoder = SampleEncoder::new(vocab, model_cfg.char_range, model_cfg.seq_len)?;

        let model = model_cfg.init::<B>(&device);
        let model = ckpt.load_model(model, BEST_MODEL, &device)?;
        tracing::info!(
            "Model loaded from '{}' (seq_len={}, {} classes)",
            ckpt.dir().display(),
            model_cfg.seq_len,
            model_cfg.char_range.num_classes()
        );

        Ok(Self::new(model, encoder, device))
    }

    pub fn corrector(&self) -> Corrector<'_, B> {
        Corrector::new(&self.model, &self.encoder, self.device.clone())
    }

    /// Correct one raw sentence
    pub fn correct(&self, text: &str) -> Result<Prediction> {
        self.corrector().extract(&Sample::unannotated(text))
    }
}
