// ============================================================
// Layer 6 — Pretrained BERT Checkpoint
// ============================================================
// A pretrained directory as this crate reads it:
//
//   bert-base-chinese/
//     bert_config.json   ← architecture (standard BERT field names)
//     vocab.txt          ← one token per line, id = line index
//     embeddings.mpk     ← BertEmbeddings record (CompactRecorder)
//     encoder.mpk        ← BertEncoder record (CompactRecorder)
//
// The two records are loaded into a freshly initialised model;
// the detector and the correction head keep their random init.

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
};

use crate::data::vocab::CharRange;
use crate::ml::encoder::HiddenAct;
use crate::ml::model::{SoftMaskedBert, SoftMaskedBertConfig};

pub const CONFIG_FILE:       &str = "bert_config.json";
pub const VOCAB_FILE:        &str = "vocab.txt";
pub const EMBEDDINGS_RECORD: &str = "embeddings";
pub const ENCODER_RECORD:    &str = "encoder";

/// Extension CompactRecorder appends to record paths
const RECORD_EXTENSION: &str = "mpk";

fn default_type_vocab_size() -> usize { 2 }
fn default_layer_norm_eps() -> f64 { 1e-12 }

/// `bert_config.json`, standard BERT field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub hidden_act:              HiddenAct,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

/// Crate-level knobs that complete a BertConfig into a model config
#[derive(Debug, Clone, Copy)]
pub struct ModelOptions {
    pub max_seq_len:     usize,
    pub mask_id:         u32,
    pub char_range:      CharRange,
    pub detector_hidden: usize,
    pub dropout:         f64,
}

pub struct PretrainedCheckpoint {
    dir:    PathBuf,
    config: BertConfig,
}

impl PretrainedCheckpoint {
    /// Read the config and check the vocabulary and both records exist
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir         = dir.into();
        let config_path = dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&config_path).with_context(|| {
            format!("Cannot read pretrained config '{}'", config_path.display())
        })?;
        let config: BertConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed pretrained config '{}'", config_path.display()))?;

        let ckpt = Self { dir, config };
        let required = [
            ckpt.vocab_path(),
            ckpt.record_file(EMBEDDINGS_RECORD),
            ckpt.record_file(ENCODER_RECORD),
        ];
        for path in required {
            if !path.is_file() {
                bail!("Pretrained checkpoint is missing '{}'", path.display());
            }
        }

        tracing::info!(
            "Pretrained BERT: {} layers, hidden={}, heads={}, max_positions={}",
            ckpt.config.num_hidden_layers,
            ckpt.config.hidden_size,
            ckpt.config.num_attention_heads,
            ckpt.config.max_position_embeddings,
        );
        Ok(ckpt)
    }

    pub fn config(&self) -> &BertConfig {
        &self.config
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    fn record_file(&self, name: &str) -> PathBuf {
        self.dir.join(name).with_extension(RECORD_EXTENSION)
    }

    /// Model config from the pretrained architecture. The sequence
    /// length is the smaller of `max_seq_len` and the position table.
    pub fn model_config(&self, opts: ModelOptions) -> SoftMaskedBertConfig {
        let c       = &self.config;
        let seq_len = opts.max_seq_len.min(c.max_position_embeddings);
        if seq_len < opts.max_seq_len {
            tracing::warn!(
                "max_seq_len {} exceeds the pretrained position table, using {}",
                opts.max_seq_len, seq_len
            );
        }

        SoftMaskedBertConfig::new(
            c.vocab_size,
            c.hidden_size,
            c.num_hidden_layers,
            c.num_attention_heads,
            c.intermediate_size,
            c.hidden_act,
            c.max_position_embeddings,
            seq_len,
            opts.mask_id,
            opts.char_range,
        )
        .with_type_vocab_size(c.type_vocab_size)
        .with_layer_norm_eps(c.layer_norm_eps)
        .with_detector_hidden(opts.detector_hidden)
        .with_dropout(opts.dropout)
    }

    /// Load the pretrained embeddings and encoder into `model`
    pub fn load_weights<B: Backend>(
        &self,
        mut model: SoftMaskedBert<B>,
        device:    &B::Device,
    ) -> Result<SoftMaskedBert<B>> {
        let recorder = CompactRecorder::new();

        let path = self.dir.join(EMBEDDINGS_RECORD);
        let embeddings = recorder
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load pretrained embeddings '{}'", path.display()))?;
        model.embeddings = model.embeddings.load_record(embeddings);

        let path = self.dir.join(ENCODER_RECORD);
        let encoder = recorder
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load pretrained encoder '{}'", path.display()))?;
        model.encoder = model.encoder.load_record(encoder);

        tracing::info!("Pretrained weights loaded from '{}'", self.dir.display());
        Ok(model)
    }
}
