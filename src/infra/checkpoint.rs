// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores run artefacts with Burn's CompactRecorder.
//
// File layout:
//   checkpoints/
//     train_config.json    ← every training knob
//     model_config.json    ← SoftMaskedBertConfig (architecture + CharRange)
//     vocab.txt            ← copy of the pretrained vocabulary
//     best_model.mpk       ← weights at the best dev F1 so far
//     last_model.mpk       ← weights when the run finished
//     metrics.csv          ← one row per epoch (see metrics.rs)
//
// Inference rebuilds the model from model_config.json, then loads
// best_model into it. Loading fails if the architecture differs.
// Nothing at inference time points back at the pretrained directory.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::infra::pretrained::VOCAB_FILE;
use crate::ml::model::{SoftMaskedBert, SoftMaskedBertConfig};

pub const BEST_MODEL: &str = "best_model";
pub const LAST_MODEL: &str = "last_model";

const TRAIN_CONFIG_FILE: &str = "train_config.json";
const MODEL_CONFIG_FILE: &str = "model_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager and its directory (like `mkdir -p`)
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!(
                "Checkpoint directory '{}' does not exist. Have you run 'train' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights under a name (recorder adds the extension)
    pub fn save_model<B: Backend>(&self, model: &SoftMaskedBert<B>, name: &str) -> Result<()> {
        let path = self.dir.join(name);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", name);
        Ok(())
    }

    /// Load named weights into a model of the same architecture
    pub fn load_model<B: Backend>(
        &self,
        model:  SoftMaskedBert<B>,
        name:   &str,
        device: &B::Device,
    ) -> Result<SoftMaskedBert<B>> {
        let path = self.dir.join(name);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        tracing::info!("Loaded checkpoint '{}'", name);
        Ok(model.load_record(record))
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG_FILE, cfg)
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        self.read_json(TRAIN_CONFIG_FILE)
    }

    pub fn save_model_config(&self, cfg: &SoftMaskedBertConfig) -> Result<()> {
        self.write_json(MODEL_CONFIG_FILE, cfg)
    }

    pub fn load_model_config(&self) -> Result<SoftMaskedBertConfig> {
        self.read_json(MODEL_CONFIG_FILE)
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    /// Copy the vocabulary next to the weights
    pub fn save_vocab(&self, src: &Path) -> Result<()> {
        let dest = self.vocab_path();
        if dest.exists() && fs::canonicalize(src)? == fs::canonicalize(&dest)? {
            return Ok(());
        }
        fs::copy(src, &dest).with_context(|| {
            format!("Cannot copy vocabulary '{}' to '{}'", src.display(), dest.display())
        })?;

        tracing::debug!("Saved '{}'", dest.display());
        Ok(())
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))
    }
}
