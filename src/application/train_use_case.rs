// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Open the pretrained checkpoint    (Layer 6 - infra)
//   Step 2: Vocabulary + character range      (Layer 4 - data)
//   Step 3: Model config                      (Layer 6 - infra)
//   Step 4: Load train / dev corpora          (Layer 4 - data)
//   Step 5: Encode the training set           (Layer 4 - data)
//   Step 6: Save both configs                 (Layer 6 - infra)
//   Step 7: Build the model and its weights   (Layer 5 - ml)
//   Step 8: Run the training session          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::CscDataset,
    encoder::SampleEncoder,
    loader::CorpusLoader,
    splitter::hold_out,
    vocab::{CharRange, Vocabulary},
};
use crate::domain::{sample::Sample, traits::SampleSource};
use crate::infra::{
    checkpoint::{CheckpointManager, BEST_MODEL},
    metrics::MetricsLogger,
    pretrained::{ModelOptions, PretrainedCheckpoint},
};
use crate::ml::{
    evaluator::Evaluator,
    loss::{JointLoss, DEFAULT_ALPHA},
    model::Trainable,
    schedule::WarmupDecay,
    trainer::{run_training, TrainBackend, TrainingPlan},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a training run. Saved as train_config.json so
// `eval` and `correct` find the vocabulary and settings again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub pretrained_dir:  String,
    pub train_corpus:    String,
    /// Dev corpus; a seeded hold-out of the training corpus when absent
    pub dev_corpus:      Option<String>,
    pub checkpoint_dir:  String,
    /// Prediction file rewritten on every evaluation pass
    pub output_file:     String,
    pub max_seq_len:     usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    /// Epochs already completed; > 0 resumes from best_model
    pub initial_epoch:   usize,
    pub lr_max:          f64,
    pub lr_min:          f64,
    pub alpha:           f64,
    pub detector_hidden: usize,
    pub dropout:         f64,
    pub trainable:       Trainable,
    pub char_start:      Option<u32>,
    pub char_end:        Option<u32>,
    pub dev_fraction:    f64,
    pub seed:            u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            pretrained_dir:  "bert-base-chinese".to_string(),
            train_corpus:    "data/train.jsonl".to_string(),
            dev_corpus:      None,
            checkpoint_dir:  "checkpoints".to_string(),
            output_file:     "dev_pred.jsonl".to_string(),
            max_seq_len:     128,
            batch_size:      32,
            epochs:          20,
            initial_epoch:   0,
            lr_max:          5e-4,
            lr_min:          1e-4,
            alpha:           DEFAULT_ALPHA,
            detector_hidden: 256,
            dropout:         0.1,
            trainable:       Trainable::All,
            char_start:      None,
            char_end:        None,
            dev_fraction:    0.1,
            seed:            42,
        }
    }
}

impl TrainConfig {
    /// Detected CJK block, with either bound overridden when given
    pub fn char_range(&self, vocab: &Vocabulary) -> Result<CharRange> {
        let range = match (self.char_start, self.char_end) {
            (Some(start), Some(end)) => CharRange::new(start, end)?,
            (start, end) => {
                let detected = CharRange::detect(vocab)?;
                CharRange::new(start.unwrap_or(detected.start), end.unwrap_or(detected.end))?
            }
        };
        if range.end as usize >= vocab.len() {
            bail!(
                "Character range end ({}) is outside the vocabulary ({} tokens)",
                range.end, vocab.len()
            );
        }
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.max_seq_len < 3 {
            bail!("max_seq_len must leave room for [CLS], one character and [SEP]");
        }
        if self.initial_epoch > self.epochs {
            bail!("initial_epoch ({}) is past epochs ({})", self.initial_epoch, self.epochs);
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            bail!("alpha must lie in [0, 1], got {}", self.alpha);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:        TrainConfig,
    show_progress: bool,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config, show_progress: true }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Train on the default GPU device; returns the best dev F1
    pub fn execute(&self) -> Result<f64> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<TrainBackend>(device)
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<f64> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Pretrained checkpoint ─────────────────────────────────────
        let pretrained = PretrainedCheckpoint::open(&cfg.pretrained_dir)?;

        // ── Step 2: Vocabulary and the correctable character block ────────────
        let vocab = Vocabulary::from_file(pretrained.vocab_path())?;
        if vocab.len() > pretrained.config().vocab_size {
            bail!(
                "Vocabulary has {} tokens but the pretrained embeddings only {}",
                vocab.len(), pretrained.config().vocab_size
            );
        }
        let range = cfg.char_range(&vocab)?;

        // ── Step 3: Model config ──────────────────────────────────────────────
        let model_cfg = pretrained.model_config(ModelOptions {
            max_seq_len:     cfg.max_seq_len,
            mask_id:         vocab.mask_id(),
            char_range:      range,
            detector_hidden: cfg.detector_hidden,
            dropout:         cfg.dropout,
        });
        let encoder = SampleEncoder::new(vocab, range, model_cfg.seq_len)?;

        // ── Step 4: Corpora ───────────────────────────────────────────────────
        let (train, dev) = self.load_corpora()?;
        if cfg.batch_size > train.len() {
            bail!(
                "batch_size ({}) is larger than the training set ({} samples)",
                cfg.batch_size, train.len()
            );
        }
        tracing::info!("Split: {} train, {} dev", train.len(), dev.len());

        // ── Step 5: Encode the training set once ──────────────────────────────
        let train_dataset = CscDataset::encode(&encoder, &train);

        // ── Step 6: Save configs for eval / correct ───────────────────────────
        let ckpt = CheckpointManager::create(&cfg.checkpoint_dir)?;
        if cfg.initial_epoch > 0 {
            let previous = ckpt.load_train_config()?;
            if previous.max_seq_len != cfg.max_seq_len || previous.detector_hidden != cfg.detector_hidden {
                bail!(
                    "Cannot resume: checkpoint was trained with max_seq_len={} detector_hidden={}",
                    previous.max_seq_len, previous.detector_hidden
                );
            }
        }
        ckpt.save_train_config(cfg)?;
        ckpt.save_model_config(&model_cfg)?;
        ckpt.save_vocab(&pretrained.vocab_path())?;

        // ── Step 7: Model, weights, trainable groups ──────────────────────────
        let model = model_cfg.init::<B>(&device);
        let model = if cfg.initial_epoch > 0 {
            tracing::info!("Resuming after epoch {} from best_model", cfg.initial_epoch);
            ckpt.load_model(model, BEST_MODEL, &device)?
        } else {
            pretrained.load_weights(model, &device)?
        };
        let model = model.with_trainable(&cfg.trainable)?;
        tracing::info!(
            "Model ready: {} layers, hidden={}, seq_len={}, {} classes",
            model_cfg.num_layers, model_cfg.hidden_size, model_cfg.seq_len, range.num_classes()
        );

        // ── Step 8: Train ─────────────────────────────────────────────────────
        let metrics = MetricsLogger::new(ckpt.dir())?;
        let plan = TrainingPlan {
            encoder:       &encoder,
            train:         train_dataset,
            dev:           &dev,
            batch_size:    cfg.batch_size,
            epochs:        cfg.epochs,
            initial_epoch: cfg.initial_epoch,
            schedule:      WarmupDecay::new(cfg.lr_max, cfg.lr_min),
            loss:          JointLoss::new(cfg.alpha),
            evaluator:     Evaluator::new(&cfg.output_file).with_progress(self.show_progress),
            show_progress: self.show_progress,
        };
        run_training(model, plan, &ckpt, &metrics, device)
    }

    fn load_corpora(&self) -> Result<(Vec<Sample>, Vec<Sample>)> {
        let cfg   = &self.config;
        let train = CorpusLoader::new(&cfg.train_corpus).load_all()?;

        match &cfg.dev_corpus {
            Some(path) => Ok((train, CorpusLoader::new(path).load_all()?)),
            None => {
                tracing::info!(
                    "No dev corpus given, holding out {:.0}% of the training corpus",
                    cfg.dev_fraction * 100.0
                );
                Ok(hold_out(train, cfg.dev_fraction, cfg.seed))
            }
        }
    }
}
