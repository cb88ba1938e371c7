// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `eval` and `correct`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Trainable;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune Soft-Masked BERT from a pretrained Chinese BERT
    Train(TrainArgs),

    /// Score a corpus with the best checkpoint
    Eval(EvalArgs),

    /// Correct sentences given as arguments, or one per stdin line
    Correct(CorrectArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with bert_config.json, vocab.txt and the weight records
    #[arg(long, default_value = "bert-base-chinese")]
    pub pretrained_dir: String,

    /// Annotated training corpus (JSON Lines or a JSON array)
    #[arg(long, default_value = "data/train.jsonl")]
    pub train_corpus: String,

    /// Annotated dev corpus; without it a seeded hold-out is used
    #[arg(long)]
    pub dev_corpus: Option<String>,

    /// Directory for configs, weights and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Dev predictions, rewritten every epoch
    #[arg(long, default_value = "dev_pred.jsonl")]
    pub output_file: String,

    /// Characters per sequence including [CLS] and [SEP]
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    /// Epochs already done; > 0 resumes from best_model
    #[arg(long, default_value_t = 0)]
    pub initial_epoch: usize,

    /// Peak learning rate, reached at the end of the first epoch
    #[arg(long, default_value_t = 5e-4)]
    pub lr_max: f64,

    /// Floor learning rate, reached at the end of the second epoch
    #[arg(long, default_value_t = 1e-4)]
    pub lr_min: f64,

    /// Weight of the correction loss against the detection loss
    #[arg(long, default_value_t = 0.8)]
    pub alpha: f64,

    /// GRU width per direction in the detector
    #[arg(long, default_value_t = 256)]
    pub detector_hidden: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Pretrained groups to fine-tune: "all", "none" or a list such as
    /// "embeddings,encoder.10,encoder.11"
    #[arg(long, default_value = "all")]
    pub trainable: Trainable,

    /// First vocabulary id of the correctable character block
    #[arg(long)]
    pub char_start: Option<u32>,

    /// Last vocabulary id of the correctable character block
    #[arg(long)]
    pub char_end: Option<u32>,

    /// Share of the training corpus held out when no dev corpus is given
    #[arg(long, default_value_t = 0.1)]
    pub dev_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            pretrained_dir:  a.pretrained_dir,
            train_corpus:    a.train_corpus,
            dev_corpus:      a.dev_corpus,
            checkpoint_dir:  a.checkpoint_dir,
            output_file:     a.output_file,
            max_seq_len:     a.max_seq_len,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            initial_epoch:   a.initial_epoch,
            lr_max:          a.lr_max,
            lr_min:          a.lr_min,
            alpha:           a.alpha,
            detector_hidden: a.detector_hidden,
            dropout:         a.dropout,
            trainable:       a.trainable,
            char_start:      a.char_start,
            char_end:        a.char_end,
            dev_fraction:    a.dev_fraction,
            seed:            a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Annotated corpus to score
    #[arg(long)]
    pub corpus: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "eval_pred.jsonl")]
    pub output_file: String,
}

#[derive(Args, Debug)]
pub struct CorrectArgs {
    /// Sentences to correct; read from stdin when empty
    pub sentences: Vec<String>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
