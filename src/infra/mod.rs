// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs — run artefacts in the checkpoint directory
//                   (configs as JSON, weights via CompactRecorder)
//
//   pretrained.rs — the pretrained BERT directory: bert_config.json,
//                   vocab.txt and the embedding/encoder records
//
//   metrics.rs    — per-epoch CSV log
//
//   progress.rs   — indicatif progress bars
//
// Reference: Burn Book §5 (Checkpointing)

/// Run artefacts: configs and model weights
pub mod checkpoint;

/// Pretrained BERT config, vocabulary and weights
pub mod pretrained;

/// Training metrics CSV logger
pub mod metrics;

/// Progress bars for long loops
pub mod progress;
