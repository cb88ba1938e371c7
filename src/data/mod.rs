// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From corpus files to tensor batches:
//
//   corpus.jsonl
//       │
//       ▼
//   CorpusLoader      → annotated Samples
//       │
//       ▼
//   hold_out          → dev split when no dev corpus is given
//       │
//       ▼
//   SampleEncoder     → fixed-length ids, mask and labels (Vocabulary + CharRange)
//       │
//       ▼
//   CscDataset        → Burn Dataset
//       │
//       ▼
//   CscBatcher        → [batch, seq_len] tensors for the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Vocabulary file and the correction character range
pub mod vocab;

/// JSON Lines / JSON array corpus reader
pub mod loader;

/// Sample → fixed-length id sequences and labels
pub mod encoder;

/// Implements Burn's Dataset trait for encoded samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/dev hold-out
pub mod splitter;
