// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here.
//
//   embedding.rs  — BERT token/segment/position embeddings and
//                   the soft-mask blend
//   detector.rs   — bidirectional GRU error detector
//   encoder.rs    — post-LN BERT encoder stack
//   model.rs      — Soft-Masked BERT, its config and the
//                   trainable-group policy
//   loss.rs       — joint correction + detection loss
//   schedule.rs   — warm-up / decay learning rate
//   decoder.rs    — head argmax → sentence + mistakes
//   inferencer.rs — single-sample correction, checkpoint loading
//   evaluator.rs  — sentence-level scores + prediction file
//   trainer.rs    — training session and run loop
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Devlin et al. (2019) BERT
//            Zhang et al. (2020) Soft-Masked BERT

pub mod embedding;

pub mod detector;

pub mod encoder;

/// Soft-Masked BERT architecture
pub mod model;

pub mod loss;

pub mod schedule;

pub mod decoder;

/// Single-sample inference and checkpoint loading
pub mod inferencer;

pub mod evaluator;

/// Training session with evaluation and checkpointing
pub mod trainer;
