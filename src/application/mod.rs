// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no model math, no printing.
//
//   train_use_case.rs   — pretrained BERT + corpus → checkpoints
//   eval_use_case.rs    — checkpoint + corpus → scores + predictions
//   correct_use_case.rs — checkpoint + sentence → correction
//
// Reference: Clean Architecture pattern

/// The training workflow
pub mod train_use_case;

/// Corpus evaluation with a trained checkpoint
pub mod eval_use_case;

/// Stand-alone sentence correction
pub mod correct_use_case;
