// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe spelling correction:
//
//   sample.rs     — annotated sentences, mistakes, predictions
//   evaluation.rs — confusion counts and sentence-level scores
//   traits.rs     — SampleSource and SpellingCorrector
//
// No Burn types and no file IO live here, so everything in this
// layer is testable without a device.

pub mod sample;

pub mod evaluation;

pub mod traits;
