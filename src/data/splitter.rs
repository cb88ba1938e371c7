// ============================================================
// Layer 4 — Dev Hold-Out Splitter
// ============================================================
// Used only when no separate dev corpus is configured: a seeded
// shuffle carves a fixed fraction of the training corpus out for
// per-epoch evaluation. The same seed gives the same split, so a
// resumed run keeps its dev set.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, dev).
/// `dev_fraction` is clamped to [0, 1].
pub fn hold_out<T>(mut samples: Vec<T>, dev_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let dev_size = ((total as f64) * dev_fraction.clamp(0.0, 1.0)).round() as usize;
    let dev      = samples.split_off(total - dev_size.min(total));

    tracing::debug!("Held out {} of {} samples for evaluation", dev.len(), total);
    (samples, dev)
}
