// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Two epochs of piecewise-linear schedule, S = steps per epoch:
//
//   step  0 .. S-1    warm-up  lr = (step+1)/S · max
//   step  S .. 2S-1   decay    lr = (2 - (step+1)/S) · (max - min) + min
//   step  2S ..       flat     lr = min
//
//   max ┤      ╱╲
//       │     ╱  ╲
//       │    ╱    ╲____________ min
//       │   ╱
//       └──┴─────┴─────┴──────► step
//          0     S     2S
//
// A pure function of the global step. The training loop owns the
// counter and applies the returned rate itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmupDecay {
    pub max: f64,
    pub min: f64,
}

impl WarmupDecay {
    pub fn new(max: f64, min: f64) -> Self {
        Self { max, min }
    }

    pub fn rate(&self, step: usize, steps_per_epoch: usize) -> f64 {
        let s    = steps_per_epoch.max(1) as f64;
        let done = (step + 1) as f64 / s;

        if step < steps_per_epoch {
            done * self.max
        } else if step < 2 * steps_per_epoch {
            (2.0 - done) * (self.max - self.min) + self.min
        } else {
            self.min
        }
    }
}
