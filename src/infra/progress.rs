// ============================================================
// Layer 6 — Progress Bars
// ============================================================
// One style for every long loop: training batches and the
// per-sample evaluation pass. A disabled bar still counts but
// draws to a hidden target, so callers never branch on it.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub fn progress_bar(size: u64, msg: impl Into<String>, visible: bool) -> Result<ProgressBar> {
    let pb = ProgressBar::new(size);
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return Ok(pb);
    }

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {msg:<24!} {wide_bar} {pos}/{len}")
        .context("Invalid progress bar template")?;

    pb.set_style(style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_secs(1));
    Ok(pb)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let pb = progress_bar(3, "eval", false).unwrap();
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert!(pb.is_hidden());
    }
}
