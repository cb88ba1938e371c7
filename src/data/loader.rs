// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads annotated samples from disk. Two layouts are accepted:
//
//   JSON Lines (one sample per line, blank lines ignored)
//     {"text": "他是我朋有", "mistakes": [{"loc": 5, "wrong": "有", "correct": "友"}]}
//
//   A single JSON array of the same objects
//     [ {...}, {...} ]
//
// A malformed sample is fatal and reported with its line number.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sample::Sample;
use crate::domain::traits::SampleSource;

pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SampleSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<Sample>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;

        let samples = parse_corpus(&raw)
            .with_context(|| format!("Malformed corpus '{}'", self.path.display()))?;

        let positives = samples.iter().filter(|s| s.is_positive()).count();
        tracing::info!(
            "Loaded {} samples ({} with mistakes) from '{}'",
            samples.len(),
            positives,
            self.path.display()
        );
        Ok(samples)
    }
}

/// Parse corpus text in either accepted layout
pub fn parse_corpus(raw: &str) -> Result<Vec<Sample>> {
    let trimmed = raw.trim_start_matches('\u{FEFF}').trim_start();

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Corpus is not a valid JSON array of samples");
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Sample>(line)
                .with_context(|| format!("line {}: not a valid sample", i + 1))
        })
        .collect()
}
