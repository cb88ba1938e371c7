// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch.
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,f1,precision,recall,accuracy,best_f1
//   1,41.237810,0.312000,0.401000,0.255000,0.512000,0.312000
//   2,18.904100,0.455000,0.520000,0.404000,0.601000,0.455000
//
// The header is written only when the file is new, so a resumed
// run keeps appending to the same log. The last row's best_f1 is
// where a resumed run picks up the best-model gate.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::evaluation::Scores;

const HEADER: &str = "epoch,train_loss,f1,precision,recall,accuracy,best_f1";

/// One row of metrics for a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number, 1-based
    pub epoch: usize,

    /// Mean joint loss over the epoch's batches
    pub train_loss: f64,

    /// Dev-set scores after the epoch
    pub scores: Scores,

    /// Best dev F1 so far, including this epoch
    pub best_f1: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, scores: Scores, best_f1: f64) -> Self {
        Self { epoch, train_loss, scores, best_f1 }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.scores.f1,
            m.scores.precision,
            m.scores.recall,
            m.scores.accuracy,
            m.best_f1,
        )?;

        tracing::debug!("Logged epoch {} metrics: f1={:.4}", m.epoch, m.scores.f1);
        Ok(())
    }

    /// best_f1 of the last logged epoch, 0.0 when nothing is logged yet
    pub fn last_best_f1(&self) -> Result<f64> {
        let csv = fs::read_to_string(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;

        let Some(row) = csv.lines().skip(1).filter(|l| !l.trim().is_empty()).last() else {
            return Ok(0.0);
        };
        row.rsplit(',')
            .next()
            .and_then(|field| field.trim().parse::<f64>().ok())
            .with_context(|| format!("Malformed row in '{}': {row}", self.csv_path.display()))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
