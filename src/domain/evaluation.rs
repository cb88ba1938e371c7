// ============================================================
// Layer 3 — Sentence-Level Evaluation Types
// ============================================================
// Every evaluated sample lands in exactly one confusion cell:
//
//                        prediction == truth   prediction != truth
//   has mistakes         true positive         false negative
//   no mistakes          true negative         false positive
//
// Scores are computed from the four counts. An epsilon in every
// denominator keeps all four metrics finite, even on an empty set.

use serde::{Deserialize, Serialize};

/// Added to every denominator so no metric divides by zero
pub const METRIC_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
}

impl Outcome {
    /// Classify one sample from its decoded sentences.
    /// `positive` is whether the sample carries annotated mistakes.
    pub fn classify(predict: &str, correct: &str, positive: bool) -> Self {
        match (predict == correct, positive) {
            (true, true)   => Outcome::TruePositive,
            (true, false)  => Outcome::TrueNegative,
            (false, true)  => Outcome::FalseNegative,
            (false, false) => Outcome::FalsePositive,
        }
    }
}

/// Running confusion counts over an evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive  => self.tp  += 1,
            Outcome::TrueNegative  => self.tn  += 1,
            Outcome::FalsePositive => self.fp  += 1,
            Outcome::FalseNegative => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn scores(&self) -> Scores {
        let tp = self.tp as f64;
        let fp = self.fp as f64;
        let tn = self.tn as f64;
        let fn_ = self.fn_ as f64;

        let precision = tp / (tp + fp + METRIC_EPSILON);
        let recall    = tp / (tp + fn_ + METRIC_EPSILON);
        let accuracy  = (tp + tn) / (tp + fp + tn + fn_ + METRIC_EPSILON);
        let f1        = 2.0 * precision * recall / (precision + recall + METRIC_EPSILON);

        Scores { f1, precision, recall, accuracy }
    }
}

/// The four sentence-level metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub f1:        f64,
    pub precision: f64,
    pub recall:    f64,
    pub accuracy:  f64,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_metric_identities() {
        let c = Confusion { tp: 3, fp: 1, fn_: 2, tn: 4 };
        let s = c.scores();
        assert!(close(s.precision, 0.75));
        assert!(close(s.recall, 0.6));
        assert!(close(s.accuracy, 0.7));
        assert!(close(s.f1, 0.667));
    }

    #[test]
    fn test_empty_counts_are_finite() {
        let s = Confusion::default().scores();
        assert!(s.f1.is_finite());
        assert!(s.precision.is_finite());
        assert!(s.recall.is_finite());
        assert!(s.accuracy.is_finite());
        assert_eq!(s.f1, 0.0);
    }

    #[test]
    fn test_classify_covers_all_cells() {
        assert_eq!(Outcome::classify("a", "a", true),  Outcome::TruePositive);
        assert_eq!(Outcome::classify("a", "a", false), Outcome::TrueNegative);
        assert_eq!(Outcome::classify("a", "b", true),  Outcome::FalseNegative);
        assert_eq!(Outcome::classify("a", "b", false), Outcome::FalsePositive);
    }

    #[test]
    fn test_record_accumulates() {
        let mut c = Confusion::default();
        c.record(Outcome::TruePositive);
        c.record(Outcome::TruePositive);
        c.record(Outcome::FalsePositive);
        assert_eq!(c.tp, 2);
        assert_eq!(c.fp, 1);
        assert_eq!(c.total(), 3);
    }
}
