// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Sentence-level evaluation over a held-out set:
//
//   for each sample
//     prune mistakes the model cannot see   (Sample::visible_to)
//     decode                                (SpellingCorrector)
//     classify TP / TN / FP / FN            (exact sentence match)
//     write one JSON line
//
// The prediction file is truncated at the start of every pass.
// Samples are decoded one at a time.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::domain::evaluation::{Confusion, Outcome, Scores};
use crate::domain::sample::{Mistake, Sample};
use crate::domain::traits::SpellingCorrector;
use crate::infra::progress::progress_bar;

/// One line of the prediction file
#[derive(Debug, Serialize)]
struct PredictionRecord<'a> {
    text:     &'a str,
    new_text: &'a str,
    mistakes: &'a [Mistake],
    predict:  &'a [Mistake],
}

pub struct Evaluator {
    output_path:   PathBuf,
    show_progress: bool,
}

impl Evaluator {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self { output_path: output_path.into(), show_progress: true }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn evaluate<C: SpellingCorrector>(&self, corrector: &C, samples: &[Sample]) -> Result<Scores> {
        let file = File::create(&self.output_path).with_context(|| {
            format!("Cannot write predictions to '{}'", self.output_path.display())
        })?;
        let mut out = BufWriter::new(file);

        let pb = progress_bar(samples.len() as u64, "evaluating", self.show_progress)?;
        let mut confusion = Confusion::default();

        for sample in samples {
            let visible    = sample.visible_to(corrector.seq_len());
            let prediction = corrector.extract(&visible)?;

            let outcome = Outcome::classify(&prediction.predict, &prediction.correct, visible.is_positive());
            confusion.record(outcome);

            let record = PredictionRecord {
                text:     &visible.text,
                new_text: &prediction.predict,
                mistakes: &visible.mistakes,
                predict:  &prediction.mistakes,
            };
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        out.flush()
            .with_context(|| format!("Cannot flush '{}'", self.output_path.display()))?;

        let scores = confusion.scores();
        tracing::info!(
            "Evaluated {} samples (tp={} fp={} tn={} fn={}): f1={:.4} precision={:.4} recall={:.4} accuracy={:.4}",
            confusion.total(), confusion.tp, confusion.fp, confusion.tn, confusion.fn_,
            scores.f1, scores.precision, scores.recall, scores.accuracy,
        );
        Ok(scores)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Prediction;
    use std::fs;

    /// Applies a fixed substitution table, character by character
    struct TableCorrector {
        fixes:   Vec<(char, char)>,
        seq_len: usize,
    }

    impl SpellingCorrector for TableCorrector {
        fn extract(&self, sample: &Sample) -> Result<Prediction> {
            let mut mistakes = Vec::new();
            let predict: String = sample
                .text
                .chars()
                .enumerate()
                .map(|(i, c)| match self.fixes.iter().find(|(from, _)| *from == c) {
                    Some(&(from, to)) => {
                        mistakes.push(Mistake::new(i + 1, from.to_string(), to.to_string()));
                        to
                    }
                    None => c,
                })
                .collect();
            let correct = sample.visible_to(self.seq_len).corrected_text();
            Ok(Prediction { predict, correct, mistakes })
        }

        fn seq_len(&self) -> usize {
            self.seq_len
        }
    }

    fn corrector() -> TableCorrector {
        TableCorrector { fixes: vec![('有', '友')], seq_len: 16 }
    }

    #[test]
    fn test_unchanged_clean_sentence_is_true_negative() {
        let dir  = tempfile::tempdir().unwrap();
        let eval = Evaluator::new(dir.path().join("pred.jsonl")).with_progress(false);

        let scores = eval.evaluate(&corrector(), &[Sample::unannotated("他是我朋友")]).unwrap();
        assert!(scores.accuracy > 0.999);
        assert!(scores.f1 < 1e-6);
    }

    #[test]
    fn test_fixed_mistake_is_true_positive() {
        let dir  = tempfile::tempdir().unwrap();
        let eval = Evaluator::new(dir.path().join("pred.jsonl")).with_progress(false);

        let sample = Sample::new("他是我朋有", vec![Mistake::new(5, "有", "友")]);
        let scores = eval.evaluate(&corrector(), &[sample]).unwrap();
        assert!((scores.precision - 1.0).abs() < 1e-6);
        assert!((scores.recall - 1.0).abs() < 1e-6);
        assert!((scores.f1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missed_and_spurious_corrections() {
        let dir  = tempfile::tempdir().unwrap();
        let eval = Evaluator::new(dir.path().join("pred.jsonl")).with_progress(false);

        let samples = vec![
            // Needs 的 → 好, which the table cannot do: false negative
            Sample::new("他是我的朋友", vec![Mistake::new(4, "的", "好")]),
            // Clean but the table rewrites 有: false positive
            Sample::unannotated("我有朋友"),
        ];
        let scores = eval.evaluate(&corrector(), &samples).unwrap();
        assert!(scores.precision < 1e-6);
        assert!(scores.recall < 1e-6);
        assert!(scores.accuracy < 1e-6);
    }

    #[test]
    fn test_prediction_file_is_overwritten_each_pass() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("pred.jsonl");
        let eval = Evaluator::new(&path).with_progress(false);

        let samples = vec![
            Sample::new("他是我朋有", vec![Mistake::new(5, "有", "友")]),
            Sample::unannotated("他是我朋友"),
        ];
        eval.evaluate(&corrector(), &samples).unwrap();
        eval.evaluate(&corrector(), &samples[..1]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["text"], "他是我朋有");
        assert_eq!(record["new_text"], "他是我朋友");
        assert_eq!(record["mistakes"][0]["loc"], 5);
        assert_eq!(record["predict"][0]["correct"], "友");
    }

    #[test]
    fn test_out_of_range_mistakes_are_pruned_before_scoring() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("pred.jsonl");
        let eval = Evaluator::new(&path).with_progress(false);

        // seq_len 4 hides loc 5, so the sample counts as clean
        let short  = TableCorrector { fixes: vec![], seq_len: 4 };
        let sample = Sample::new("他是我朋有", vec![Mistake::new(5, "有", "友")]);
        let scores = eval.evaluate(&short, std::slice::from_ref(&sample)).unwrap();

        assert!(scores.accuracy > 0.999);
        assert_eq!(sample.mistakes.len(), 1);

        let record: serde_json::Value =
            serde_json::from_str(fs::read_to_string(&path).unwrap().trim()).unwrap();
        assert_eq!(record["mistakes"].as_array().unwrap().len(), 0);
    }
}
