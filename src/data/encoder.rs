// ============================================================
// Layer 4 — Sample Encoder
// ============================================================
// Turns one annotated Sample into fixed-length id sequences.
//
// Layout for seq_len = 8 and text "他是我朋有":
//
//   position:  0     1  2  3  4  5  6     7
//   token:     [CLS] 他 是 我 朋 有 [SEP] [PAD]
//   segment:   0     0  0  0  0  0  0     0
//   mask:      1     1  1  1  1  1  1     0
//
// Texts longer than seq_len - 2 characters are truncated.
//
// Training labels are built alongside:
//   char_labels[i]    — head class of the CORRECTED character at i
//   mistake_labels[i] — 1.0 where an annotated mistake sits, else 0.0
// [CLS], [SEP] and padding carry the OOV class and are masked
// out by the joint loss.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::vocab::{CharRange, Vocabulary};
use crate::domain::sample::Sample;

/// One sample as fixed-length sequences, ready for batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedSample {
    pub token_ids:      Vec<u32>,
    pub segment_ids:    Vec<u32>,
    pub mask:           Vec<u32>,
    pub char_labels:    Vec<u32>,
    pub mistake_labels: Vec<f32>,
}

impl EncodedSample {
    /// Number of valid positions, including [CLS] and [SEP]
    pub fn valid_len(&self) -> usize {
        self.mask.iter().filter(|&&m| m == 1).count()
    }
}

#[derive(Debug, Clone)]
pub struct SampleEncoder {
    vocab:   Vocabulary,
    range:   CharRange,
    seq_len: usize,
}

impl SampleEncoder {
    pub fn new(vocab: Vocabulary, range: CharRange, seq_len: usize) -> Result<Self> {
        if seq_len < 2 {
            bail!("seq_len is {seq_len}, it must leave room for [CLS] and [SEP]");
        }
        Ok(Self { vocab, range, seq_len })
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn range(&self) -> CharRange {
        self.range
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn encode(&self, sample: &Sample) -> EncodedSample {
        let max_chars = self.seq_len - 2;
        let oov       = self.range.oov_class() as u32;

        let mut token_ids      = Vec::with_capacity(self.seq_len);
        let mut char_labels    = Vec::with_capacity(self.seq_len);
        let mut mistake_labels = vec![0.0f32; self.seq_len];

        // ── Input ids from the text as written ────────────────────────────────
        token_ids.push(self.vocab.cls_id());
        token_ids.extend(sample.text.chars().take(max_chars).map(|c| self.vocab.char_id(c)));
        token_ids.push(self.vocab.sep_id());

        // ── Labels from the text with mistakes applied ────────────────────────
        let mut corrected: Vec<u32> = token_ids.clone();
        for m in &sample.mistakes {
            // Only positions between [CLS] and [SEP] can carry a label
            if m.loc == 0 || m.loc >= token_ids.len() - 1 {
                continue;
            }
            let mut chars = m.correct.chars();
            let correct_id = match (chars.next(), chars.next()) {
                (Some(c), None) => self.vocab.char_id(c),
                _ => self.vocab.id(&m.correct).unwrap_or(self.vocab.unk_id()),
            };
            corrected[m.loc]      = correct_id;
            mistake_labels[m.loc] = 1.0;
        }

        char_labels.push(oov);
        char_labels.extend(
            corrected[1..corrected.len() - 1]
                .iter()
                .map(|&id| self.range.class_of(id) as u32),
        );
        char_labels.push(oov);

        // ── Pad to seq_len ────────────────────────────────────────────────────
        let valid = token_ids.len();
        let mut mask = vec![1u32; valid];
        token_ids.resize(self.seq_len, self.vocab.pad_id());
        char_labels.resize(self.seq_len, oov);
        mask.resize(self.seq_len, 0);

        EncodedSample {
            token_ids,
            segment_ids: vec![0; self.seq_len],
            mask,
            char_labels,
            mistake_labels,
        }
    }
}
