// ============================================================
// Layer 3 — Sample and Mistake Domain Types
// ============================================================
// A Sample is one sentence from an annotated corpus:
//   - the raw (possibly wrong) text
//   - a list of mistakes, each pointing at one character
//
// Mistake locations are 1-based and count the synthetic [CLS]
// token as position 0, so `loc` is also the token position in
// the encoded sequence:
//
//   text:      他 是 我 朋 有
//   position:  1  2  3  4  5      ([CLS] = 0, [SEP] = 6)
//   mistake:   { loc: 5, wrong: "有", correct: "友" }
//
// Reference: Zhang et al. (2020) Spelling Error Correction
//            with Soft-Masked BERT

use serde::{Deserialize, Deserializer, Serialize};

/// One character-level correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    /// Token position of the character (1-based, [CLS] = 0)
    #[serde(deserialize_with = "deserialize_loc")]
    pub loc: usize,

    /// The character found in the text
    pub wrong: String,

    /// The character that should be there
    pub correct: String,
}

impl Mistake {
    pub fn new(loc: usize, wrong: impl Into<String>, correct: impl Into<String>) -> Self {
        Self {
            loc,
            wrong:   wrong.into(),
            correct: correct.into(),
        }
    }
}

/// Corpora write `loc` either as a number or as a numeric string.
fn deserialize_loc<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loc {
        Number(usize),
        Text(String),
    }

    match Loc::deserialize(deserializer)? {
        Loc::Number(n) => Ok(n),
        Loc::Text(s)   => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// An annotated sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub text: String,

    #[serde(default)]
    pub mistakes: Vec<Mistake>,
}

impl Sample {
    pub fn new(text: impl Into<String>, mistakes: Vec<Mistake>) -> Self {
        Self { text: text.into(), mistakes }
    }

    /// A sample with no annotations, used for plain inference
    pub fn unannotated(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// The text split into one String per character.
    /// Strings rather than chars because a decoded position may
    /// become a multi-character sentinel such as "[OOV]".
    pub fn chars(&self) -> Vec<String> {
        self.text.chars().map(String::from).collect()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True when the sample carries at least one annotated mistake
    pub fn is_positive(&self) -> bool {
        !self.mistakes.is_empty()
    }

    /// Copy of this sample keeping only the mistakes a model with an
    /// encoded length of `seq_len` can see.
    ///
    /// A mistake is dropped when `loc >= seq_len`, or when its location
    /// does not name a character of the text at all. Applying this twice
    /// gives the same result as applying it once.
    pub fn visible_to(&self, seq_len: usize) -> Sample {
        let char_count = self.char_count();
        let mistakes = self
            .mistakes
            .iter()
            .filter(|m| m.loc >= 1 && m.loc < seq_len && m.loc <= char_count)
            .cloned()
            .collect();
        Sample { text: self.text.clone(), mistakes }
    }

    /// The text with every annotated mistake applied.
    /// Mistakes outside the text are ignored.
    pub fn corrected_text(&self) -> String {
        let mut chars = self.chars();
        for m in &self.mistakes {
            if let Some(slot) = m.loc.checked_sub(1).and_then(|i| chars.get_mut(i)) {
                *slot = m.correct.clone();
            }
        }
        chars.concat()
    }
}

/// The decoded result for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// The sentence the model produced
    pub predict: String,

    /// The ground-truth corrected sentence
    pub correct: String,

    /// Positions where the model changed the input
    pub mistakes: Vec<Mistake>,
}
