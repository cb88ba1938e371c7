// ============================================================
// Layer 4 — Vocabulary and Correction Character Range
// ============================================================
// Vocabulary:
//   A bidirectional token ↔ id mapping read from a BERT vocab.txt
//   (one token per line, id = line index). Chinese BERT vocabularies
//   hold every common character as its own token, so text is
//   tokenised one character at a time and token position i is
//   always character i-1 of the text.
//
// CharRange:
//   The correction head does not predict over the full vocabulary.
//   It predicts over one contiguous block of ids (the common CJK
//   characters) plus one extra "out of vocabulary" class:
//
//     class 0 ..= end-start   ↔   id start ..= end
//     class end-start+1       =   OOV
//
// Reference: Devlin et al. (2019) BERT, Chinese vocabulary

use anyhow::{bail, Context, Result};
use std::{collections::HashMap, path::Path};
use tokenizers::models::wordpiece::WordPiece;

pub const PAD_TOKEN:  &str = "[PAD]";
pub const UNK_TOKEN:  &str = "[UNK]";
pub const MASK_TOKEN: &str = "[MASK]";
pub const CLS_TOKEN:  &str = "[CLS]";
pub const SEP_TOKEN:  &str = "[SEP]";

/// Rendered in place of a character the model maps to the OOV class
pub const OOV_SENTINEL: &str = "[OOV]";

/// Token ↔ id mapping. Immutable once built.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    token_to_id: HashMap<String, u32>,
    id_to_token: Vec<String>,
    pad_id:  u32,
    unk_id:  u32,
    mask_id: u32,
    cls_id:  u32,
    sep_id:  u32,
}

impl Vocabulary {
    /// Read a BERT-style vocab.txt
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .with_context(|| format!("Vocabulary path '{}' is not UTF-8", path.display()))?;

        let token_to_id = WordPiece::read_file(path_str)
            .map_err(|e| anyhow::anyhow!("Cannot read vocabulary '{}': {e}", path.display()))?;

        let vocab = Self::from_map(token_to_id)?;
        tracing::info!("Loaded vocabulary: {} tokens from '{}'", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Build from tokens in id order
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = tokens
            .into_iter()
            .enumerate()
            .map(|(id, t)| (t.into(), id as u32))
            .collect();
        Self::from_map(map)
    }

    fn from_map(token_to_id: HashMap<String, u32>) -> Result<Self> {
        let size = token_to_id.values().max().map_or(0, |&m| m as usize + 1);
        let mut id_to_token = vec![String::new(); size];
        for (token, &id) in &token_to_id {
            id_to_token[id as usize] = token.clone();
        }

        let reserved = |name: &str| -> Result<u32> {
            match token_to_id.get(name) {
                Some(&id) => Ok(id),
                None => bail!("Vocabulary is missing the reserved token {name}"),
            }
        };

        Ok(Self {
            pad_id:  reserved(PAD_TOKEN)?,
            unk_id:  reserved(UNK_TOKEN)?,
            mask_id: reserved(MASK_TOKEN)?,
            cls_id:  reserved(CLS_TOKEN)?,
            sep_id:  reserved(SEP_TOKEN)?,
            token_to_id,
            id_to_token,
        })
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.id_to_token
            .get(id as usize)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Token text for an id, or the [UNK] sentinel on a miss
    pub fn token_or_unk(&self, id: u32) -> String {
        self.token(id).unwrap_or(UNK_TOKEN).to_string()
    }

    /// Id of one character: exact match, then the lowercase form
    /// (Chinese BERT vocabularies are uncased), else [UNK].
    pub fn char_id(&self, c: char) -> u32 {
        let mut buf = [0u8; 4];
        if let Some(id) = self.id(c.encode_utf8(&mut buf)) {
            return id;
        }
        c.to_lowercase()
            .next()
            .and_then(|lower| self.id(lower.encode_utf8(&mut buf)))
            .unwrap_or(self.unk_id)
    }

    pub fn pad_id(&self)  -> u32 { self.pad_id }
    pub fn unk_id(&self)  -> u32 { self.unk_id }
    pub fn mask_id(&self) -> u32 { self.mask_id }
    pub fn cls_id(&self)  -> u32 { self.cls_id }
    pub fn sep_id(&self)  -> u32 { self.sep_id }
}

// ─── CharRange ────────────────────────────────────────────────────────────────
/// Inclusive id block the correction head predicts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CharRange {
    pub start: u32,
    pub end:   u32,
}

impl CharRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start > end {
            bail!("Character range start ({start}) is after its end ({end})");
        }
        Ok(Self { start, end })
    }

    /// Find the longest contiguous run of single-CJK-ideograph tokens.
    pub fn detect(vocab: &Vocabulary) -> Result<Self> {
        let mut best: Option<(u32, u32)> = None;
        let mut run_start: Option<u32> = None;

        for id in 0..=vocab.len() as u32 {
            let is_cjk = id < vocab.len() as u32
                && vocab.token(id).is_some_and(is_single_cjk_ideograph);

            match (is_cjk, run_start) {
                (true, None) => run_start = Some(id),
                (false, Some(start)) => {
                    let end = id - 1;
                    if best.map_or(true, |(s, e)| end - start > e - s) {
                        best = Some((start, end));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }

        match best {
            Some((start, end)) => {
                tracing::info!(
                    "Detected CJK character block: ids {}..={} ({} characters)",
                    start, end, end - start + 1
                );
                Self::new(start, end)
            }
            None => bail!("Vocabulary holds no CJK character block; pass --char-start/--char-end"),
        }
    }

    /// Number of head outputs: every character in range plus OOV
    pub fn num_classes(&self) -> usize {
        (self.end - self.start) as usize + 2
    }

    pub fn oov_class(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.start..=self.end).contains(&id)
    }

    /// Head class of a vocabulary id (OOV when outside the block)
    pub fn class_of(&self, id: u32) -> usize {
        if self.contains(id) {
            (id - self.start) as usize
        } else {
            self.oov_class()
        }
    }

    /// Vocabulary id of a head class, None for OOV or out of bounds
    pub fn token_id_of(&self, class: usize) -> Option<u32> {
        if class < self.oov_class() {
            Some(self.start + class as u32)
        } else {
            None
        }
    }
}

fn is_single_cjk_ideograph(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => is_cjk_ideograph(c),
        _ => false,
    }
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B820..=0x2CEAF
        | 0xF900..=0xFAFF
        | 0x2F800..=0x2FA1F)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small vocabulary used across the crate's tests.
    /// ids: 0 [PAD], 1 [UNK], 2 [CLS], 3 [SEP], 4 [MASK], 5 "a", 6 "!",
    ///      7.. CJK block, then "b"
    pub(crate) fn test_vocab() -> Vocabulary {
        let mut tokens = vec!["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "a", "!"];
        tokens.extend(["他", "是", "我", "朋", "友", "有", "的", "好"]);
        tokens.push("b");
        Vocabulary::from_tokens(tokens).unwrap()
    }

    #[test]
    fn test_reserved_ids() {
        let v = test_vocab();
        assert_eq!(v.pad_id(), 0);
        assert_eq!(v.unk_id(), 1);
        assert_eq!(v.cls_id(), 2);
        assert_eq!(v.sep_id(), 3);
        assert_eq!(v.mask_id(), 4);
    }

    #[test]
    fn test_missing_reserved_token_fails() {
        assert!(Vocabulary::from_tokens(["[PAD]", "[UNK]", "他"]).is_err());
    }

    #[test]
    fn test_char_id_lowercase_fallback_and_unk() {
        let v = test_vocab();
        assert_eq!(v.char_id('a'), 5);
        assert_eq!(v.char_id('A'), 5);
        assert_eq!(v.char_id('龍'), v.unk_id());
    }

    #[test]
    fn test_token_miss_renders_unk() {
        let v = test_vocab();
        assert_eq!(v.token_or_unk(9999), UNK_TOKEN);
    }

    #[test]
    fn test_detect_finds_cjk_block() {
        let r = CharRange::detect(&test_vocab()).unwrap();
        assert_eq!(r, CharRange { start: 7, end: 14 });
    }

    #[test]
    fn test_class_mapping_is_bijective_with_one_oov() {
        let r = CharRange::new(670, 7991).unwrap();
        assert_eq!(r.oov_class(), 7991 - 670 + 1);
        assert_eq!(r.num_classes(), 7991 - 670 + 2);

        for class in 0..r.oov_class() {
            let id = r.token_id_of(class).unwrap();
            assert!(r.contains(id));
            assert_eq!(r.class_of(id), class);
        }
        assert_eq!(r.token_id_of(r.oov_class()), None);
        assert_eq!(r.class_of(669), r.oov_class());
        assert_eq!(r.class_of(7992), r.oov_class());
    }

    #[test]
    fn test_from_file_reads_vocab_txt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\n他\n是\n").unwrap();

        let v = Vocabulary::from_file(&path).unwrap();
        assert_eq!(v.len(), 7);
        assert_eq!(v.id("是"), Some(6));
        assert_eq!(v.token(5), Some("他"));
    }
}
