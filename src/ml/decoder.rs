// ============================================================
// Layer 5 — Decoder
// ============================================================
// Turns the head's per-position argmax into a sentence and a
// mistake list. For each character position i in 1..num_chars
// (num_chars = valid length - 1, so [SEP] is skipped):
//
//   argmax == OOV
//     input id inside CharRange  → mistake, character becomes "[OOV]"
//     input id outside CharRange → unchanged (an OOV input predicted
//                                  as OOV is not an error)
//   argmax == class c
//     start + c != input id      → mistake, character replaced
//     otherwise                  → unchanged
//
// Position i is text character i - 1, because position 0 is [CLS].
// Characters past the truncated sequence are copied through as-is.

use crate::data::vocab::{CharRange, Vocabulary, OOV_SENTINEL};
use crate::domain::sample::Mistake;

/// Decode one sequence.
///
/// `classes` holds the argmax head class per position and must be
/// as long as `token_ids` and `mask`.
pub fn decode(
    text:      &str,
    token_ids: &[u32],
    mask:      &[u32],
    classes:   &[usize],
    vocab:     &Vocabulary,
    range:     CharRange,
) -> (String, Vec<Mistake>) {
    let mut chars: Vec<String> = text.chars().map(String::from).collect();
    let mut mistakes = Vec::new();

    let valid     = mask.iter().filter(|&&m| m == 1).count();
    let num_chars = valid.saturating_sub(1);

    for i in 1..num_chars {
        let input_id = token_ids[i];
        let wrong    = vocab.token_or_unk(input_id);

        let replacement = match range.token_id_of(classes[i]) {
            None if range.contains(input_id) => Some(OOV_SENTINEL.to_string()),
            None => None,
            Some(predicted) if predicted != input_id => Some(vocab.token_or_unk(predicted)),
            Some(_) => None,
        };

        if let Some(correct) = replacement {
            mistakes.push(Mistake::new(i, wrong, correct.clone()));
            if let Some(slot) = chars.get_mut(i - 1) {
                *slot = correct;
            }
        }
    }

    (chars.concat(), mistakes)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::SampleEncoder;
    use crate::data::vocab::tests::test_vocab;
    use crate::domain::sample::Sample;

    // Test vocabulary block: 他 7, 是 8, 我 9, 朋 10, 友 11, 有 12, 的 13, 好 14
    fn setup(text: &str) -> (Vocabulary, CharRange, Vec<u32>, Vec<u32>) {
        let vocab   = test_vocab();
        let range   = CharRange::detect(&vocab).unwrap();
        let encoder = SampleEncoder::new(vocab.clone(), range, 10).unwrap();
        let encoded = encoder.encode(&Sample::unannotated(text));
        (vocab, range, encoded.token_ids, encoded.mask)
    }

    /// Head classes that reproduce the input exactly
    fn identity(ids: &[u32], range: CharRange) -> Vec<usize> {
        ids.iter().map(|&id| range.class_of(id)).collect()
    }

    #[test]
    fn test_identity_prediction_has_no_mistakes() {
        let (vocab, range, ids, mask) = setup("他是我朋友");
        let (text, mistakes) = decode("他是我朋友", &ids, &mask, &identity(&ids, range), &vocab, range);

        assert_eq!(text, "他是我朋友");
        assert!(mistakes.is_empty());
    }

    #[test]
    fn test_substitution_is_recorded() {
        let (vocab, range, ids, mask) = setup("他是我朋有");
        let mut classes = identity(&ids, range);
        classes[5] = range.class_of(11); // 有 → 友

        let (text, mistakes) = decode("他是我朋有", &ids, &mask, &classes, &vocab, range);
        assert_eq!(text, "他是我朋友");
        assert_eq!(mistakes, vec![Mistake::new(5, "有", "友")]);
    }

    #[test]
    fn test_oov_prediction_for_in_range_char_is_a_mistake() {
        let (vocab, range, ids, mask) = setup("他是");
        let mut classes = identity(&ids, range);
        classes[2] = range.oov_class();

        let (text, mistakes) = decode("他是", &ids, &mask, &classes, &vocab, range);
        assert_eq!(text, "他[OOV]");
        assert_eq!(mistakes, vec![Mistake::new(2, "是", OOV_SENTINEL)]);
    }

    #[test]
    fn test_oov_prediction_for_out_of_range_char_is_kept() {
        // "a" and "!" are outside the CJK block, so identity maps them to OOV
        let (vocab, range, ids, mask) = setup("a他!");
        let (text, mistakes) = decode("a他!", &ids, &mask, &identity(&ids, range), &vocab, range);

        assert_eq!(text, "a他!");
        assert!(mistakes.is_empty());
    }

    #[test]
    fn test_unknown_char_renders_unk_in_mistake() {
        // 龍 is not in the vocabulary, so its input id is [UNK]
        let (vocab, range, ids, mask) = setup("龍");
        let mut classes = identity(&ids, range);
        classes[1] = range.class_of(14);

        let (text, mistakes) = decode("龍", &ids, &mask, &classes, &vocab, range);
        assert_eq!(text, "好");
        assert_eq!(mistakes[0].wrong, "[UNK]");
    }

    #[test]
    fn test_text_past_truncation_is_copied_through() {
        // seq_len 10 leaves room for 8 characters
        let text = "他是我朋友他是我朋友";
        let (vocab, range, ids, mask) = setup(text);
        let mut classes = identity(&ids, range);
        classes[8] = range.class_of(14);

        let (decoded, mistakes) = decode(text, &ids, &mask, &classes, &vocab, range);
        assert_eq!(decoded, "他是我朋友他是好朋友");
        assert_eq!(mistakes.len(), 1);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let (vocab, range, ids, mask) = setup("他是我朋有");
        let mut classes = identity(&ids, range);
        classes[3] = range.oov_class();

        let first  = decode("他是我朋有", &ids, &mask, &classes, &vocab, range);
        let second = decode("他是我朋有", &ids, &mask, &classes, &vocab, range);
        assert_eq!(first, second);
    }
}
