// ============================================================
// Layer 4 — CSC Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<EncodedSample>
// into tensors of shape [batch_size, seq_len].
//
// Every EncodedSample is already padded to seq_len, so batching
// is flatten-then-reshape:
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::encoder::EncodedSample;

/// A batch ready for the joint training forward pass.
#[derive(Debug, Clone)]
pub struct CscBatch<B: Backend> {
    /// Input character ids — [batch, seq_len]
    pub token_ids: Tensor<B, 2, Int>,

    /// Segment ids, all zero for single sentences — [batch, seq_len]
    pub segment_ids: Tensor<B, 2, Int>,

    /// 1 = [CLS] / character / [SEP], 0 = padding — [batch, seq_len]
    pub mask: Tensor<B, 2, Int>,

    /// Correction head class per position — [batch, seq_len]
    pub char_labels: Tensor<B, 2, Int>,

    /// 1.0 where the input character is wrong — [batch, seq_len]
    pub mistake_labels: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct CscBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> CscBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn int_tensor(&self, rows: &[&[u32]], seq_len: usize) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = rows
            .iter()
            .flat_map(|row| row.iter().map(|&x| x as i32))
            .collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([rows.len(), seq_len])
    }
}

impl<B: Backend> Batcher<EncodedSample, CscBatch<B>> for CscBatcher<B> {
    fn batch(&self, items: Vec<EncodedSample>) -> CscBatch<B> {
        let batch_size = items.len();
        let seq_len    = items[0].token_ids.len();

        let token_ids   = self.int_tensor(&column(&items, |s| s.token_ids.as_slice()),   seq_len);
        let segment_ids = self.int_tensor(&column(&items, |s| s.segment_ids.as_slice()), seq_len);
        let mask        = self.int_tensor(&column(&items, |s| s.mask.as_slice()),        seq_len);
        let char_labels = self.int_tensor(&column(&items, |s| s.char_labels.as_slice()), seq_len);

        let mistake_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.mistake_labels.iter().copied())
            .collect();
        let mistake_labels = Tensor::<B, 1>::from_floats(mistake_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        CscBatch { token_ids, segment_ids, mask, char_labels, mistake_labels }
    }
}

fn column<'a>(
    items: &'a [EncodedSample],
    field: impl Fn(&'a EncodedSample) -> &'a [u32],
) -> Vec<&'a [u32]> {
    items.iter().map(field).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn item(token: u32) -> EncodedSample {
        EncodedSample {
            token_ids:      vec![2, token, 3, 0],
            segment_ids:    vec![0; 4],
            mask:           vec![1, 1, 1, 0],
            char_labels:    vec![9, 1, 9, 9],
            mistake_labels: vec![0.0, 1.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = CscBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(vec![item(7), item(8), item(9)]);

        assert_eq!(batch.token_ids.dims(), [3, 4]);
        assert_eq!(batch.mask.dims(), [3, 4]);
        assert_eq!(batch.mistake_labels.dims(), [3, 4]);
    }

    #[test]
    fn test_rows_keep_sample_order() {
        let batcher = CscBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(vec![item(7), item(8)]);

        let ids: Vec<i64> = batch.token_ids
            .into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(ids, vec![2, 7, 3, 0, 2, 8, 3, 0]);
    }
}
