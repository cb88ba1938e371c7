// ============================================================
// Layer 5 — Detection Subnetwork
// ============================================================
// Bidirectional GRU over the input embeddings, then a dense layer
// with a sigmoid: one error probability per position.
//
//   h_fwd = GRU_fwd(e[0..n])
//   h_bwd = reverse(GRU_bwd(reverse(e[0..n])))
//   p     = σ(W · [h_fwd ; h_bwd] + b)
//
// The backward pass reverses each row only inside its valid
// length, so padding is read after the real tokens in both
// directions and never leaks into their states:
//
//   row:      [CLS] 他 是 [SEP] [PAD] [PAD]
//   reversed: [SEP] 是 他 [CLS] [PAD] [PAD]
//
// Reference: Zhang et al. (2020) Soft-Masked BERT, §2.2

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

#[derive(Config, Debug)]
pub struct DetectorConfig {
    /// Embedding width fed to the GRUs
    pub d_input: usize,
    /// Hidden width per direction
    #[config(default = 256)]
    pub d_hidden: usize,
}

impl DetectorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Detector<B> {
        Detector {
            forward_gru:  GruConfig::new(self.d_input, self.d_hidden, true).init(device),
            backward_gru: GruConfig::new(self.d_input, self.d_hidden, true).init(device),
            output:       LinearConfig::new(self.d_hidden * 2, 1).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Detector<B: Backend> {
    pub forward_gru:  Gru<B>,
    pub backward_gru: Gru<B>,
    pub output:       Linear<B>,
}

impl<B: Backend> Detector<B> {
    /// embeddings: [batch, seq_len, d_input], mask: [batch, seq_len]
    /// → error probabilities [batch, seq_len] in [0, 1]
    pub fn forward(&self, embeddings: Tensor<B, 3>, mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, seq_len, _] = embeddings.dims();

        let forward = self.forward_gru.forward(embeddings.clone(), None);

        // Reversal is its own inverse, so one index does both directions
        let reverse  = reverse_within_length(mask);
        let backward = self.backward_gru.forward(gather_positions(embeddings, reverse.clone()), None);
        let backward = gather_positions(backward, reverse);

        let hidden = Tensor::cat(vec![forward, backward], 2);
        sigmoid(self.output.forward(hidden)).reshape([batch_size, seq_len])
    }
}

/// Per-row index that reverses positions [0, len) and leaves padding in place.
fn reverse_within_length<B: Backend>(mask: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
    let [batch_size, seq_len] = mask.dims();
    let lengths = mask.clone().sum_dim(1).expand([batch_size, seq_len]);
    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &mask.device())
        .unsqueeze::<2>()
        .expand([batch_size, seq_len]);

    let inside   = positions.clone().lower(lengths.clone());
    let mirrored = lengths.sub_scalar(1) - positions.clone();
    positions.mask_where(inside, mirrored)
}

/// out[b, t, :] = x[b, index[b, t], :]
fn gather_positions<B: Backend>(x: Tensor<B, 3>, index: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [batch_size, seq_len, width] = x.dims();
    let index = index.unsqueeze_dim::<3>(2).expand([batch_size, seq_len, width]);
    x.gather(1, index)
}
