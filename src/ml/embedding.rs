// ============================================================
// Layer 5 — Sequence Embedder and Soft-Mask Blender
// ============================================================
// BERT input embeddings are a sum of three lookups:
//
//   e[i] = token(id[i]) + segment(seg[i]) + position(i)
//
// Soft masking replaces only the token term. With p[i] the
// detector's error probability and m the [MASK] embedding:
//
//   t'[i] = p[i] · m + (1 - p[i]) · token(id[i])
//   e'[i] = t'[i] + segment(seg[i]) + position(i)
//
// so segment and position information is never masked.
// p = 0 gives the token embedding back exactly, p = 1 gives m.
//
// Reference: Zhang et al. (2020) Soft-Masked BERT, §2.3

use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
    },
    prelude::*,
};

#[derive(Config, Debug)]
pub struct BertEmbeddingsConfig {
    pub vocab_size:              usize,
    pub d_model:                 usize,
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl BertEmbeddingsConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertEmbeddings<B> {
        BertEmbeddings {
            token:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            segment:  EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device),
            position: EmbeddingConfig::new(self.max_position_embeddings, self.d_model).init(device),
            norm:     LayerNormConfig::new(self.d_model).with_epsilon(self.layer_norm_eps).init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Pretrained embedding tables plus the embedding LayerNorm.
#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub token:    Embedding<B>,
    pub segment:  Embedding<B>,
    pub position: Embedding<B>,
    pub norm:     LayerNorm<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> BertEmbeddings<B> {
    /// [batch, seq_len] → [batch, seq_len, d_model]
    pub fn tokens(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.token.forward(token_ids)
    }

    /// Add segment and absolute position embeddings to token embeddings
    pub fn compose(&self, token_emb: Tensor<B, 3>, segment_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len, _] = token_emb.dims();
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &token_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        token_emb + self.segment.forward(segment_ids) + self.position.forward(positions)
    }

    /// Dropout then LayerNorm, applied before the encoder stack only
    pub fn normalize(&self, embeddings: Tensor<B, 3>) -> Tensor<B, 3> {
        self.norm.forward(self.dropout.forward(embeddings))
    }

    /// Embedding of one token id as [1, 1, d_model], ready to broadcast
    pub fn single(&self, token_id: u32, device: &B::Device) -> Tensor<B, 3> {
        let id = Tensor::<B, 1, Int>::from_ints([token_id as i32], device).reshape([1, 1]);
        self.token.forward(id)
    }
}

/// Convex blend of token embeddings toward the mask embedding.
///
/// token_emb:  [batch, seq_len, d_model]
/// error_prob: [batch, seq_len], values in [0, 1]
/// mask_emb:   [1, 1, d_model]
pub fn soft_mask<B: Backend>(
    token_emb:  Tensor<B, 3>,
    error_prob: Tensor<B, 2>,
    mask_emb:   Tensor<B, 3>,
) -> Tensor<B, 3> {
    let dims = token_emb.dims();
    let p    = error_prob.unsqueeze_dim::<3>(2).expand(dims);
    let keep = p.clone().neg().add_scalar(1.0);

    p * mask_emb.expand(dims) + keep * token_emb
}
