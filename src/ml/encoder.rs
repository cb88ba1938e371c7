// ============================================================
// Layer 5 — Correction Encoder (BERT layer stack)
// ============================================================
// Post-norm transformer blocks, the layout pretrained BERT
// checkpoints use:
//
//   x = LayerNorm(x + Dropout(SelfAttention(x)))
//   x = LayerNorm(x + Dropout(W2 · act(W1 · x)))
//
// Padding positions are excluded from attention through the
// pad mask (true = padding).
//
// Reference: Vaswani et al. (2017), Devlin et al. (2019)

use burn::{
    module::Ignored,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};
use serde::{Deserialize, Serialize};

/// Feed-forward activation named by the pretrained config (`hidden_act`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenAct {
    Gelu,
    Relu,
    Tanh,
}

impl HiddenAct {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            HiddenAct::Gelu => activation::gelu(x),
            HiddenAct::Relu => activation::relu(x),
            HiddenAct::Tanh => activation::tanh(x),
        }
    }
}

#[derive(Config, Debug)]
pub struct BertEncoderConfig {
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
    pub activation: HiddenAct,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl BertEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let layers = (0..self.num_layers)
            .map(|_| self.build_block(device))
            .collect();
        BertEncoder { layers }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1 = LayerNormConfig::new(self.d_model).with_epsilon(self.layer_norm_eps).init(device);
        let norm2 = LayerNormConfig::new(self.d_model).with_epsilon(self.layer_norm_eps).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock {
            self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout,
            activation: Ignored(self.activation),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
    pub activation:  Ignored<HiddenAct>,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            self.activation.apply(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// The pretrained layer stack. Kept as its own module so its
/// record can be loaded from a converted BERT checkpoint.
#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub layers: Vec<EncoderBlock<B>>,
}

impl<B: Backend> BertEncoder<B> {
    /// x: [batch, seq_len, d_model], pad_mask: [batch, seq_len] → same shape as x
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        self.layers
            .iter()
            .fold(x, |x, layer| layer.forward(x, pad_mask.clone()))
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}
