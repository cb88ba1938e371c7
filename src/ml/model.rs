// ============================================================
// Layer 5 — Soft-Masked BERT
// ============================================================
// The joint detection/correction network:
//
//   ids ──► token emb ──┬──► + seg + pos = e ──► Detector ──► p
//                       │                   │                 │
//                       └──► soft_mask(·, p, [MASK]) ◄────────┘
//                                  │        │
//                                  ▼        │
//                        + seg + pos, Norm  │
//                                  │        │
//                                  ▼        │
//                            BERT encoder   │
//                                  │        │
//                                  ▼        ▼
//                                h   +   e   (residual)
//                                  │
//                                  ▼
//                     Linear → logits over CharRange + OOV
//
// The residual adds the UN-blended embedding e, not the soft-masked one.
//
// Reference: Zhang et al. (2020) Soft-Masked BERT

use anyhow::{bail, Result};
use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::data::vocab::CharRange;
use crate::ml::detector::{Detector, DetectorConfig};
use crate::ml::embedding::{soft_mask, BertEmbeddings, BertEmbeddingsConfig};
use crate::ml::encoder::{BertEncoder, BertEncoderConfig, HiddenAct};

#[derive(Config, Debug)]
pub struct SoftMaskedBertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_layers:              usize,
    pub num_heads:               usize,
    pub intermediate_size:       usize,
    pub hidden_act:              HiddenAct,
    pub max_position_embeddings: usize,
    /// Encoded sequence length, at most max_position_embeddings
    pub seq_len:                 usize,
    /// Vocabulary id of [MASK]
    pub mask_id:                 u32,
    pub char_range:              CharRange,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 256)]
    pub detector_hidden: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl SoftMaskedBertConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SoftMaskedBert<B> {
        let embeddings = BertEmbeddingsConfig::new(
            self.vocab_size, self.hidden_size, self.max_position_embeddings,
        )
        .with_type_vocab_size(self.type_vocab_size)
        .with_dropout(self.dropout)
        .with_layer_norm_eps(self.layer_norm_eps)
        .init(device);

        let detector = DetectorConfig::new(self.hidden_size)
            .with_d_hidden(self.detector_hidden)
            .init(device);

        let encoder = BertEncoderConfig::new(
            self.hidden_size, self.num_heads, self.num_layers,
            self.intermediate_size, self.hidden_act,
        )
        .with_dropout(self.dropout)
        .with_layer_norm_eps(self.layer_norm_eps)
        .init(device);

        let head = LinearConfig::new(self.hidden_size, self.char_range.num_classes()).init(device);

        SoftMaskedBert {
            embeddings, detector, encoder, head,
            mask_id: self.mask_id as usize,
        }
    }
}

#[derive(Module, Debug)]
pub struct SoftMaskedBert<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub detector:   Detector<B>,
    pub encoder:    BertEncoder<B>,
    pub head:       Linear<B>,
    pub mask_id:    usize,
}

pub struct CorrectionOutput<B: Backend> {
    /// Head logits over CharRange + OOV — [batch, seq_len, num_classes]
    pub logits:     Tensor<B, 3>,
    /// Detector error probabilities — [batch, seq_len]
    pub error_prob: Tensor<B, 2>,
}

impl<B: Backend> SoftMaskedBert<B> {
    /// All inputs are [batch, seq_len]; mask is 1 on real tokens, 0 on padding.
    pub fn forward(
        &self,
        token_ids:   Tensor<B, 2, Int>,
        segment_ids: Tensor<B, 2, Int>,
        mask:        Tensor<B, 2, Int>,
    ) -> CorrectionOutput<B> {
        let device = token_ids.device();

        let token_emb  = self.embeddings.tokens(token_ids);
        let embeddings = self.embeddings.compose(token_emb.clone(), segment_ids.clone());

        // ── Detection ─────────────────────────────────────────────────────────
        let error_prob = self.detector.forward(embeddings.clone(), mask.clone());

        // ── Soft masking, then the usual BERT input path ──────────────────────
        let mask_emb = self.embeddings.single(self.mask_id as u32, &device);
        let blended  = soft_mask(token_emb, error_prob.clone(), mask_emb);
        let x = self.embeddings.normalize(self.embeddings.compose(blended, segment_ids));

        // ── Correction ────────────────────────────────────────────────────────
        let hidden = self.encoder.forward(x, mask.equal_elem(0));
        let logits = self.head.forward(hidden + embeddings);

        CorrectionOutput { logits, error_prob }
    }

    /// Freeze every pretrained group the policy does not allow.
    /// The detector and the head always stay trainable.
    pub fn with_trainable(mut self, policy: &Trainable) -> Result<Self> {
        policy.validate(self.encoder.num_layers())?;

        if !policy.allows(GROUP_EMBEDDINGS) {
            self.embeddings.token    = self.embeddings.token.no_grad();
            self.embeddings.segment  = self.embeddings.segment.no_grad();
            self.embeddings.position = self.embeddings.position.no_grad();
        }
        if !policy.allows(GROUP_EMBEDDING_NORM) {
            self.embeddings.norm = self.embeddings.norm.no_grad();
        }
        self.encoder.layers = self
            .encoder
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| {
                if policy.allows(&encoder_group(i)) { layer } else { layer.no_grad() }
            })
            .collect();

        tracing::info!("Trainable pretrained groups: {}", policy);
        Ok(self)
    }
}

// ─── Trainable ────────────────────────────────────────────────────────────────
pub const GROUP_EMBEDDINGS:     &str = "embeddings";
pub const GROUP_EMBEDDING_NORM: &str = "embedding_norm";

pub fn encoder_group(layer: usize) -> String {
    format!("encoder.{layer}")
}

/// Which pretrained parameter groups receive gradient updates.
///
/// Group names: `embeddings`, `embedding_norm`, `encoder.<i>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trainable {
    #[default]
    All,
    Frozen,
    Groups(BTreeSet<String>),
}

impl Trainable {
    pub fn allows(&self, group: &str) -> bool {
        match self {
            Trainable::All            => true,
            Trainable::Frozen         => false,
            Trainable::Groups(groups) => groups.contains(group),
        }
    }

    /// Reject group names the model does not have
    pub fn validate(&self, num_layers: usize) -> Result<()> {
        let Trainable::Groups(groups) = self else { return Ok(()) };

        for group in groups {
            let known = group == GROUP_EMBEDDINGS
                || group == GROUP_EMBEDDING_NORM
                || (0..num_layers).any(|i| *group == encoder_group(i));
            if !known {
                bail!(
                    "Unknown trainable group '{group}' (expected {GROUP_EMBEDDINGS}, \
                     {GROUP_EMBEDDING_NORM} or encoder.0..encoder.{})",
                    num_layers.saturating_sub(1)
                );
            }
        }
        Ok(())
    }
}

impl FromStr for Trainable {
    type Err = String;

    /// "all", "none", or a comma-separated list of group names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all"  => Ok(Trainable::All),
            "none" => Ok(Trainable::Frozen),
            list => {
                let groups: BTreeSet<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(String::from)
                    .collect();
                if groups.is_empty() {
                    Err("expected \"all\", \"none\" or a comma-separated group list".to_string())
                } else {
                    Ok(Trainable::Groups(groups))
                }
            }
        }
    }
}

impl fmt::Display for Trainable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trainable::All            => write!(f, "all"),
            Trainable::Frozen         => write!(f, "none"),
            Trainable::Groups(groups) => {
                let names: Vec<&str> = groups.iter().map(String::as_str).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}
