// ============================================================
// Layer 5 — Joint Loss
// ============================================================
// loss = α · correction + (1 - α) · detection
//
// correction: cross-entropy of the head distribution against the
//             corrected character's class
// detection:  binary cross-entropy of the error probability
//             against the annotated mistake flag
//
// Both terms are averaged over the interior positions of each
// sequence (valid positions minus [CLS] and [SEP]) and then summed
// over the batch:
//
//   mask:      1 1 1 1 1 0 0     ([CLS] a b c [SEP] pad pad)
//   interior:  0 1 1 1 0 0 0
//
// Reference: Zhang et al. (2020) Soft-Masked BERT, §2.5

use burn::{prelude::*, tensor::activation::log_softmax};

/// Weight of the correction term
pub const DEFAULT_ALPHA: f64 = 0.8;

/// Probabilities are clamped this far from 0 and 1 inside the BCE
const BCE_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy)]
pub struct JointLoss {
    alpha: f64,
}

impl Default for JointLoss {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl JointLoss {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// mask, char_labels, mistake_labels, error_prob: [batch, seq_len]
    /// logits: [batch, seq_len, num_classes]
    /// → scalar loss, shape [1]
    pub fn forward<B: Backend>(
        &self,
        mask:           Tensor<B, 2, Int>,
        char_labels:    Tensor<B, 2, Int>,
        mistake_labels: Tensor<B, 2>,
        error_prob:     Tensor<B, 2>,
        logits:         Tensor<B, 3>,
    ) -> Tensor<B, 1> {
        let weights = interior_mask(mask);

        let correction = masked_mean_per_row(correction_nll(logits, char_labels), weights.clone());
        let detection  = masked_mean_per_row(binary_cross_entropy(error_prob, mistake_labels), weights);

        correction.mul_scalar(self.alpha) + detection.mul_scalar(1.0 - self.alpha)
    }
}

/// Validity mask with the first and last valid position of each row zeroed
pub fn interior_mask<B: Backend>(mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch_size, seq_len] = mask.dims();
    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &mask.device())
        .unsqueeze::<2>()
        .expand([batch_size, seq_len]);
    let last = mask.clone().sum_dim(1).sub_scalar(1).expand([batch_size, seq_len]);

    let is_first = positions.clone().equal_elem(0).float();
    let is_last  = positions.equal(last).float();

    mask.float() - is_first - is_last
}

/// -log softmax(logits)[label] per position → [batch, seq_len]
fn correction_nll<B: Backend>(logits: Tensor<B, 3>, labels: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch_size, seq_len, _] = logits.dims();
    log_softmax(logits, 2)
        .gather(2, labels.unsqueeze_dim::<3>(2))
        .reshape([batch_size, seq_len])
        .neg()
}

fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 2> {
    let probs = probs.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
    let positive = targets.clone() * probs.clone().log();
    let negative = targets.neg().add_scalar(1.0) * probs.neg().add_scalar(1.0).log();
    (positive + negative).neg()
}

/// Σ_rows ( Σ loss·w / Σ w ), with Σ w clamped to at least 1
fn masked_mean_per_row<B: Backend>(loss: Tensor<B, 2>, weights: Tensor<B, 2>) -> Tensor<B, 1> {
    let per_row = (loss * weights.clone()).sum_dim(1) / weights.sum_dim(1).clamp_min(1.0);
    per_row.sum()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    fn mask(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_ints(
            [[1, 1, 1, 1, 1, 0, 0], [1, 1, 1, 0, 0, 0, 0], [1, 1, 1, 1, 1, 1, 1]],
            device,
        )
    }

    #[test]
    fn test_interior_mask_drops_exactly_two_per_row() {
        let device = Default::default();
        let interior: Vec<f32> = interior_mask(mask(&device))
            .into_data().convert::<f32>().to_vec().unwrap();

        assert_eq!(&interior[0..7],   &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(&interior[7..14],  &[0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(&interior[14..21], &[0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_uniform_predictions_give_known_loss() {
        let device  = Default::default();
        let classes = 5;

        // Uniform logits → CE = ln(classes); p = 0.5 → BCE = ln 2
        let logits   = Tensor::<TestBackend, 3>::zeros([3, 7, classes], &device);
        let probs    = Tensor::<TestBackend, 2>::full([3, 7], 0.5, &device);
        let labels   = Tensor::<TestBackend, 2, Int>::zeros([3, 7], &device);
        let mistakes = Tensor::<TestBackend, 2>::zeros([3, 7], &device);

        let loss = JointLoss::new(0.8)
            .forward(mask(&device), labels, mistakes, probs, logits)
            .into_scalar().elem::<f64>();

        let expected = 3.0 * (0.8 * (classes as f64).ln() + 0.2 * 2f64.ln());
        assert!((loss - expected).abs() < 1e-4, "loss={loss}, expected={expected}");
    }

    #[test]
    fn test_boundary_positions_do_not_contribute() {
        let device = Default::default();
        let mask   = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 0]], &device);
        let labels = Tensor::<TestBackend, 2, Int>::from_ints([[1, 0, 1, 1]], &device);

        // Interior position 1 predicts its label perfectly; every other
        // position is maximally wrong and must be ignored.
        let logits = Tensor::<TestBackend, 3>::from_floats(
            [[[50.0, -50.0], [50.0, -50.0], [50.0, -50.0], [50.0, -50.0]]], &device,
        );
        let probs    = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 1.0, 1.0]], &device);
        let mistakes = Tensor::<TestBackend, 2>::zeros([1, 4], &device);

        let loss = JointLoss::default()
            .forward(mask, labels, mistakes, probs, logits)
            .into_scalar().elem::<f64>();
        assert!(loss < 1e-3, "loss={loss}");
    }

    #[test]
    fn test_alpha_one_ignores_detection() {
        let device   = Default::default();
        let logits   = Tensor::<TestBackend, 3>::zeros([3, 7, 4], &device);
        let labels   = Tensor::<TestBackend, 2, Int>::zeros([3, 7], &device);
        let mistakes = Tensor::<TestBackend, 2>::ones([3, 7], &device);

        let with_good_detector = JointLoss::new(1.0).forward(
            mask(&device), labels.clone(), mistakes.clone(),
            Tensor::full([3, 7], 0.99, &device), logits.clone(),
        );
        let with_bad_detector = JointLoss::new(1.0).forward(
            mask(&device), labels, mistakes,
            Tensor::full([3, 7], 0.01, &device), logits,
        );

        let a = with_good_detector.into_scalar().elem::<f64>();
        let b = with_bad_detector.into_scalar().elem::<f64>();
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_gradients_flow_to_both_inputs() {
        type Ad = Autodiff<TestBackend>;
        let device = Default::default();

        let logits = Tensor::<Ad, 3>::zeros([1, 4, 3], &device).require_grad();
        let probs  = Tensor::<Ad, 2>::full([1, 4], 0.3, &device).require_grad();
        let mask   = Tensor::<Ad, 2, Int>::from_ints([[1, 1, 1, 1]], &device);
        let labels = Tensor::<Ad, 2, Int>::from_ints([[0, 2, 1, 0]], &device);
        let flags  = Tensor::<Ad, 2>::from_floats([[0.0, 1.0, 0.0, 0.0]], &device);

        let loss  = JointLoss::default().forward(mask, labels, flags, probs.clone(), logits.clone());
        let grads = loss.backward();

        assert!(logits.grad(&grads).is_some());
        assert!(probs.grad(&grads).is_some());
    }
}
