// ============================================================
// Layer 5 — Training Session
// ============================================================
// One session owns everything that changes while training:
//
//   model, optimiser   updated every step
//   global_step        drives the learning-rate schedule
//   best_f1            gates the best-model checkpoint
//
// Per step:   rate(global_step) → joint loss → backward → Adam
// Per epoch:  evaluate the inner-backend model on the dev set,
//             save best_model when F1 strictly improves,
//             append a metrics row
// Run end:    save last_model
//
// Training uses TrainBackend (Autodiff<Wgpu>); model.valid() gives
// the same weights on Wgpu with dropout off for evaluation.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::data::{
    batcher::{CscBatch, CscBatcher},
    dataset::CscDataset,
    encoder::SampleEncoder,
};
use crate::domain::{evaluation::Scores, sample::Sample};
use crate::infra::{
    checkpoint::{CheckpointManager, BEST_MODEL, LAST_MODEL},
    metrics::{EpochMetrics, MetricsLogger},
    progress::progress_bar,
};
use crate::ml::{
    evaluator::Evaluator,
    inferencer::Corrector,
    loss::JointLoss,
    model::SoftMaskedBert,
    schedule::WarmupDecay,
};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Shuffle seed for the training loader
const SHUFFLE_SEED: u64 = 42;

pub struct TrainingSession<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<SoftMaskedBert<B>, B>,
{
    model:           SoftMaskedBert<B>,
    optim:           O,
    schedule:        WarmupDecay,
    loss:            JointLoss,
    device:          B::Device,
    steps_per_epoch: usize,
    global_step:     usize,
    best_f1:         f64,
}

impl<B, O> TrainingSession<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<SoftMaskedBert<B>, B>,
{
    /// A resumed run starts the schedule at `initial_epoch * steps_per_epoch`
    pub fn new(
        model:           SoftMaskedBert<B>,
        optim:           O,
        schedule:        WarmupDecay,
        loss:            JointLoss,
        device:          B::Device,
        steps_per_epoch: usize,
        initial_epoch:   usize,
    ) -> Self {
        Self {
            model, optim, schedule, loss, device, steps_per_epoch,
            global_step: initial_epoch * steps_per_epoch,
            best_f1:     0.0,
        }
    }

    /// Start the best-model gate from a previous run's best F1
    pub fn with_best_f1(mut self, best_f1: f64) -> Self {
        self.best_f1 = best_f1;
        self
    }

    pub fn model(&self) -> &SoftMaskedBert<B> {
        &self.model
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    pub fn best_f1(&self) -> f64 {
        self.best_f1
    }

    pub fn current_rate(&self) -> f64 {
        self.schedule.rate(self.global_step, self.steps_per_epoch)
    }

    /// One optimisation step; returns the batch loss
    pub fn train_step(&mut self, batch: CscBatch<B>) -> f64 {
        let lr    = self.current_rate();
        let model = self.model.clone();

        let output = model.forward(batch.token_ids, batch.segment_ids, batch.mask.clone());
        let loss = self.loss.forward(
            batch.mask,
            batch.char_labels,
            batch.mistake_labels,
            output.error_prob,
            output.logits,
        );
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        self.model = self.optim.step(lr, model, grads);
        self.global_step += 1;

        loss_val
    }

    /// One pass over the loader; returns the mean batch loss
    pub fn train_epoch(
        &mut self,
        loader:        &Arc<dyn DataLoader<CscBatch<B>>>,
        show_progress: bool,
    ) -> Result<f64> {
        let pb = progress_bar(self.steps_per_epoch as u64, "training", show_progress)?;

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        for batch in loader.iter() {
            loss_sum += self.train_step(batch);
            batches  += 1;
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(if batches > 0 { loss_sum / batches as f64 } else { f64::NAN })
    }

    /// Evaluate the current weights without autodiff
    pub fn evaluate(
        &self,
        encoder:   &SampleEncoder,
        evaluator: &Evaluator,
        samples:   &[Sample],
    ) -> Result<Scores> {
        let model     = self.model.valid();
        let corrector = Corrector::new(&model, encoder, self.device.clone());
        evaluator.evaluate(&corrector, samples)
    }

    /// Save best_model on a strict F1 improvement. Returns whether it saved.
    pub fn keep_if_best(&mut self, scores: &Scores, ckpt: &CheckpointManager) -> Result<bool> {
        if scores.f1 > self.best_f1 {
            self.best_f1 = scores.f1;
            ckpt.save_model(&self.model, BEST_MODEL)?;
            return Ok(true);
        }
        Ok(false)
    }
}

// ─── Training Run ─────────────────────────────────────────────────────────────
/// Everything a training run needs besides the model itself
pub struct TrainingPlan<'a> {
    pub encoder:       &'a SampleEncoder,
    pub train:         CscDataset,
    pub dev:           &'a [Sample],
    pub batch_size:    usize,
    pub epochs:        usize,
    pub initial_epoch: usize,
    pub schedule:      WarmupDecay,
    pub loss:          JointLoss,
    pub evaluator:     Evaluator,
    pub show_progress: bool,
}

/// Train epochs `initial_epoch + 1 ..= epochs`; returns the best dev F1
pub fn run_training<B: AutodiffBackend>(
    model:   SoftMaskedBert<B>,
    plan:    TrainingPlan<'_>,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
    device:  B::Device,
) -> Result<f64> {
    let steps_per_epoch = plan.train.sample_count().div_ceil(plan.batch_size.max(1));

    let train_loader = DataLoaderBuilder::new(CscBatcher::<B>::new(device.clone()))
        .batch_size(plan.batch_size)
        .shuffle(SHUFFLE_SEED)
        .num_workers(1)
        .build(plan.train);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim = AdamConfig::new().with_epsilon(1e-8).init();

    // A resumed run must beat the best F1 already on disk
    let best_f1 = if plan.initial_epoch > 0 { metrics.last_best_f1()? } else { 0.0 };

    tracing::info!(
        "Joint loss alpha={}, metrics in '{}'",
        plan.loss.alpha(), metrics.csv_path().display()
    );
    let mut session = TrainingSession::new(
        model, optim, plan.schedule, plan.loss, device, steps_per_epoch, plan.initial_epoch,
    )
    .with_best_f1(best_f1);
    tracing::info!(
        "Training epochs {}..={} ({} steps per epoch, starting at step {}, best f1={:.4})",
        plan.initial_epoch + 1, plan.epochs, steps_per_epoch, session.global_step(), best_f1
    );

    for epoch in plan.initial_epoch + 1..=plan.epochs {
        let train_loss = session.train_epoch(&train_loader, plan.show_progress)?;
        let scores     = session.evaluate(plan.encoder, &plan.evaluator, plan.dev)?;
        let improved   = session.keep_if_best(&scores, ckpt)?;

        println!(
            "Epoch {:>3}/{} | loss={:.4} | f1={:.4} | precision={:.4} | recall={:.4} | accuracy={:.4} | best f1={:.4}{}",
            epoch, plan.epochs, train_loss,
            scores.f1, scores.precision, scores.recall, scores.accuracy,
            session.best_f1(),
            if improved { " *" } else { "" },
        );
        metrics.log(&EpochMetrics::new(epoch, train_loss, scores, session.best_f1()))?;
    }

    ckpt.save_model(session.model(), LAST_MODEL)?;
    if session.best_f1() <= 0.0 {
        tracing::warn!("Dev F1 never rose above 0, so no best_model checkpoint was written");
    }
    tracing::info!("Training complete! Best f1={:.4}", session.best_f1());
    Ok(session.best_f1())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::{tests::test_vocab, CharRange};
    use crate::domain::sample::Mistake;
    use crate::ml::model::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::batcher::Batcher;

    type TestBackend = Autodiff<NdArray>;

    fn encoder() -> SampleEncoder {
        let vocab = test_vocab();
        let range = CharRange::detect(&vocab).unwrap();
        SampleEncoder::new(vocab, range, 8).unwrap()
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new("他是我朋有", vec![Mistake::new(5, "有", "友")]),
            Sample::unannotated("他是我的朋友"),
        ]
    }

    fn session(
        initial_epoch: usize,
    ) -> TrainingSession<TestBackend, impl Optimizer<SoftMaskedBert<TestBackend>, TestBackend>> {
        let device = Default::default();
        let model  = tiny_config(8).init::<TestBackend>(&device);
        let optim  = AdamConfig::new().init();
        TrainingSession::new(
            model, optim, WarmupDecay::new(5e-3, 1e-3), JointLoss::default(), device, 4, initial_epoch,
        )
    }

    #[test]
    fn test_resumed_session_continues_schedule() {
        assert_eq!(session(0).global_step(), 0);
        assert_eq!(session(3).global_step(), 12);
        assert_eq!(session(3).current_rate(), 1e-3);
    }

    #[test]
    fn test_train_step_advances_and_updates_weights() {
        let mut session = session(0);
        let device      = Default::default();
        let encoder     = encoder();
        let items: Vec<_> = samples().iter().map(|s| encoder.encode(s)).collect();
        let batch = CscBatcher::<TestBackend>::new(device).batch(items);

        let before = session.model().head.weight.val().into_data();
        let loss   = session.train_step(batch);

        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(session.global_step(), 1);
        assert_ne!(session.model().head.weight.val().into_data(), before);
    }

    #[test]
    fn test_best_checkpoint_only_on_strict_improvement() {
        let dir      = tempfile::tempdir().unwrap();
        let ckpt     = CheckpointManager::create(dir.path()).unwrap();
        let mut sess = session(0);
        let scores   = |f1| Scores { f1, ..Scores::default() };

        assert!(!sess.keep_if_best(&scores(0.0), &ckpt).unwrap());
        assert!(sess.keep_if_best(&scores(0.4), &ckpt).unwrap());
        assert!(!sess.keep_if_best(&scores(0.4), &ckpt).unwrap());
        assert!(!sess.keep_if_best(&scores(0.3), &ckpt).unwrap());
        assert_eq!(sess.best_f1(), 0.4);
    }

    #[test]
    fn test_resumed_session_keeps_earlier_best() {
        let dir      = tempfile::tempdir().unwrap();
        let ckpt     = CheckpointManager::create(dir.path()).unwrap();
        let mut sess = session(3).with_best_f1(0.6);
        let scores   = |f1| Scores { f1, ..Scores::default() };

        assert!(!sess.keep_if_best(&scores(0.1), &ckpt).unwrap());
        assert!(!dir.path().join("best_model.mpk").exists());
        assert_eq!(sess.best_f1(), 0.6);

        assert!(sess.keep_if_best(&scores(0.7), &ckpt).unwrap());
        assert!(dir.path().join("best_model.mpk").exists());
    }

    #[test]
    fn test_resumed_run_seeds_best_from_metrics() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::create(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let device  = Default::default();
        let encoder = encoder();
        let dev     = samples();

        // F1 is always strictly below 1, so nothing can beat this row
        metrics.log(&EpochMetrics::new(1, 1.0, Scores { f1: 1.0, ..Scores::default() }, 1.0)).unwrap();

        let plan = TrainingPlan {
            encoder:       &encoder,
            train:         CscDataset::encode(&encoder, &samples()),
            dev:           &dev,
            batch_size:    2,
            epochs:        2,
            initial_epoch: 1,
            schedule:      WarmupDecay::new(5e-3, 1e-3),
            loss:          JointLoss::default(),
            evaluator:     Evaluator::new(dir.path().join("dev_pred.jsonl")).with_progress(false),
            show_progress: false,
        };
        let model = tiny_config(8).init::<TestBackend>(&device);
        let best  = run_training(model, plan, &ckpt, &metrics, device).unwrap();

        assert_eq!(best, 1.0);
        assert!(!dir.path().join("best_model.mpk").exists());
        assert_eq!(metrics.last_best_f1().unwrap(), 1.0);
    }

    #[test]
    fn test_run_training_writes_artefacts() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::create(dir.path()).unwrap();
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let device  = Default::default();
        let encoder = encoder();
        let dev     = samples();

        let plan = TrainingPlan {
            encoder:       &encoder,
            train:         CscDataset::encode(&encoder, &samples()),
            dev:           &dev,
            batch_size:    2,
            epochs:        2,
            initial_epoch: 0,
            schedule:      WarmupDecay::new(5e-3, 1e-3),
            loss:          JointLoss::default(),
            evaluator:     Evaluator::new(dir.path().join("dev_pred.jsonl")).with_progress(false),
            show_progress: false,
        };
        let model = tiny_config(8).init::<TestBackend>(&device);
        let best  = run_training(model, plan, &ckpt, &metrics, device).unwrap();

        assert!((0.0..=1.0).contains(&best));
        assert!(dir.path().join("dev_pred.jsonl").exists());
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
        let model = tiny_config(8).init::<NdArray>(&Default::default());
        assert!(ckpt.load_model(model, LAST_MODEL, &Default::default()).is_ok());
    }
}
