// ============================================================
// Layer 5 - Classifier Trainer
// ============================================================
// One pass = every batch of the feed once. Per batch the model
// returns a mean loss and one guess per example; guesses go into
// a confusion matrix over the model's labels.
//
//   metrics = confusion metrics + avg_loss (total / batches)
//
// Checkpoints are keyed by the global training step.

use std::path::Path;

use anyhow::{bail, Result};

use crate::data::feed::BatchFeed;
use crate::domain::{
    example::LabelExample,
    metrics::{EpochCounters, Metrics, Phase},
    traits::{Persistable, Reporting},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{confusion::ConfusionMatrix, model::ClassifierModel, trainer::EpochTrainer};

pub struct ClassifyTrainer<M> {
    model: M,
    checkpoints: CheckpointManager,
    counters: EpochCounters,
    global_step: usize,
}

impl<M: ClassifierModel> ClassifyTrainer<M> {
    pub fn new(model: M, checkpoints: CheckpointManager) -> Self {
        Self { model, checkpoints, counters: EpochCounters::default(), global_step: 0 }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    fn run(&mut self, feed: &mut BatchFeed<LabelExample>, training: bool) -> Result<Metrics> {
        let batches = feed.epoch();
        if batches.is_empty() {
            bail!("Cannot run a classifier pass over an empty dataset");
        }

        let mut cm = ConfusionMatrix::new(self.model.labels());
        let mut total_loss = 0.0;
        for batch in &batches {
            let step = if training {
                self.global_step += 1;
                self.model.train_step(batch)?
            } else {
                self.model.eval_step(batch)?
            };
            let truths: Vec<u32> = batch.iter().map(|e| e.y).collect();
            cm.add_batch(&truths, &step.guesses)?;
            total_loss += step.loss;
        }

        let mut metrics = cm.metrics();
        metrics.insert("avg_loss".into(), total_loss / batches.len() as f64);
        Ok(metrics)
    }
}

impl<M: ClassifierModel> EpochTrainer for ClassifyTrainer<M> {
    type Data = BatchFeed<LabelExample>;

    fn train(&mut self, ts: &mut Self::Data, reporting: &mut Reporting) -> Result<Metrics> {
        let metrics = self.run(ts, true)?;
        let tick = self.counters.next_train();
        reporting.report(&metrics, tick, Phase::Train)?;
        Ok(metrics)
    }

    fn test(&mut self, vs: &mut Self::Data, reporting: &mut Reporting, phase: Phase) -> Result<Metrics> {
        let metrics = self.run(vs, false)?;
        let tick = self.counters.tick_for(phase);
        reporting.report(&metrics, tick, phase)?;
        Ok(metrics)
    }

    fn checkpoint(&mut self) -> Result<()> {
        self.checkpoints.save(&self.model, self.global_step)?;
        Ok(())
    }

    fn recover_last_checkpoint(&mut self) -> Result<()> {
        self.checkpoints.restore_latest(&mut self.model)?;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.model.save(path)
    }
}
