// ============================================================
// Layer 5 - Seq2Seq Trainer
// ============================================================
//   avg_loss   = total batch loss / batches
//   perplexity = exp(avg_loss)

use std::path::Path;

use anyhow::{bail, Result};

use crate::data::feed::BatchFeed;
use crate::domain::{
    example::Seq2SeqExample,
    metrics::{EpochCounters, Metrics, Phase},
    traits::{Persistable, Reporting},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::Seq2SeqModel, trainer::EpochTrainer};

pub struct Seq2SeqTrainer<M> {
    model: M,
    checkpoints: CheckpointManager,
    counters: EpochCounters,
    global_step: usize,
}

impl<M: Seq2SeqModel> Seq2SeqTrainer<M> {
    pub fn new(model: M, checkpoints: CheckpointManager) -> Self {
        Self { model, checkpoints, counters: EpochCounters::default(), global_step: 0 }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn run(&mut self, feed: &mut BatchFeed<Seq2SeqExample>, training: bool) -> Result<Metrics> {
        let batches = feed.epoch();
        if batches.is_empty() {
            bail!("Cannot run a seq2seq pass over an empty dataset");
        }

        let mut total_loss = 0.0;
        for batch in &batches {
            total_loss += if training {
                self.global_step += 1;
                self.model.train_step(batch)?
            } else {
                self.model.eval_step(batch)?
            };
        }
        Ok(loss_metrics(total_loss / batches.len() as f64))
    }
}

pub(crate) fn loss_metrics(avg_loss: f64) -> Metrics {
    Metrics::from([("avg_loss".to_string(), avg_loss), ("perplexity".to_string(), avg_loss.exp())])
}

impl<M: Seq2SeqModel> EpochTrainer for Seq2SeqTrainer<M> {
    type Data = BatchFeed<Seq2SeqExample>;

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
