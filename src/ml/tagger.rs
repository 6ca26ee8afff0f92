// ============================================================
// Layer 5 - Tagger Trainer
// ============================================================
// Token-level accuracy over the real positions of each sentence
// (the first `length` tags), padding never scored.
//
//   acc      = correct tokens / scored tokens
//   avg_loss = total batch loss / batches

use std::path::Path;

use anyhow::{bail, Result};

use crate::data::feed::BatchFeed;
use crate::domain::{
    example::TaggedExample,
    metrics::{EpochCounters, Metrics, Phase},
    traits::{Persistable, Reporting},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::TaggerModel, trainer::EpochTrainer};

pub struct TaggerTrainer<M> {
    model: M,
    checkpoints: CheckpointManager,
    counters: EpochCounters,
    global_step: usize,
}

impl<M: TaggerModel> TaggerTrainer<M> {
    pub fn new(model: M, checkpoints: CheckpointManager) -> Self {
        Self { model, checkpoints, counters: EpochCounters::default(), global_step: 0 }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    fn run(&mut self, feed: &mut BatchFeed<TaggedExample>, training: bool) -> Result<Metrics> {
        let batches = feed.epoch();
        if batches.is_empty() {
            bail!("Cannot run a tagger pass over an empty dataset");
        }

        let (mut correct, mut scored) = (0usize, 0usize);
        let mut total_loss = 0.0;
        for batch in &batches {
            let step = if training {
                self.global_step += 1;
                self.model.train_step(batch)?
            } else {
                self.model.eval_step(batch)?
            };
            if step.guesses.len() != batch.len() {
                bail!("{} sentences but {} guess rows", batch.len(), step.guesses.len());
            }
            for (example, guess) in batch.iter().zip(&step.guesses) {
                let n = example.length;
                if guess.len() < n {
                    bail!("sentence {} has {n} tokens but only {} guesses", example.id, guess.len());
                }
                correct += example.tags[..n].iter().zip(&guess[..n]).filter(|(t, g)| t == g).count();
                scored += n;
            }
            total_loss += step.loss;
        }

        let acc = if scored == 0 { 0.0 } else { correct as f64 / scored as f64 };
        Ok(Metrics::from([
            ("acc".to_string(), acc),
            ("avg_loss".to_string(), total_loss / batches.len() as f64),
        ]))
    }
}

impl<M: TaggerModel> EpochTrainer for TaggerTrainer<M> {
    type Data = BatchFeed<TaggedExample>;

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
