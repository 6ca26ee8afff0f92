// ============================================================
// Layer 5 - Language Model Trainer
// ============================================================
// Truncated BPTT over an LmFeed. Each pass starts from a fresh
// recurrent state; the state coming out of window i is the input
// state of window i + 1.
//
//   avg_loss   = total loss / (windows * nbptt)
//   perplexity = exp(avg_loss)
//
// Training reports are ticked by the global step, with an interim
// report after every REPORT_EVERY windows.

use std::path::Path;

use anyhow::{bail, Result};

use crate::data::lm::LmFeed;
use crate::domain::{
    metrics::{EpochCounters, Metrics, Phase},
    traits::{Persistable, Reporting},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::LanguageModel, seq2seq::loss_metrics, trainer::EpochTrainer};

pub const REPORT_EVERY: usize = 500;

pub struct LanguageModelTrainer<M> {
    model: M,
    checkpoints: CheckpointManager,
    counters: EpochCounters,
    global_step: usize,
}

impl<M: LanguageModel> LanguageModelTrainer<M> {
    pub fn new(model: M, checkpoints: CheckpointManager) -> Self {
        Self { model, checkpoints, counters: EpochCounters::default(), global_step: 0 }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    fn check(&self, feed: &LmFeed) -> Result<()> {
        if feed.is_empty() {
            bail!("Token stream is too short for a single BPTT window");
        }
        if feed.nbptt() != self.model.nbptt() {
            bail!("feed windows are {} tokens but the model expects {}", feed.nbptt(), self.model.nbptt());
        }
        Ok(())
    }
}

impl<M: LanguageModel> EpochTrainer for LanguageModelTrainer<M> {
    type Data = LmFeed;

    fn train(&mut self, ts: &mut LmFeed, reporting: &mut Reporting) -> Result<Metrics> {
        self.check(ts)?;
        let mut state = self.model.initial_state()?;
        let (mut total_loss, mut iters) = (0.0, 0usize);

        for (i, batch) in ts.iter().enumerate() {
            let step = i + 1;
            let out = self.model.train_step(&batch, state)?;
            state = out.state;
            total_loss += out.loss;
            iters += ts.nbptt();
            self.global_step += 1;

            if step % REPORT_EVERY == 0 {
                reporting.report(&loss_metrics(total_loss / iters as f64), self.global_step, Phase::Train)?;
            }
        }

        let metrics = loss_metrics(total_loss / iters as f64);
        reporting.report(&metrics, self.global_step, Phase::Train)?;
        Ok(metrics)
    }

    fn test(&mut self, vs: &mut LmFeed, reporting: &mut Reporting, phase: Phase) -> Result<Metrics> {
        self.check(vs)?;
        let mut state = self.model.initial_state()?;
        let (mut total_loss, mut iters) = (0.0, 0usize);

        for batch in vs.iter() {
            let out = self.model.eval_step(&batch, state)?;
            state = out.state;
            total_loss += out.loss;
            iters += vs.nbptt();
        }

        let metrics = loss_metrics(total_loss / iters as f64);
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
