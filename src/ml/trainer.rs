// ============================================================
// Layer 5 - Epoch Training Loop
// ============================================================
// Task-independent control loop shared by every trainer:
//
//   for epoch in 0..epochs:
//       train(ts)                       -> Train report
//       after_train hook
//       metrics = test(vs, Valid)       -> Valid report
//
//       early stopping off:  checkpoint + save every epoch
//       metric improved:     remember epoch, checkpoint + save
//       epoch - last_improved > patience:  stop
//
//   if es: recover last checkpoint, test(es, Test)
//
// "Improved" is strict: greater for Maximize (accuracy), less
// for Minimize (loss). With early stopping on, checkpoints are
// only written on improvement, so the last checkpoint is always
// the best epoch.
//
// Epochs are counted from 0 in the summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{
    metrics::{Metrics, Phase},
    traits::Reporting,
};

// ─── EpochTrainer ─────────────────────────────────────────────────────────────
/// A task trainer driven by [`fit`].
pub trait EpochTrainer {
    /// What one pass iterates over (a batch feed)
    type Data;

    /// One training pass; reports and returns its metrics
    fn train(&mut self, ts: &mut Self::Data, reporting: &mut Reporting) -> Result<Metrics>;

    /// One evaluation pass; reports and returns its metrics
    fn test(&mut self, vs: &mut Self::Data, reporting: &mut Reporting, phase: Phase) -> Result<Metrics>;

    /// Save a checkpoint at the current step
    fn checkpoint(&mut self) -> Result<()>;

    /// Restore the most recent checkpoint
    fn recover_last_checkpoint(&mut self) -> Result<()>;

    /// Save the model itself to `path`
    fn save(&self, path: &Path) -> Result<()>;
}

// ─── FitConfig ────────────────────────────────────────────────────────────────
/// Which way the monitored metric should move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Strict improvement; NaN never improves
    pub fn improves(self, value: f64, best: f64) -> bool {
        match self {
            Direction::Maximize => value > best,
            Direction::Minimize => value < best,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub epochs: usize,
    pub do_early_stopping: bool,
    pub early_stopping_metric: String,
    pub direction: Direction,
    /// Epochs without improvement tolerated; `None` means `epochs`
    pub patience: Option<usize>,
    /// Where the model is saved whenever it is checkpointed
    pub outfile: PathBuf,
}

impl FitConfig {
    /// Classification: 20 epochs, maximize accuracy
    pub fn classify() -> Self {
        Self {
            epochs: 20,
            do_early_stopping: true,
            early_stopping_metric: "acc".into(),
            direction: Direction::Maximize,
            patience: None,
            outfile: PathBuf::from("./classifier-model"),
        }
    }

    /// Tagging: 20 epochs, maximize token accuracy
    pub fn tagger() -> Self {
        Self { outfile: PathBuf::from("./tagger-model"), ..Self::classify() }
    }

    /// Language modeling: 5 epochs, minimize average loss
    pub fn language_model() -> Self {
        Self {
            epochs: 5,
            do_early_stopping: true,
            early_stopping_metric: "avg_loss".into(),
            direction: Direction::Minimize,
            patience: None,
            outfile: PathBuf::from("./lm-model"),
        }
    }

    /// Seq2seq: 20 epochs, minimize average loss
    pub fn seq2seq() -> Self {
        Self { epochs: 20, outfile: PathBuf::from("./seq2seq-model"), ..Self::language_model() }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = Some(patience);
        self
    }

    pub fn without_early_stopping(mut self) -> Self {
        self.do_early_stopping = false;
        self
    }

    pub fn with_outfile(mut self, outfile: impl Into<PathBuf>) -> Self {
        self.outfile = outfile.into();
        self
    }

    pub fn effective_patience(&self) -> usize {
        self.patience.unwrap_or(self.epochs)
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self::classify()
    }
}

// ─── FitSummary ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Best monitored value, `None` if early stopping was off
    pub best_metric: Option<f64>,
    /// 0-based epoch that produced `best_metric`
    pub best_epoch: usize,
    pub epochs_run: usize,
    pub stopped_early: bool,
    pub test_metrics: Option<Metrics>,
}

// ─── fit ──────────────────────────────────────────────────────────────────────
pub fn fit<T: EpochTrainer>(
    trainer: &mut T,
    ts: &mut T::Data,
    vs: &mut T::Data,
    es: Option<&mut T::Data>,
    cfg: &FitConfig,
    reporting: &mut Reporting,
) -> Result<FitSummary> {
    fit_with_hook(trainer, ts, vs, es, cfg, reporting, |_| Ok(()))
}

/// [`fit`] with a hook run after every training pass, before
/// validation (learning-rate decay, weight averaging, ...).
pub fn fit_with_hook<T, F>(
    trainer: &mut T,
    ts: &mut T::Data,
    vs: &mut T::Data,
    es: Option<&mut T::Data>,
    cfg: &FitConfig,
    reporting: &mut Reporting,
    mut after_train: F,
) -> Result<FitSummary>
where
    T: EpochTrainer,
    F: FnMut(&mut T) -> Result<()>,
{
    let patience = cfg.effective_patience();
    if cfg.do_early_stopping {
        tracing::info!(
            "Doing early stopping on [{}] with patience [{}]",
            cfg.early_stopping_metric,
            patience
        );
    }

    let mut best: Option<f64> = None;
    let mut last_improved = 0usize;
    let mut epochs_run = 0usize;
    let mut stopped_early = false;

    for epoch in 0..cfg.epochs {
        trainer.train(ts, reporting)?;
        after_train(trainer)?;
        let metrics = trainer.test(vs, reporting, Phase::Valid)?;
        epochs_run += 1;

        if !cfg.do_early_stopping {
            trainer.checkpoint()?;
            trainer.save(&cfg.outfile)?;
            continue;
        }

        let value = *metrics.get(&cfg.early_stopping_metric).with_context(|| {
            format!(
                "Validation metrics have no '{}' (got: {:?})",
                cfg.early_stopping_metric,
                metrics.keys().collect::<Vec<_>>()
            )
        })?;

        let improved = !value.is_nan() && best.map_or(true, |b| cfg.direction.improves(value, b));
        if improved {
            last_improved = epoch;
            best = Some(value);
            tracing::info!("New best {} {:.3}", cfg.early_stopping_metric, value);
            trainer.checkpoint()?;
            trainer.save(&cfg.outfile)?;
        } else if epoch - last_improved > patience {
            tracing::info!("Stopping due to persistent failures to improve");
            stopped_early = true;
            break;
        }
    }

    if let Some(b) = best {
        tracing::info!(
            "Best performance on {}: {:.3} at epoch {}",
            cfg.early_stopping_metric,
            b,
            last_improved
        );
    }

    let test_metrics = match es {
        Some(es) => {
            tracing::info!("Reloading best checkpoint");
            trainer.recover_last_checkpoint()?;
            Some(trainer.test(es, reporting, Phase::Test)?)
        }
        None => None,
    };

    Ok(FitSummary { best_metric: best, best_epoch: last_improved, epochs_run, stopped_early, test_metrics })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{checkpoint::CheckpointManager, metrics::History};
    use crate::test_util::scratch_dir;

    /// Replays a fixed list of validation values and logs every call
    struct Scripted {
        metric: &'static str,
        valid: Vec<f64>,
        calls: Vec<String>,
        epoch: usize,
    }

    impl Scripted {
        fn new(metric: &'static str, valid: &[f64]) -> Self {
            Self { metric, valid: valid.to_vec(), calls: Vec::new(), epoch: 0 }
        }

        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| c.as_str() == call).count()
        }
    }

    impl EpochTrainer for Scripted {
        type Data = ();

        fn train(&mut self, _: &mut (), reporting: &mut Reporting) -> Result<Metrics> {
            self.calls.push("train".into());
            let m = Metrics::from([("avg_loss".to_string(), 1.0)]);
            reporting.report(&m, self.epoch + 1, Phase::Train)?;
            Ok(m)
        }

        fn test(&mut self, _: &mut (), reporting: &mut Reporting, phase: Phase) -> Result<Metrics> {
            self.calls.push(format!("test:{phase}"));
            let m = if phase == Phase::Valid {
                let v = self.valid[self.epoch];
                self.epoch += 1;
                Metrics::from([(self.metric.to_string(), v)])
            } else {
                Metrics::from([(self.metric.to_string(), -1.0)])
            };
            reporting.report(&m, self.epoch, phase)?;
            Ok(m)
        }

        fn checkpoint(&mut self) -> Result<()> {
            self.calls.push("checkpoint".into());
            Ok(())
        }

        fn recover_last_checkpoint(&mut self) -> Result<()> {
            self.calls.push("recover".into());
            Ok(())
        }

        fn save(&self, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stops_after_patience_exceeded() {
        let mut t = Scripted::new("acc", &[0.5, 0.6, 0.55, 0.55, 0.55, 0.9, 0.9, 0.9, 0.9, 0.9]);
        let cfg = FitConfig::classify().with_epochs(10).with_patience(2);
        let s = fit(&mut t, &mut (), &mut (), None, &cfg, &mut Reporting::default()).unwrap();

        // epoch 4: 4 - 1 > 2
        assert_eq!(s.epochs_run, 5);
        assert!(s.stopped_early);
        assert_eq!(s.best_epoch, 1);
        assert_eq!(s.best_metric, Some(0.6));
        assert_eq!(t.count("checkpoint"), 2);
    }

    #[test]
    fn test_minimize_direction() {
        let mut t = Scripted::new("avg_loss", &[5.0, 4.0, 4.5, 3.0, 3.0]);
        let cfg = FitConfig::language_model();
        let s = fit(&mut t, &mut (), &mut (), None, &cfg, &mut Reporting::default()).unwrap();

        assert_eq!(s.epochs_run, 5);
        assert!(!s.stopped_early);
        assert_eq!(s.best_metric, Some(3.0));
        assert_eq!(s.best_epoch, 3);
        // equal value is not an improvement
        assert_eq!(t.count("checkpoint"), 3);
    }

    #[test]
    fn test_first_epoch_always_checkpoints() {
        let mut t = Scripted::new("acc", &[0.0]);
        let cfg = FitConfig::classify().with_epochs(1);
        let s = fit(&mut t, &mut (), &mut (), None, &cfg, &mut Reporting::default()).unwrap();
        assert_eq!(s.best_metric, Some(0.0));
        assert_eq!(t.count("checkpoint"), 1);
    }

    #[test]
    fn test_without_early_stopping_checkpoints_every_epoch() {
        let mut t = Scripted::new("acc", &[0.9, 0.1, 0.1]);
        let cfg = FitConfig::classify().with_epochs(3).without_early_stopping();
        let s = fit(&mut t, &mut (), &mut (), None, &cfg, &mut Reporting::default()).unwrap();
        assert_eq!(s.epochs_run, 3);
        assert_eq!(s.best_metric, None);
        assert_eq!(t.count("checkpoint"), 3);
    }

    #[test]
    fn test_test_set_recovers_then_tests() {
        let mut t = Scripted::new("acc", &[0.4, 0.8]);
        let history = History::new();
        let mut reporting = Reporting::default().with(history.clone());
        let cfg = FitConfig::classify().with_epochs(2);
        let s = fit(&mut t, &mut (), &mut (), Some(&mut ()), &cfg, &mut reporting).unwrap();

        let tail: Vec<&str> = t.calls.iter().rev().take(2).map(String::as_str).collect();
        assert_eq!(tail, vec!["test:Test", "recover"]);
        assert_eq!(s.test_metrics.unwrap()["acc"], -1.0);
        assert_eq!(history.phase(Phase::Valid).len(), 2);
        assert_eq!(history.phase(Phase::Test).len(), 1);
    }

    #[test]
    fn test_missing_metric_is_an_error() {
        let mut t = Scripted::new("acc", &[0.4]);
        let mut cfg = FitConfig::classify().with_epochs(1);
        cfg.early_stopping_metric = "f1".into();
        assert!(fit(&mut t, &mut (), &mut (), None, &cfg, &mut Reporting::default()).is_err());
    }

    #[test]
    fn test_after_train_hook_runs_before_validation() {
        let mut t = Scripted::new("acc", &[0.1, 0.2]);
        let cfg = FitConfig::classify().with_epochs(2);
        fit_with_hook(&mut t, &mut (), &mut (), None, &cfg, &mut Reporting::default(), |t| {
            t.calls.push("hook".into());
            Ok(())
        })
        .unwrap();
        assert_eq!(&t.calls[..3], &["train", "hook", "test:Valid"]);
    }

    #[test]
    fn test_config_saved_next_to_checkpoints() {
        let mgr = CheckpointManager::new(scratch_dir("fit-config"), "seq2seq").unwrap();
        let cfg = FitConfig::seq2seq().with_patience(3);
        mgr.save_config("fit_config.json", &cfg).unwrap();

        let json = std::fs::read_to_string(mgr.dir().join("fit_config.json")).unwrap();
        assert!(json.contains("\"minimize\""));
        let back: FitConfig = mgr.load_config("fit_config.json").unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.effective_patience(), 3);
    }
}
