use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Named scalar metrics produced by one train or evaluation pass.
pub type Metrics = BTreeMap<String, f64>;

/// Which pass produced a set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Train,
    Valid,
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Train => "Train",
            Phase::Valid => "Valid",
            Phase::Test => "Test",
        };
        f.write_str(s)
    }
}

/// Epoch counters shared by the epoch trainers.
///
/// Training ticks once per call to `train`. Only `Valid` passes tick
/// the validation counter; any other evaluation reports tick 0.
#[derive(Debug, Default, Clone)]
pub struct EpochCounters {
    pub train_epochs: usize,
    pub valid_epochs: usize,
}

impl EpochCounters {
    pub fn next_train(&mut self) -> usize {
        self.train_epochs += 1;
        self.train_epochs
    }

    pub fn tick_for(&mut self, phase: Phase) -> usize {
        match phase {
            Phase::Valid => {
                self.valid_epochs += 1;
                self.valid_epochs
            }
            Phase::Train => self.train_epochs,
            Phase::Test => 0,
        }
    }
}
