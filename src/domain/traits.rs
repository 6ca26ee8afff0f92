// ============================================================
// Layer 3 - Core Traits
// ============================================================
// The seams between this crate and its external collaborators:
//   - models own their own weights and know how to save them
//   - reporting sinks consume metric mappings
//
// Trainers only ever see these traits, so any framework can
// plug a model in and any sink can receive metrics.

use std::path::Path;

use anyhow::Result;

use crate::domain::metrics::{Metrics, Phase};

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be written to and restored from a path.
///
/// The format is opaque to this crate: checkpointing only decides
/// *where* and *when* a model is saved.
pub trait Persistable {
    /// Save current state to `path`
    fn save(&self, path: &Path) -> Result<()>;

    /// Replace current state with the one stored at `path`
    fn restore(&mut self, path: &Path) -> Result<()>;
}

// ─── Reporter ─────────────────────────────────────────────────────────────────
/// A sink for metrics.
///
/// `tick` is the epoch counter for epoch reports, or the global
/// step for interim language-model reports.
pub trait Reporter {
    fn report(&mut self, metrics: &Metrics, tick: usize, phase: Phase) -> Result<()>;
}

/// A list of reporters that all receive every report.
#[derive(Default)]
pub struct Reporting {
    sinks: Vec<Box<dyn Reporter>>,
}

impl Reporting {
    pub fn new(sinks: Vec<Box<dyn Reporter>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: impl Reporter + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn report(&mut self, metrics: &Metrics, tick: usize, phase: Phase) -> Result<()> {
        for sink in &mut self.sinks {
            sink.report(metrics, tick, phase)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
