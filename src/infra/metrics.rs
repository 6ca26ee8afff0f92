// ============================================================
// Layer 6 - Metric Reporters
// ============================================================
// Sinks that receive every metric mapping a trainer reports.
//
//   ConsoleReporter  one line per report on stdout
//   CsvReporter      appends long-format rows to a CSV file
//   History          keeps every report in memory, cloneable
//                    handle so the caller can read it after fit
//
// Long format (one row per metric) is used in the CSV because the
// metric keys differ between tasks and even between phases:
//
//   phase,tick,metric,value
//   Train,1,avg_loss,0.693147
//   Valid,1,acc,0.812500

use std::{
    cell::RefCell,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};

use crate::domain::{
    metrics::{Metrics, Phase},
    traits::Reporter,
};

// ─── ConsoleReporter ──────────────────────────────────────────────────────────
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn line(metrics: &Metrics, tick: usize, phase: Phase) -> String {
        let pairs: Vec<String> = metrics.iter().map(|(k, v)| format!("{k}={v:.4}")).collect();
        format!("{phase} [{tick}] {}", pairs.join(" "))
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, metrics: &Metrics, tick: usize, phase: Phase) -> Result<()> {
        println!("{}", Self::line(metrics, tick, phase));
        Ok(())
    }
}

// ─── CsvReporter ──────────────────────────────────────────────────────────────
pub struct CsvReporter {
    csv_path: PathBuf,
}

impl CsvReporter {
    /// Open (or create) `path`, writing the header only for a new file
    /// so several runs can append to the same log.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = path.into();
        if let Some(dir) = csv_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "phase,tick,metric,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl Reporter for CsvReporter {
    fn report(&mut self, metrics: &Metrics, tick: usize, phase: Phase) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        for (name, value) in metrics {
            writeln!(f, "{phase},{tick},{name},{value:.6}")?;
        }
        Ok(())
    }
}

// ─── History ──────────────────────────────────────────────────────────────────
/// One report as received
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub phase: Phase,
    pub tick: usize,
    pub metrics: Metrics,
}

/// In-memory report log. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct History {
    records: Rc<RefCell<Vec<Record>>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.borrow().clone()
    }

    /// Reports of one phase, in arrival order
    pub fn phase(&self, phase: Phase) -> Vec<Record> {
        self.records.borrow().iter().filter(|r| r.phase == phase).cloned().collect()
    }
}

impl Reporter for History {
    fn report(&mut self, metrics: &Metrics, tick: usize, phase: Phase) -> Result<()> {
        self.records.borrow_mut().push(Record { phase, tick, metrics: metrics.clone() });
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Reporting;
    use crate::test_util::scratch_dir;

    fn metrics(pairs: &[(&str, f64)]) -> Metrics {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_csv_rows_appended() {
        let path = scratch_dir("csv-report").join("metrics.csv");
        let mut r = CsvReporter::new(&path).unwrap();
        r.report(&metrics(&[("acc", 0.5), ("avg_loss", 1.25)]), 1, Phase::Valid).unwrap();

        // reopening must not write a second header
        let mut r = CsvReporter::new(&path).unwrap();
        r.report(&metrics(&[("acc", 0.75)]), 2, Phase::Valid).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "phase,tick,metric,value",
                "Valid,1,acc,0.500000",
                "Valid,1,avg_loss,1.250000",
                "Valid,2,acc,0.750000",
            ]
        );
    }

    #[test]
    fn test_history_clones_share_log() {
        let history = History::new();
        let mut sink = history.clone();
        sink.report(&metrics(&[("acc", 1.0)]), 3, Phase::Test).unwrap();
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.phase(Phase::Test)[0].tick, 3);
        assert!(history.phase(Phase::Train).is_empty());
    }

    #[test]
    fn test_console_line_lists_metrics_in_key_order() {
        let m = metrics(&[("avg_loss", 1.5), ("acc", 0.25)]);
        assert_eq!(ConsoleReporter::line(&m, 4, Phase::Valid), "Valid [4] acc=0.2500 avg_loss=1.5000");
    }

    #[test]
    fn test_reporting_fans_out_to_every_sink() {
        let (a, b) = (History::new(), History::new());
        let sinks: Vec<Box<dyn Reporter>> = vec![Box::new(a.clone()), Box::new(ConsoleReporter), Box::new(b.clone())];
        let mut reporting = Reporting::new(sinks);
        assert_eq!(reporting.len(), 3);

        reporting.report(&metrics(&[("acc", 0.5)]), 2, Phase::Train).unwrap();
        assert_eq!(a.phase(Phase::Train)[0].tick, 2);
        assert_eq!(b.records().len(), 1);
    }
}
