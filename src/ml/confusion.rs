use anyhow::{bail, Result};

use crate::domain::metrics::Metrics;

/// Counts of (truth, guess) pairs over a fixed label set.
///
/// Rows are truths, columns guesses.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(labels: &[String]) -> Self {
        let n = labels.len();
        Self { labels: labels.to_vec(), counts: vec![vec![0; n]; n] }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn add(&mut self, truth: u32, guess: u32) -> Result<()> {
        let n = self.labels.len() as u32;
        if truth >= n || guess >= n {
            bail!("label id out of range: truth={truth} guess={guess} labels={n}");
        }
        self.counts[truth as usize][guess as usize] += 1;
        Ok(())
    }

    pub fn add_batch(&mut self, truths: &[u32], guesses: &[u32]) -> Result<()> {
        if truths.len() != guesses.len() {
            bail!("{} truths but {} guesses", truths.len(), guesses.len());
        }
        for (&t, &g) in truths.iter().zip(guesses) {
            self.add(t, g)?;
        }
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    fn correct(&self) -> u64 {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    fn support(&self, class: usize) -> u64 {
        self.counts[class].iter().sum()
    }

    fn predicted(&self, class: usize) -> u64 {
        self.counts.iter().map(|row| row[class]).sum()
    }

    pub fn acc(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.counts[class][class], self.predicted(class))
    }

    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.counts[class][class], self.support(class))
    }

    pub fn f1(&self, class: usize) -> f64 {
        let (p, r) = (self.precision(class), self.recall(class));
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn mean_precision(&self) -> f64 {
        self.mean_over_classes(|c| self.precision(c))
    }

    pub fn mean_recall(&self) -> f64 {
        self.mean_over_classes(|c| self.recall(c))
    }

    pub fn macro_f1(&self) -> f64 {
        self.mean_over_classes(|c| self.f1(c))
    }

    /// F1 per class weighted by its support
    pub fn weighted_f1(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (0..self.labels.len())
            .map(|c| self.f1(c) * self.support(c) as f64)
            .sum::<f64>()
            / total as f64
    }

    fn mean_over_classes(&self, f: impl Fn(usize) -> f64) -> f64 {
        let n = self.labels.len();
        if n == 0 {
            return 0.0;
        }
        (0..n).map(f).sum::<f64>() / n as f64
    }

    /// All metrics. Two-class problems also get `f1` of class 1.
    pub fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("acc".into(), self.acc());
        m.insert("mean_precision".into(), self.mean_precision());
        m.insert("mean_recall".into(), self.mean_recall());
        m.insert("macro_f1".into(), self.macro_f1());
        m.insert("weighted_f1".into(), self.weighted_f1());
        if self.labels.len() == 2 {
            m.insert("f1".into(), self.f1(1));
        }
        m
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("l{i}")).collect()
    }

    #[test]
    fn test_accuracy_and_per_class() {
        let mut cm = ConfusionMatrix::new(&labels(2));
        // truths: 0 0 1 1, guesses: 0 1 1 1
        cm.add_batch(&[0, 0, 1, 1], &[0, 1, 1, 1]).unwrap();
        assert_eq!(cm.acc(), 0.75);
        assert_eq!(cm.precision(1), 2.0 / 3.0);
        assert_eq!(cm.recall(1), 1.0);
        assert_eq!(cm.recall(0), 0.5);
        let f1 = cm.metrics()["f1"];
        assert!((f1 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_empty_matrix_scores_zero() {
        let cm = ConfusionMatrix::new(&labels(3));
        assert_eq!(cm.acc(), 0.0);
        assert_eq!(cm.macro_f1(), 0.0);
        assert!(!cm.metrics().contains_key("f1"));
    }

    #[test]
    fn test_out_of_range_guess_is_an_error() {
        let mut cm = ConfusionMatrix::new(&labels(2));
        assert!(cm.add(0, 2).is_err());
        assert!(cm.add_batch(&[0], &[0, 1]).is_err());
    }

    #[test]
    fn test_weighted_f1_uses_support() {
        let mut cm = ConfusionMatrix::new(&labels(2));
        cm.add_batch(&[0, 0, 0, 1], &[0, 0, 0, 0]).unwrap();
        // class 0: p = 3/4, r = 1, f1 = 6/7; class 1 never predicted
        let expected = (6.0 / 7.0) * 3.0 / 4.0;
        assert!((cm.weighted_f1() - expected).abs() < 1e-12);
    }
}
