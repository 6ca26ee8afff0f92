// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Used when a task has a training file but no validation file:
// a share of the training examples is held out to drive early
// stopping.
//
// The shuffle is seeded so the held-out set is identical across
// runs with the same seed, which keeps "best epoch" comparable.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `train_fraction` is clamped into `[0, 1]` through the split index.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let split_at = ((total as f64) * train_fraction).round().max(0.0) as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!("Dataset split: {} training, {} validation", samples.len(), val.len());

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val) = split_train_val(items, 0.9, 1);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(), 10);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val) = split_train_val(items, 0.7, 1);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = split_train_val((0..30).collect::<Vec<u32>>(), 0.5, 9);
        let b = split_train_val((0..30).collect::<Vec<u32>>(), 0.5, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_train_val(Vec::<usize>::new(), 0.8, 0);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
