// ============================================================
// Layer 4 - Batch Feed
// ============================================================
// Cuts a dataset into fixed-size batches for the epoch trainers.
//
//   batch i = items [i * batch_size, (i + 1) * batch_size)
//
// The last batch may be short. With shuffling on, the ORDER of
// batches is permuted on every pass; the batches themselves stay
// fixed, so examples of similar position (and often similar
// length) keep training together.
//
// The RNG is seeded once, so a run is reproducible end to end.

use std::marker::PhantomData;

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::Examples;

pub struct BatchFeed<T, D = Examples<T>> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
    _item: PhantomData<fn() -> T>,
}

impl<T, D: Dataset<T>> BatchFeed<T, D> {
    /// Batches in file order. Fails if `batch_size` is zero.
    pub fn new(dataset: D, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            bail!("batch_size must be positive");
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle: false,
            rng: StdRng::seed_from_u64(0),
            _item: PhantomData,
        })
    }

    /// Permute batch order on every pass, seeded by `seed`
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per pass
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.len() == 0
    }

    /// One full pass: every batch exactly once
    pub fn epoch(&mut self) -> Vec<Vec<T>> {
        let total = self.dataset.len();
        let mut order: Vec<usize> = (0..self.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }

        order
            .into_iter()
            .map(|b| {
                let start = b * self.batch_size;
                let end = (start + self.batch_size).min(total);
                (start..end).filter_map(|i| self.dataset.get(i)).collect()
            })
            .collect()
    }
}
