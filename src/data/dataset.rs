use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// An in-memory collection of encoded examples.
///
/// Implements Burn's `Dataset` so the same collection can feed
/// either a `BatchFeed` or Burn's own `DataLoader`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Examples<T> {
    items: Vec<T>,
}

impl<T> Examples<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }

    pub fn example_count(&self) -> usize {
        self.items.len()
    }
}

impl<T> From<Vec<T>> for Examples<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T: Clone + Send + Sync> Dataset<T> for Examples<T> {
    fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
