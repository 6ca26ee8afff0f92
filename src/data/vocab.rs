// ============================================================
// Layer 4 - Vocabularies and Indices
// ============================================================
// Three structures:
//
//   Vocab      token -> frequency, accumulated while streaming
//              files once. Counters from several files merge.
//
//   WordIndex  token -> dense id used in every index array.
//              Fixed layout:
//                0           <PADDING>
//                1           <UNK>
//                2..         task specials, in the order given
//                then        tokens by descending count, ties
//                            broken by token text
//
//   LabelMap   label -> id, in first-seen order, starting at a
//              base id (0 for classes, 1 for tags so 0 can mark
//              padding positions).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const PADDING: &str = "<PADDING>";
pub const UNK: &str = "<UNK>";
pub const GO: &str = "<GO>";
pub const EOS: &str = "<EOS>";
pub const PAD: &str = "<PAD>";

// ─── Vocab ────────────────────────────────────────────────────────────────────
/// A token frequency counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocab {
    counts: HashMap<String, usize>,
}

impl Vocab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `token`
    pub fn add(&mut self, token: impl Into<String>) {
        self.add_n(token, 1);
    }

    pub fn add_n(&mut self, token: impl Into<String>, n: usize) {
        *self.counts.entry(token.into()).or_insert(0) += n;
    }

    /// Fold another counter into this one, summing counts
    pub fn merge(&mut self, other: Vocab) {
        for (token, n) in other.counts {
            self.add_n(token, n);
        }
    }

    pub fn count(&self, token: &str) -> usize {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.counts.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(t, &n)| (t.as_str(), n))
    }

    /// Tokens ordered by descending count, then by token text
    pub fn most_common(&self) -> Vec<(&str, usize)> {
        let mut items: Vec<(&str, usize)> = self.iter().collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items
    }
}

// ─── WordIndex ────────────────────────────────────────────────────────────────
/// Dense token ids with `<PADDING>` at 0 and `<UNK>` at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordIndex {
    tokens: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, u32>,
}

impl WordIndex {
    /// Build an index from a counter.
    ///
    /// `specials` are given ids right after `<PADDING>` and `<UNK>`.
    /// Regular tokens need at least `min_freq` occurrences.
    pub fn from_vocab(vocab: &Vocab, min_freq: usize, specials: &[&str]) -> Self {
        let mut index = Self::with_specials(specials);
        for (token, n) in vocab.most_common() {
            if n < min_freq {
                break;
            }
            index.insert(token);
        }
        index
    }

    /// An index holding only the reserved and special tokens
    pub fn with_specials(specials: &[&str]) -> Self {
        let mut index = Self { tokens: Vec::new(), ids: HashMap::new() };
        index.insert(PADDING);
        index.insert(UNK);
        for s in specials {
            index.insert(s);
        }
        index
    }

    /// Append `token` if it is not indexed yet, returning its id
    pub fn insert(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = self.tokens.len() as u32;
        self.tokens.push(token.to_string());
        self.ids.insert(token.to_string(), id);
        id
    }

    pub fn get(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    pub fn get_or(&self, token: &str, fallback: u32) -> u32 {
        self.get(token).unwrap_or(fallback)
    }

    /// Id of `token`, or the `<UNK>` id
    pub fn get_or_unk(&self, token: &str) -> u32 {
        self.get_or(token, self.unk_id())
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn pad_id(&self) -> u32 {
        0
    }

    pub fn unk_id(&self) -> u32 {
        1
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in id order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Render an id sequence back to text, skipping padding.
    /// With `reverse`, tokens come out last to first.
    pub fn decode(&self, ids: &[u32], reverse: bool) -> String {
        let mut words: Vec<&str> = ids
            .iter()
            .filter(|&&id| id != self.pad_id())
            .map(|&id| self.token(id).unwrap_or(UNK))
            .collect();
        if reverse {
            words.reverse();
        }
        words.join(" ")
    }

    /// Rebuild the lookup table after deserialising
    pub(crate) fn reindex(&mut self) {
        self.ids = self
            .tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
    }
}

// ─── LabelMap ─────────────────────────────────────────────────────────────────
/// Labels in first-seen order with ids starting at `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    base: u32,
    labels: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, u32>,
}

impl LabelMap {
    pub fn new(base: u32) -> Self {
        Self { base, labels: Vec::new(), ids: HashMap::new() }
    }

    /// Label ids for classification start at 0
    pub fn for_classes() -> Self {
        Self::new(0)
    }

    /// Tag ids start at 1, leaving 0 for padding positions
    pub fn for_tags() -> Self {
        Self::new(1)
    }

    pub fn get_or_insert(&mut self, label: &str) -> u32 {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.base + self.labels.len() as u32;
        self.labels.push(label.to_string());
        self.ids.insert(label.to_string(), id);
        id
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.ids.get(label).copied()
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        id.checked_sub(self.base)
            .and_then(|i| self.labels.get(i as usize))
            .map(String::as_str)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Labels in id order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub(crate) fn reindex(&mut self) {
        let base = self.base;
        self.ids = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), base + i as u32))
            .collect();
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> Vocab {
        let mut v = Vocab::new();
        for (t, n) in pairs {
            v.add_n(*t, *n);
        }
        v
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut a = counts(&[("the", 2), ("cat", 1)]);
        a.merge(counts(&[("the", 3), ("dog", 1)]));
        assert_eq!(a.count("the"), 5);
        assert_eq!(a.count("dog"), 1);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_index_layout() {
        let v = counts(&[("b", 2), ("a", 2), ("c", 5)]);
        let idx = WordIndex::from_vocab(&v, 1, &[GO, EOS]);
        assert_eq!(idx.get(PADDING), Some(0));
        assert_eq!(idx.get(UNK), Some(1));
        assert_eq!(idx.get(GO), Some(2));
        assert_eq!(idx.get(EOS), Some(3));
        // most frequent first, ties alphabetical
        assert_eq!(idx.get("c"), Some(4));
        assert_eq!(idx.get("a"), Some(5));
        assert_eq!(idx.get("b"), Some(6));
    }

    #[test]
    fn test_min_freq_drops_rare_tokens() {
        let v = counts(&[("common", 3), ("rare", 1)]);
        let idx = WordIndex::from_vocab(&v, 2, &[]);
        assert!(idx.get("common").is_some());
        assert_eq!(idx.get_or_unk("rare"), idx.unk_id());
    }

    #[test]
    fn test_special_already_counted_is_not_duplicated() {
        let v = counts(&[(GO, 1), ("x", 1)]);
        let idx = WordIndex::from_vocab(&v, 1, &[GO]);
        assert_eq!(idx.len(), 4);
    }

    #[test]
    fn test_decode_skips_padding() {
        let v = counts(&[("hello", 2), ("world", 1)]);
        let idx = WordIndex::from_vocab(&v, 1, &[]);
        let ids = [idx.get("hello").unwrap(), idx.get("world").unwrap(), 0, 0];
        assert_eq!(idx.decode(&ids, false), "hello world");
        assert_eq!(idx.decode(&ids, true), "world hello");
    }

    #[test]
    fn test_label_map_bases() {
        let mut classes = LabelMap::for_classes();
        assert_eq!(classes.get_or_insert("neg"), 0);
        assert_eq!(classes.get_or_insert("pos"), 1);
        assert_eq!(classes.get_or_insert("neg"), 0);

        let mut tags = LabelMap::for_tags();
        assert_eq!(tags.get_or_insert("O"), 1);
        assert_eq!(tags.label(1), Some("O"));
        assert_eq!(tags.label(0), None);
    }

    #[test]
    fn test_reindex_after_json_roundtrip() {
        let v = counts(&[("x", 1)]);
        let idx = WordIndex::from_vocab(&v, 1, &[]);
        let json = serde_json::to_string(&idx).unwrap();
        let mut back: WordIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("x"), None);
        back.reindex();
        assert_eq!(back, idx);
    }
}
