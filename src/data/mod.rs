// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from tokenized text files to fixed-shape index
// arrays and tensor batches.
//
//   text files
//       │
//       ▼
//   text            token splitting and normalisation
//       │
//       ▼
//   vocab           one streaming pass: frequency counters,
//                   then dense indices and label maps
//       │
//       ▼
//   label / conll   second pass: per-task encoders that pad,
//   seq2seq / lm    truncate and insert special tokens
//       │
//       ▼
//   dataset / feed  Burn Dataset + fixed-size batch passes
//       │
//       ▼
//   batcher         Burn Batchers: examples -> Int tensors

/// Tokenization helpers shared by every reader
pub mod text;

/// Frequency counters, word indices and label maps
pub mod vocab;

/// `label<ws>sentence` files for classification
pub mod label;

/// CoNLL column files for sequence tagging
pub mod conll;

/// Tab-separated sentence pairs for seq2seq
pub mod seq2seq;

/// Running text for language modeling
pub mod lm;

/// In-memory example collections (Burn Dataset)
pub mod dataset;

/// Fixed-size batch passes over a dataset
pub mod feed;

/// Burn batchers producing Int tensors
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
