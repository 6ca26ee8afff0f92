// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting persistence and reporting:
//
//   checkpoint.rs   where/when models are saved, pointer to the
//                   latest checkpoint, run configs as JSON
//
//   vocab_store.rs  word indices and label maps as JSON, plus a
//                   Hugging Face tokenizer export of an index
//
//   metrics.rs      reporting sinks: console, CSV, in-memory

/// Checkpoint paths, latest pointer and config files
pub mod checkpoint;

/// Index and label map persistence
pub mod vocab_store;

/// Console, CSV and in-memory metric reporters
pub mod metrics;
