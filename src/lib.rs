// ============================================================
// seq-baseline
// ============================================================
// Text -> index tensor pipelines and epoch training loops for
// sequence models (classification, tagging, seq2seq, LM).
//
// Layers:
//   cli          argument parsing, routes to use cases
//   application  use cases that wire readers and stores together
//   domain       plain data types and the seams other layers implement
//   data         tokenization, vocabularies, per-task readers, batching
//   ml           model traits, confusion matrix, epoch trainers
//   infra        checkpoints, vocabulary store, metric reporters

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

#[cfg(test)]
pub(crate) mod test_util;
