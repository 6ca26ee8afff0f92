// ============================================================
// Layer 5 - Training
// ============================================================
// Everything between encoded examples and reported metrics.
//
//   model.rs      traits a task model implements; the only seam
//                 between the trainers and a tensor framework
//   confusion.rs  confusion matrix and classification metrics
//   trainer.rs    EpochTrainer trait, FitConfig and the shared
//                 fit loop with early stopping
//   classify.rs   ClassifyTrainer
//   tagger.rs     TaggerTrainer
//   seq2seq.rs    Seq2SeqTrainer
//   lm.rs         LanguageModelTrainer (truncated BPTT)

pub mod model;

pub mod confusion;

/// Shared fit loop
pub mod trainer;

pub mod classify;
pub mod lm;
pub mod seq2seq;
pub mod tagger;
