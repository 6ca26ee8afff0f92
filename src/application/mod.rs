// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal. No text
// parsing, no tensor code and no printing here; only workflow
// coordination.
//
//   vocab_use_case.rs    count files, build and save indices
//   prepare_use_case.rs  indices + encoded train/valid/test splits

/// Vocabulary building workflow
pub mod vocab_use_case;

/// Data preparation workflow
pub mod prepare_use_case;
