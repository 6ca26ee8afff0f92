// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain structs and traits shared by every other layer.
//
// Rules for this layer:
//   - NO Burn types
//   - NO file I/O
//   - Only data shapes and the abstractions other layers implement

// Encoded examples for each task
pub mod example;

// Metric mappings and training phases
pub mod metrics;

// Persistence and reporting seams
pub mod traits;
