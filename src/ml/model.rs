// ============================================================
// Layer 5 - Model Traits
// ============================================================
// The trainers never touch tensors or gradients. A model is
// anything that can take one batch of encoded examples, run a
// forward (and, for training, backward + update) pass, and
// report what the trainer needs to compute metrics.
//
// Framework code lives entirely behind these traits; a Burn
// model would typically turn the batch into tensors with the
// batchers in `data::batcher` inside `train_step`.

use anyhow::Result;

use crate::data::lm::LmBatch;
use crate::domain::{
    example::{LabelExample, Seq2SeqExample, TaggedExample},
    traits::Persistable,
};

/// Output of one classifier step
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyStep {
    /// Mean loss over the batch
    pub loss: f64,
    /// Predicted label id per example
    pub guesses: Vec<u32>,
}

pub trait ClassifierModel: Persistable {
    /// Label names indexed by label id
    fn labels(&self) -> &[String];

    /// Forward, backward and parameter update on one batch
    fn train_step(&mut self, batch: &[LabelExample]) -> Result<ClassifyStep>;

    /// Forward only, no dropout
    fn eval_step(&mut self, batch: &[LabelExample]) -> Result<ClassifyStep>;
}

/// Output of one tagger step
#[derive(Debug, Clone, PartialEq)]
pub struct TagStep {
    pub loss: f64,
    /// Predicted tag ids per example; only the first `length`
    /// positions of each row are scored
    pub guesses: Vec<Vec<u32>>,
}

pub trait TaggerModel: Persistable {
    fn train_step(&mut self, batch: &[TaggedExample]) -> Result<TagStep>;
    fn eval_step(&mut self, batch: &[TaggedExample]) -> Result<TagStep>;
}

pub trait Seq2SeqModel: Persistable {
    /// Returns the mean per-token loss of the batch
    fn train_step(&mut self, batch: &[Seq2SeqExample]) -> Result<f64>;
    fn eval_step(&mut self, batch: &[Seq2SeqExample]) -> Result<f64>;
}

/// Output of one language-model step
#[derive(Debug, Clone, PartialEq)]
pub struct LmStep<S> {
    pub loss: f64,
    /// Recurrent state to feed into the next window
    pub state: S,
}

/// A recurrent language model trained with truncated BPTT.
///
/// The state returned by one window is passed to the next, so
/// rows of an `LmFeed` are read as continuous text.
pub trait LanguageModel: Persistable {
    type State;

    /// Length of one BPTT window
    fn nbptt(&self) -> usize;

    /// Fresh state at the start of a pass
    fn initial_state(&mut self) -> Result<Self::State>;

    fn train_step(&mut self, batch: &LmBatch, state: Self::State) -> Result<LmStep<Self::State>>;
    fn eval_step(&mut self, batch: &LmBatch, state: Self::State) -> Result<LmStep<Self::State>>;
}
