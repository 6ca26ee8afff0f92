// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the `vocab` and `prepare` subcommands and their flags.
// Each Args struct converts into the application-layer config,
// so the use cases never see clap types.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    prepare_use_case::PrepareConfig,
    vocab_use_case::{Task, TextOptions, VocabConfig},
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count tokens and save the indices of a task
    Vocab(VocabArgs),

    /// Build indices and encode train/valid/test for a task
    Prepare(PrepareArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskArg {
    Classify,
    Tagger,
    Seq2seq,
    Lm,
}

impl From<TaskArg> for Task {
    fn from(t: TaskArg) -> Self {
        match t {
            TaskArg::Classify => Task::Classify,
            TaskArg::Tagger => Task::Tagger,
            TaskArg::Seq2seq => Task::Seq2Seq,
            TaskArg::Lm => Task::Lm,
        }
    }
}

/// Text normalisation flags shared by both commands
#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    /// Lowercase and clean classification text
    #[arg(long)]
    pub clean: bool,

    /// Use characters as classification tokens
    #[arg(long)]
    pub chars: bool,

    /// Replace web tokens such as URLs and mentions in tagger words
    #[arg(long)]
    pub web_cleanup: bool,

    /// Minimum count for a token to be indexed
    #[arg(long, default_value_t = 1)]
    pub min_freq: usize,
}

impl From<TextArgs> for TextOptions {
    fn from(a: TextArgs) -> Self {
        TextOptions { clean: a.clean, chars: a.chars, web_cleanup: a.web_cleanup, min_freq: a.min_freq }
    }
}

#[derive(Args, Debug)]
pub struct VocabArgs {
    #[arg(long, value_enum)]
    pub task: TaskArg,

    /// Files to count, typically train, valid and test
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory the indices are written to
    #[arg(long, default_value = "vocab")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub text: TextArgs,
}

impl From<VocabArgs> for VocabConfig {
    fn from(a: VocabArgs) -> Self {
        VocabConfig { task: a.task.into(), files: a.files, out_dir: a.out_dir, text: a.text.into() }
    }
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[arg(long, value_enum)]
    pub task: TaskArg,

    #[arg(long)]
    pub train: PathBuf,

    /// Held out from train when absent
    #[arg(long)]
    pub valid: Option<PathBuf>,

    #[arg(long)]
    pub test: Option<PathBuf>,

    #[arg(long, default_value = "prepared")]
    pub out_dir: PathBuf,

    /// Fixed sequence length
    #[arg(long, default_value_t = 100)]
    pub mxlen: usize,

    /// Widest convolution filter; sets classification padding
    #[arg(long, default_value_t = 5)]
    pub mxfiltsz: usize,

    /// Longest word in characters
    #[arg(long, default_value_t = 40)]
    pub maxw: usize,

    #[command(flatten)]
    pub text: TextArgs,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of train held out as validation
    #[arg(long, default_value_t = 0.1)]
    pub valid_fraction: f64,

    /// Write encoded splits as JSON lines
    #[arg(long)]
    pub dump: bool,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            task: a.task.into(),
            train_file: a.train,
            valid_file: a.valid,
            test_file: a.test,
            out_dir: a.out_dir,
            mxlen: a.mxlen,
            mxfiltsz: a.mxfiltsz,
            maxw: a.maxw,
            text: a.text.into(),
            seed: a.seed,
            valid_fraction: a.valid_fraction,
            dump: a.dump,
        }
    }
}
