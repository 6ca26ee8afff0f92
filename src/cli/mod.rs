// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. The only
// layer that prints.
//
//   seq-baseline vocab   --task tagger train.conll valid.conll
//   seq-baseline prepare --task classify --train train.txt --dump

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, VocabArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seq-baseline",
    version,
    about = "Build vocabularies and encode datasets for sequence model baselines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Vocab(args) => run_vocab(args),
            Commands::Prepare(args) => run_prepare(args),
        }
    }
}

fn run_vocab(args: VocabArgs) -> Result<()> {
    use crate::application::vocab_use_case::VocabUseCase;

    let use_case = VocabUseCase::new(args.into());
    let sizes = use_case.execute()?;

    println!("Saved to '{}':", use_case.out_dir().display());
    for (name, size) in sizes {
        println!("  {name:<6} {size}");
    }
    Ok(())
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let out_dir = args.out_dir.clone();
    let summary = PrepareUseCase::new(args.into()).execute()?;

    println!("Prepared {:?} data in '{}'", summary.task, out_dir.display());
    for (name, size) in &summary.vocab {
        println!("  {name:<6} {size} ids");
    }
    println!("  train  {}", summary.train);
    println!("  valid  {}{}", summary.valid, if summary.valid_carved { " (held out from train)" } else { "" });
    if let Some(test) = summary.test {
        println!("  test   {test}");
    }
    Ok(())
}
