// ============================================================
// Layer 4 - Label/Sentence Reader (classification)
// ============================================================
// Input: one example per line, `label<ws>token token ...`
//
// Each sentence becomes a fixed `mxlen` id array:
//
//   [PAD x half] [tok0 ... tokN] [PAD ...]
//    ^ half = mxfiltsz / 2
//
// The leading zero block lets a convolution with the widest
// filter run over the first token without padding on its own,
// and the text is truncated to mxlen - 2*half so the trailing
// block always fits too.
//
// Unknown tokens map to <PADDING>, not <UNK>: a classifier sees
// them as absent.

use std::{io::BufRead, path::Path};

use anyhow::{bail, Context, Result};

use crate::data::{
    text::{label_and_sentence, open_lines},
    vocab::{LabelMap, Vocab, WordIndex},
};
use crate::domain::example::LabelExample;

/// Reader options shared by vocabulary building and loading
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelReaderOptions {
    /// Lowercase and TREC-clean every word
    pub clean: bool,
    /// One token per character
    pub chars: bool,
}

pub struct LabelReader {
    pub options: LabelReaderOptions,
    pub mxlen: usize,
    pub mxfiltsz: usize,
}

impl LabelReader {
    pub fn new(options: LabelReaderOptions, mxlen: usize, mxfiltsz: usize) -> Self {
        Self { options, mxlen, mxfiltsz }
    }

    /// Count tokens across all given files, skipping absent ones.
    pub fn build_vocab<I, P>(&self, files: I) -> Result<Vocab>
    where
        I: IntoIterator<Item = Option<P>>,
        P: AsRef<Path>,
    {
        let mut vocab = Vocab::new();
        for file in files.into_iter().flatten() {
            let path = file.as_ref();
            vocab.merge(self.vocab_from(open_lines(path)?, path)?);
        }
        tracing::debug!("Label vocab has {} distinct tokens", vocab.len());
        Ok(vocab)
    }

    fn vocab_from(&self, reader: impl BufRead, path: &Path) -> Result<Vocab> {
        let mut vocab = Vocab::new();
        for line in reader.lines() {
            let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
            if let Some((_, tokens)) = label_and_sentence(&line, self.options.clean, self.options.chars) {
                for t in tokens {
                    vocab.add(t);
                }
            }
        }
        Ok(vocab)
    }

    /// Encode every line of `path`. New labels are appended to `labels`.
    pub fn load(&self, path: &Path, index: &WordIndex, labels: &mut LabelMap) -> Result<Vec<LabelExample>> {
        let examples = self
            .load_from(open_lines(path)?, index, labels)
            .with_context(|| format!("Cannot load labelled examples from '{}'", path.display()))?;
        tracing::info!("Loaded {} labelled examples from '{}'", examples.len(), path.display());
        Ok(examples)
    }

    pub fn load_from(
        &self,
        reader: impl BufRead,
        index: &WordIndex,
        labels: &mut LabelMap,
    ) -> Result<Vec<LabelExample>> {
        let half = self.mxfiltsz / 2;
        if self.mxlen <= 2 * half {
            bail!("mxlen ({}) must exceed the filter padding (2 * {})", self.mxlen, half);
        }
        let max_tokens = self.mxlen - 2 * half;
        let pad = index.pad_id();

        let mut examples = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Cannot read line {}", lineno + 1))?;
            let Some((label, tokens)) = label_and_sentence(&line, self.options.clean, self.options.chars) else {
                continue;
            };

            let y = labels.get_or_insert(&label);
            let mut x = vec![pad; self.mxlen];
            for (j, t) in tokens.iter().take(max_tokens).enumerate() {
                x[j + half] = index.get_or(t, pad);
            }
            examples.push(LabelExample { x, y });
        }
        Ok(examples)
    }
}
