// ============================================================
// Layer 4 - Language Model Reader
// ============================================================
// Input: running text, one sentence per line. Every line is
// terminated by an <EOS> token so sentence boundaries survive
// in the flat token stream.
//
// Batching follows truncated backprop through time:
//
//   stream  w0 w1 w2 ... w(n-1)
//   rows    reshape the first B * (n / B) tokens into B rows
//   step i  x = rows[:, i*T .. (i+1)*T]
//           y = rows[:, i*T+1 .. (i+1)*T+1]     (next token)
//
// with B = batch size and T = nbptt. There are
// (n / B - 1) / T full steps per pass; the tail is dropped.

use std::{io::BufRead, path::Path};

use anyhow::{bail, Context, Result};

use crate::data::{
    text::open_lines,
    vocab::{Vocab, WordIndex, EOS},
};
use crate::domain::example::TokenStream;

/// Counters from one pass over the LM files
#[derive(Debug, Clone, Default)]
pub struct LmVocab {
    pub words: Vocab,
    pub chars: Vocab,
    /// Longest word in chars
    pub max_word: usize,
}

pub struct LmReader;

impl LmReader {
    pub fn build_vocab<I, P>(files: I) -> Result<LmVocab>
    where
        I: IntoIterator<Item = Option<P>>,
        P: AsRef<Path>,
    {
        let mut acc = LmVocab::default();
        for file in files.into_iter().flatten() {
            let path = file.as_ref();
            for line in open_lines(path)?.lines() {
                let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
                for w in line.split_whitespace().chain(std::iter::once(EOS)) {
                    acc.words.add(w);
                    acc.max_word = acc.max_word.max(w.chars().count());
                    for c in w.chars() {
                        acc.chars.add(c);
                    }
                }
            }
        }
        Ok(acc)
    }

    pub fn load(path: &Path, words: &WordIndex, chars: &WordIndex, maxw: usize) -> Result<TokenStream> {
        let stream = Self::load_from(open_lines(path)?, words, chars, maxw)
            .with_context(|| format!("Cannot load tokens from '{}'", path.display()))?;
        tracing::info!("Loaded {} tokens from '{}'", stream.len(), path.display());
        Ok(stream)
    }

    pub fn load_from(reader: impl BufRead, words: &WordIndex, chars: &WordIndex, maxw: usize) -> Result<TokenStream> {
        let mut stream = TokenStream { words: Vec::new(), chars: Vec::new(), maxw };
        for line in reader.lines() {
            let line = line?;
            for w in line.split_whitespace().chain(std::iter::once(EOS)) {
                stream.words.push(words.get_or_unk(w));
                let mut row = vec![chars.pad_id(); maxw];
                for (k, c) in w.chars().take(maxw).enumerate() {
                    let mut buf = [0u8; 4];
                    row[k] = chars.get_or(c.encode_utf8(&mut buf), 0);
                }
                stream.chars.extend(row);
            }
        }
        Ok(stream)
    }
}

// ─── LmBatch ──────────────────────────────────────────────────────────────────
/// One BPTT window over `batch_size` parallel rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmBatch {
    /// `[batch_size, nbptt]` row-major
    pub x: Vec<u32>,
    /// `[batch_size, nbptt, maxw]` row-major
    pub xch: Vec<u32>,
    /// `[batch_size, nbptt]`, x shifted one token ahead
    pub y: Vec<u32>,
    pub batch_size: usize,
    pub nbptt: usize,
    pub maxw: usize,
}

// ─── LmFeed ───────────────────────────────────────────────────────────────────
/// Slices a token stream into BPTT batches.
pub struct LmFeed {
    stream: TokenStream,
    batch_size: usize,
    nbptt: usize,
}

impl LmFeed {
    pub fn new(stream: TokenStream, batch_size: usize, nbptt: usize) -> Result<Self> {
        if batch_size == 0 || nbptt == 0 {
            bail!("batch_size and nbptt must be positive");
        }
        Ok(Self { stream, batch_size, nbptt })
    }

    pub fn nbptt(&self) -> usize {
        self.nbptt
    }

    fn row_len(&self) -> usize {
        self.stream.len() / self.batch_size
    }

    /// Number of full windows per pass
    pub fn len(&self) -> usize {
        self.row_len().saturating_sub(1) / self.nbptt
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`th window, or `None` past the end
    pub fn batch(&self, i: usize) -> Option<LmBatch> {
        if i >= self.len() {
            return None;
        }
        let (b, t, w) = (self.batch_size, self.nbptt, self.stream.maxw);
        let row_len = self.row_len();

        let mut x = Vec::with_capacity(b * t);
        let mut y = Vec::with_capacity(b * t);
        let mut xch = Vec::with_capacity(b * t * w);
        for row in 0..b {
            let start = row * row_len + i * t;
            x.extend_from_slice(&self.stream.words[start..start + t]);
            y.extend_from_slice(&self.stream.words[start + 1..start + t + 1]);
            xch.extend_from_slice(&self.stream.chars[start * w..(start + t) * w]);
        }
        Some(LmBatch { x, xch, y, batch_size: b, nbptt: t, maxw: w })
    }

    pub fn iter(&self) -> impl Iterator<Item = LmBatch> + '_ {
        (0..self.len()).filter_map(move |i| self.batch(i))
    }
}
