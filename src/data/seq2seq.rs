// ============================================================
// Layer 4 - Sentence Pair Reader (seq2seq)
// ============================================================
// Input: `source sentence<TAB>target sentence` per line.
//
// Both sides are encoded to `mxlen` arrays:
//
//   src: s0 s1 ... sK  PAD ...            src_len = K + 1
//   tgt: GO t0 ... tM  EOS  PAD ...       tgt_len = M + 3
//
// The target keeps two slots for GO and EOS, so at most
// mxlen - 2 target tokens survive truncation.

use std::{io::BufRead, path::Path};

use anyhow::{bail, Context, Result};

use crate::data::{
    text::open_lines,
    vocab::{Vocab, WordIndex, EOS, GO, PAD},
};
use crate::domain::example::Seq2SeqExample;

pub struct PairReader {
    pub mxlen: usize,
}

impl PairReader {
    pub fn new(mxlen: usize) -> Self {
        Self { mxlen }
    }

    /// Count tokens in the given tab-separated columns of every file.
    ///
    /// The counter is seeded with `<PAD>`, `<GO>` and `<EOS>`.
    pub fn build_vocab<I, P>(columns: &[usize], files: I) -> Result<Vocab>
    where
        I: IntoIterator<Item = Option<P>>,
        P: AsRef<Path>,
    {
        let mut vocab = Vocab::new();
        for special in [PAD, GO, EOS] {
            vocab.add(special);
        }

        for file in files.into_iter().flatten() {
            let path = file.as_ref();
            for (lineno, line) in open_lines(path)?.lines().enumerate() {
                let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
                let cols: Vec<&str> = line.split('\t').collect();
                for &col in columns {
                    let Some(text) = cols.get(col) else {
                        tracing::warn!("{}:{} has no column {}", path.display(), lineno + 1, col);
                        continue;
                    };
                    for w in text.split_whitespace() {
                        vocab.add(w);
                    }
                }
            }
        }
        Ok(vocab)
    }

    pub fn load(&self, path: &Path, src_index: &WordIndex, tgt_index: &WordIndex) -> Result<Vec<Seq2SeqExample>> {
        let examples = self
            .load_from(open_lines(path)?, src_index, tgt_index)
            .with_context(|| format!("Cannot load pairs from '{}'", path.display()))?;
        tracing::info!("Loaded {} sentence pairs from '{}'", examples.len(), path.display());
        Ok(examples)
    }

    pub fn load_from(
        &self,
        reader: impl BufRead,
        src_index: &WordIndex,
        tgt_index: &WordIndex,
    ) -> Result<Vec<Seq2SeqExample>> {
        if self.mxlen < 2 {
            bail!("mxlen ({}) must leave room for <GO> and <EOS>", self.mxlen);
        }
        let go = tgt_index.get(GO).context("target index has no <GO> token")?;
        let eos = tgt_index.get(EOS).context("target index has no <EOS> token")?;

        let mut examples = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((src, dst)) = line.split_once('\t') else {
                bail!("line {} has no tab-separated target", lineno + 1);
            };
            examples.push(self.encode(src, dst, src_index, tgt_index, go, eos));
        }
        Ok(examples)
    }

    fn encode(
        &self,
        src: &str,
        dst: &str,
        src_index: &WordIndex,
        tgt_index: &WordIndex,
        go: u32,
        eos: u32,
    ) -> Seq2SeqExample {
        let src: Vec<&str> = src.split_whitespace().collect();
        let dst: Vec<&str> = dst.split_whitespace().collect();

        let end1 = src.len().min(self.mxlen);
        let end2 = (dst.len() + 2).min(self.mxlen) - 2;

        let mut srcl = vec![src_index.pad_id(); self.mxlen];
        for (j, w) in src.iter().take(end1).enumerate() {
            srcl[j] = src_index.get_or_unk(w);
        }

        let mut tgtl = vec![tgt_index.pad_id(); self.mxlen];
        tgtl[0] = go;
        for (j, w) in dst.iter().take(end2).enumerate() {
            tgtl[j + 1] = tgt_index.get_or_unk(w);
        }
        tgtl[end2 + 1] = eos;

        Seq2SeqExample { src: srcl, tgt: tgtl, src_len: end1, tgt_len: end2 + 2 }
    }
}
