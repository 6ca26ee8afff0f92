// ============================================================
// Layer 4 - CoNLL Reader (sequence tagging)
// ============================================================
// Input: one token per line, columns separated by whitespace.
// The first column is the word, the last column its tag, and
// a blank line ends a sentence:
//
//   EU     NNP  B-ORG
//   rejects VBZ O
//
//   Peter  NNP  B-PER
//
// Each sentence becomes three fixed arrays:
//   words [mxlen]         word ids (cleaned word)
//   chars [mxlen, maxw]   char ids of the raw word, truncated
//   tags  [mxlen]         tag ids, 0 on padding positions

use std::{io::BufRead, path::Path};

use anyhow::{Context, Result};

use crate::data::{
    text::open_lines,
    vocab::{LabelMap, Vocab, WordIndex},
};
use crate::domain::example::TaggedExample;

/// Word normaliser applied before word lookups
pub type WordTransform = fn(&str) -> String;

/// Result of one streaming pass over the CoNLL files
#[derive(Debug, Clone, Default)]
pub struct ConllVocab {
    /// Longest sentence, in tokens
    pub max_sentence: usize,
    /// Longest raw word, in chars
    pub max_word: usize,
    pub chars: Vocab,
    pub words: Vocab,
}

/// A sentence as raw `(word, tag)` columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub words: Vec<String>,
    pub tags: Vec<String>,
}

impl Sentence {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

pub struct ConllReader {
    pub mxlen: usize,
    pub maxw: usize,
    pub transform: WordTransform,
}

impl ConllReader {
    pub fn new(mxlen: usize, maxw: usize, transform: WordTransform) -> Self {
        Self { mxlen, maxw, transform }
    }

    /// Stream every given file once, skipping absent ones.
    pub fn build_vocab<I, P>(files: I, transform: WordTransform) -> Result<ConllVocab>
    where
        I: IntoIterator<Item = Option<P>>,
        P: AsRef<Path>,
    {
        let mut acc = ConllVocab::default();
        for file in files.into_iter().flatten() {
            let path = file.as_ref();
            vocab_from(open_lines(path)?, transform, &mut acc)
                .with_context(|| format!("Cannot build vocab from '{}'", path.display()))?;
        }
        tracing::debug!(
            "CoNLL vocab: {} words, {} chars, max sentence {}, max word {}",
            acc.words.len(),
            acc.chars.len(),
            acc.max_sentence,
            acc.max_word
        );
        Ok(acc)
    }

    /// Group the file into sentences
    pub fn read_lines(path: &Path) -> Result<Vec<Sentence>> {
        read_sentences(open_lines(path)?).with_context(|| format!("Cannot read '{}'", path.display()))
    }

    /// Encode every sentence of `path`. New tags are appended to `tags`.
    ///
    /// Returns the examples and the raw sentences, whose order
    /// matches `TaggedExample::id`.
    pub fn load(
        &self,
        path: &Path,
        words: &WordIndex,
        chars: &WordIndex,
        tags: &mut LabelMap,
    ) -> Result<(Vec<TaggedExample>, Vec<Sentence>)> {
        let sentences = Self::read_lines(path)?;
        let examples = self.encode(&sentences, words, chars, tags);
        tracing::info!("Loaded {} tagged sentences from '{}'", examples.len(), path.display());
        Ok((examples, sentences))
    }

    pub fn encode(
        &self,
        sentences: &[Sentence],
        words: &WordIndex,
        chars: &WordIndex,
        tags: &mut LabelMap,
    ) -> Vec<TaggedExample> {
        sentences
            .iter()
            .enumerate()
            .map(|(id, s)| self.encode_one(id, s, words, chars, tags))
            .collect()
    }

    fn encode_one(
        &self,
        id: usize,
        sentence: &Sentence,
        words: &WordIndex,
        chars: &WordIndex,
        tags: &mut LabelMap,
    ) -> TaggedExample {
        let mut xs = vec![words.pad_id(); self.mxlen];
        let mut xs_ch = vec![chars.pad_id(); self.mxlen * self.maxw];
        let mut ys = vec![0u32; self.mxlen];

        let length = sentence.len().min(self.mxlen);
        for j in 0..length {
            let w = &sentence.words[j];
            ys[j] = tags.get_or_insert(&sentence.tags[j]);
            xs[j] = words.get_or_unk(&(self.transform)(w));
            for (k, c) in w.chars().take(self.maxw).enumerate() {
                let mut buf = [0u8; 4];
                xs_ch[j * self.maxw + k] = chars.get_or(c.encode_utf8(&mut buf), 0);
            }
        }

        TaggedExample { words: xs, chars: xs_ch, tags: ys, length, id, maxw: self.maxw }
    }
}

fn vocab_from(reader: impl BufRead, transform: WordTransform, acc: &mut ConllVocab) -> Result<()> {
    let mut sentence_len = 0usize;
    for line in reader.lines() {
        let line = line?;
        let Some(word) = line.split_whitespace().next() else {
            acc.max_sentence = acc.max_sentence.max(sentence_len);
            sentence_len = 0;
            continue;
        };

        sentence_len += 1;
        acc.words.add(transform(word));
        acc.max_word = acc.max_word.max(word.chars().count());
        for c in word.chars() {
            acc.chars.add(c);
        }
    }
    // file may end without a trailing blank line
    acc.max_sentence = acc.max_sentence.max(sentence_len);
    Ok(())
}

fn read_sentences(reader: impl BufRead) -> Result<Vec<Sentence>> {
    let mut sentences = Vec::new();
    let mut current = Sentence::default();

    for line in reader.lines() {
        let line = line?;
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() > 1 {
            current.words.push(cols[0].to_string());
            current.tags.push(cols[cols.len() - 1].to_string());
        } else if !current.is_empty() {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    Ok(sentences)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::data::text::{identity, web_cleanup};
    use crate::test_util::scratch_file;

    const DATA: &str = "EU NNP B-ORG\nrejects VBZ O\nGerman JJ B-MISC\n\n\nPeter NNP B-PER\nBlackburn NNP I-PER\n";

    #[test]
    fn test_read_lines_groups_sentences() {
        let s = read_sentences(Cursor::new(DATA)).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].words, vec!["EU", "rejects", "German"]);
        assert_eq!(s[0].tags, vec!["B-ORG", "O", "B-MISC"]);
        // last sentence has no trailing blank line
        assert_eq!(s[1].tags, vec!["B-PER", "I-PER"]);
    }

    #[test]
    fn test_build_vocab_tracks_maxima() {
        let path = scratch_file("conll-vocab", DATA);
        let v = ConllReader::build_vocab([Some(&path)], identity).unwrap();
        assert_eq!(v.max_sentence, 3);
        assert_eq!(v.max_word, "Blackburn".len());
        assert_eq!(v.words.count("EU"), 1);
        assert_eq!(v.chars.count("e"), 5);
    }

    #[test]
    fn test_build_vocab_merges_files() {
        let a = scratch_file("conll-merge-a", "x A O\n\n");
        let b = scratch_file("conll-merge-b", "x A O\ny B O\n");
        let v = ConllReader::build_vocab([Some(&a), None, Some(&b)], identity).unwrap();
        assert_eq!(v.words.count("x"), 2);
        assert_eq!(v.max_sentence, 2);
    }

    #[test]
    fn test_cleanup_applies_to_words_not_chars() {
        let path = scratch_file("conll-clean", "@bob X O\n");
        let v = ConllReader::build_vocab([Some(&path)], web_cleanup).unwrap();
        assert_eq!(v.words.count("@@@@"), 1);
        assert_eq!(v.chars.count("b"), 2);
    }

    #[test]
    fn test_encode_shapes_and_padding() {
        let sentences = read_sentences(Cursor::new(DATA)).unwrap();
        let path = scratch_file("conll-encode", DATA);
        let v = ConllReader::build_vocab([Some(&path)], identity).unwrap();
        let words = WordIndex::from_vocab(&v.words, 1, &[]);
        let chars = WordIndex::from_vocab(&v.chars, 1, &[]);
        let mut tags = LabelMap::for_tags();

        let reader = ConllReader::new(2, 3, identity);
        let ex = reader.encode(&sentences, &words, &chars, &mut tags);

        assert_eq!(ex.len(), 2);
        let first = &ex[0];
        // truncated to mxlen
        assert_eq!(first.length, 2);
        assert_eq!(first.words, vec![words.get("EU").unwrap(), words.get("rejects").unwrap()]);
        assert_eq!(first.tags, vec![1, 2]);
        assert_eq!(first.chars.len(), 6);
        // "EU" has two chars, third slot is padding
        assert_eq!(first.word_chars(0)[2], 0);
        assert_eq!(first.word_chars(1)[0], chars.get("r").unwrap());
        assert_eq!(ex[1].id, 1);
        assert_eq!(tags.get("B-PER"), Some(3));
    }

    #[test]
    fn test_encode_short_sentence_pads_tags_with_zero() {
        let sentences = read_sentences(Cursor::new("a X T\n")).unwrap();
        let words = WordIndex::with_specials(&[]);
        let chars = WordIndex::with_specials(&[]);
        let mut tags = LabelMap::for_tags();
        let ex = ConllReader::new(4, 2, identity).encode(&sentences, &words, &chars, &mut tags);
        assert_eq!(ex[0].tags, vec![1, 0, 0, 0]);
        assert_eq!(ex[0].words[0], words.unk_id());
        // unknown chars map to 0
        assert_eq!(ex[0].word_chars(0), &[0, 0]);
    }
}
