// ============================================================
// Layer 2 - VocabUseCase
// ============================================================
// Builds every index a task needs from its files and saves them:
//
//   Step 1: Count tokens over ALL files   (Layer 4 - data)
//   Step 2: Turn counters into indices    (Layer 4 - data)
//   Step 3: Save indices + tokenizers     (Layer 6 - infra)
//
// Counting over train, valid and test together means evaluation
// text never falls back to <UNK> for words seen only there.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    conll::{ConllReader, WordTransform},
    label::{LabelReader, LabelReaderOptions},
    lm::LmReader,
    seq2seq::PairReader,
    text::{identity, web_cleanup},
    vocab::{WordIndex, EOS, GO, PADDING, UNK},
};
use crate::infra::vocab_store::VocabStore;

// ─── Task ─────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// `label<ws>sentence` lines
    Classify,
    /// CoNLL columns, word first and tag last
    Tagger,
    /// `source<TAB>target` lines
    Seq2Seq,
    /// Running text
    Lm,
}

// ─── TextOptions ──────────────────────────────────────────────────────────────
/// How raw text is normalised before counting and encoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    /// Lowercase and clean classification text
    pub clean: bool,
    /// Character tokens for classification
    pub chars: bool,
    /// Replace web tokens such as URLs and mentions in tagger words
    pub web_cleanup: bool,
    /// Minimum count for a regular token to get an id
    pub min_freq: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self { clean: false, chars: false, web_cleanup: false, min_freq: 1 }
    }
}

impl TextOptions {
    pub(crate) fn label_options(&self) -> LabelReaderOptions {
        LabelReaderOptions { clean: self.clean, chars: self.chars }
    }

    pub(crate) fn word_transform(&self) -> WordTransform {
        if self.web_cleanup {
            web_cleanup
        } else {
            identity
        }
    }
}

// ─── Indices ──────────────────────────────────────────────────────────────────
/// The indices of one task, plus the length statistics gathered
/// while counting.
#[derive(Debug, Clone)]
pub enum Indices {
    Classify { words: WordIndex },
    Tagger { words: WordIndex, chars: WordIndex, max_sentence: usize, max_word: usize },
    Seq2Seq { src: WordIndex, tgt: WordIndex },
    Lm { words: WordIndex, chars: WordIndex, max_word: usize },
}

impl Indices {
    /// Count `files` and build the indices for `task`.
    pub fn build(task: Task, files: &[PathBuf], opts: &TextOptions) -> Result<Self> {
        if files.is_empty() {
            bail!("No input files given");
        }
        let files = || files.iter().map(Some);

        let indices = match task {
            Task::Classify => {
                // mxlen plays no part in counting
                let reader = LabelReader::new(opts.label_options(), 0, 0);
                let vocab = reader.build_vocab(files())?;
                Indices::Classify { words: WordIndex::from_vocab(&vocab, opts.min_freq, &[]) }
            }
            Task::Tagger => {
                let v = ConllReader::build_vocab(files(), opts.word_transform())?;
                if v.max_sentence == 0 {
                    bail!("No sentences found in the CoNLL input");
                }
                Indices::Tagger {
                    words: WordIndex::from_vocab(&v.words, opts.min_freq, &[]),
                    chars: WordIndex::from_vocab(&v.chars, 1, &[]),
                    max_sentence: v.max_sentence,
                    max_word: v.max_word,
                }
            }
            Task::Seq2Seq => {
                let src = PairReader::build_vocab(&[0], files())?;
                let tgt = PairReader::build_vocab(&[1], files())?;
                Indices::Seq2Seq {
                    src: WordIndex::from_vocab(&src, opts.min_freq, &[GO, EOS]),
                    tgt: WordIndex::from_vocab(&tgt, opts.min_freq, &[GO, EOS]),
                }
            }
            Task::Lm => {
                let v = LmReader::build_vocab(files())?;
                Indices::Lm {
                    words: WordIndex::from_vocab(&v.words, opts.min_freq, &[EOS]),
                    chars: WordIndex::from_vocab(&v.chars, 1, &[]),
                    max_word: v.max_word,
                }
            }
        };
        Ok(indices)
    }

    /// Every index by the name it is saved under
    pub fn named(&self) -> Vec<(&'static str, &WordIndex)> {
        match self {
            Indices::Classify { words } => vec![("words", words)],
            Indices::Tagger { words, chars, .. } | Indices::Lm { words, chars, .. } => {
                vec![("words", words), ("chars", chars)]
            }
            Indices::Seq2Seq { src, tgt } => vec![("src", src), ("tgt", tgt)],
        }
    }

    /// Save every index, exporting word-level ones as tokenizers too.
    ///
    /// Returns the size of each index by name.
    pub fn save(&self, store: &VocabStore, opts: &TextOptions) -> Result<BTreeMap<String, usize>> {
        let mut sizes = BTreeMap::new();
        for (name, index) in self.named() {
            store.save_index(name, index)?;
            match self.tokenizer_unk(name, opts) {
                Some(unk) => {
                    store.export_tokenizer(name, index, unk)?;
                }
                None => tracing::debug!("No tokenizer export for '{name}'"),
            }
            sizes.insert(name.to_string(), index.len());
        }
        Ok(sizes)
    }

    /// Token unknown words map to in an exported tokenizer, or `None`
    /// when a whitespace WordLevel tokenizer cannot give the reader's
    /// ids: char indices, and words rewritten before lookup.
    fn tokenizer_unk(&self, name: &str, opts: &TextOptions) -> Option<&'static str> {
        if name == "chars" {
            return None;
        }
        match self {
            Indices::Classify { .. } if opts.clean || opts.chars => None,
            Indices::Classify { .. } => Some(PADDING),
            Indices::Tagger { .. } if opts.web_cleanup => None,
            _ => Some(UNK),
        }
    }
}

// ─── VocabConfig ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabConfig {
    pub task: Task,
    pub files: Vec<PathBuf>,
    pub out_dir: PathBuf,
    #[serde(flatten)]
    pub text: TextOptions,
}

// ─── VocabUseCase ─────────────────────────────────────────────────────────────
pub struct VocabUseCase {
    config: VocabConfig,
}

impl VocabUseCase {
    pub fn new(config: VocabConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<BTreeMap<String, usize>> {
        let cfg = &self.config;
        tracing::info!("Building {:?} vocabularies from {} file(s)", cfg.task, cfg.files.len());

        let indices = Indices::build(cfg.task, &cfg.files, &cfg.text)?;
        let store = VocabStore::new(&cfg.out_dir)?;
        let sizes = indices.save(&store, &cfg.text)?;

        for (name, size) in &sizes {
            tracing::info!("{name}: {size} ids");
        }
        Ok(sizes)
    }

    pub fn out_dir(&self) -> &Path {
        &self.config.out_dir
    }
}
