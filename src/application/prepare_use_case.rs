// ============================================================
// Layer 2 - PrepareUseCase
// ============================================================
// Turns raw task files into encoded, ready-to-train splits:
//
//   Step 1: Build indices over every file   (VocabUseCase)
//   Step 2: Save indices + tokenizers       (Layer 6 - infra)
//   Step 3: Encode train / valid / test     (Layer 4 - data)
//   Step 4: Carve valid from train if none  (Layer 4 - data)
//   Step 5: Save labels, config and summary (Layer 6 - infra)
//   Step 6: Optionally dump encoded splits as JSON lines
//
// Output directory:
//
//   out/
//     words.vocab.json  words.tokenizer.json  ...
//     classes.labels.json | tags.labels.json
//     prepare_config.json
//     summary.json
//     train.jsonl  valid.jsonl  test.jsonl   (with --dump)

use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::vocab_use_case::{Indices, Task, TextOptions};
use crate::data::{
    conll::ConllReader,
    label::LabelReader,
    lm::LmReader,
    seq2seq::PairReader,
    splitter::split_train_val,
    vocab::LabelMap,
};
use crate::domain::example::TokenStream;
use crate::infra::vocab_store::VocabStore;

// ─── PrepareConfig ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub task: Task,
    pub train_file: PathBuf,
    pub valid_file: Option<PathBuf>,
    pub test_file: Option<PathBuf>,
    pub out_dir: PathBuf,
    /// Fixed sequence length of encoded examples
    pub mxlen: usize,
    /// Widest convolution filter (classification padding)
    pub mxfiltsz: usize,
    /// Longest word in characters (tagger, lm)
    pub maxw: usize,
    #[serde(flatten)]
    pub text: TextOptions,
    /// Seed of the validation carve-out
    pub seed: u64,
    /// Share of train held out when no valid file is given
    pub valid_fraction: f64,
    /// Also write encoded splits as JSON lines
    pub dump: bool,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            task: Task::Classify,
            train_file: PathBuf::from("data/train.txt"),
            valid_file: None,
            test_file: None,
            out_dir: PathBuf::from("prepared"),
            mxlen: 100,
            mxfiltsz: 5,
            maxw: 40,
            text: TextOptions::default(),
            seed: 42,
            valid_fraction: 0.1,
            dump: false,
        }
    }
}

impl PrepareConfig {
    fn files(&self) -> Vec<PathBuf> {
        std::iter::once(self.train_file.clone())
            .chain(self.valid_file.clone())
            .chain(self.test_file.clone())
            .collect()
    }
}

// ─── PrepareSummary ───────────────────────────────────────────────────────────
/// What was written, saved as `summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareSummary {
    pub task: Task,
    /// Size of every saved index
    pub vocab: BTreeMap<String, usize>,
    /// Number of labels or tags, if the task has any
    pub labels: Option<usize>,
    /// Sequence length actually used
    pub mxlen: usize,
    /// Word width actually used, if the task encodes characters
    pub maxw: Option<usize>,
    /// Examples, or tokens for a language model
    pub train: usize,
    pub valid: usize,
    pub test: Option<usize>,
    pub valid_carved: bool,
}

// ─── EncodedSplit ─────────────────────────────────────────────────────────────
/// What one encoded split looks like for the steps that only count,
/// carve and dump it.
pub trait EncodedSplit: Sized {
    fn count(&self) -> usize;

    /// Split into (train, valid) with `valid_fraction` held out
    fn carve(self, valid_fraction: f64, seed: u64) -> (Self, Self);

    fn dump(&self, path: &Path) -> Result<()>;
}

impl<T: Serialize> EncodedSplit for Vec<T> {
    fn count(&self) -> usize {
        self.len()
    }

    fn carve(self, valid_fraction: f64, seed: u64) -> (Self, Self) {
        split_train_val(self, 1.0 - valid_fraction, seed)
    }

    /// One example per line
    fn dump(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
        let mut out = BufWriter::new(file);
        for example in self {
            serde_json::to_writer(&mut out, example)?;
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl EncodedSplit for TokenStream {
    fn count(&self) -> usize {
        self.len()
    }

    /// Running text is split, never shuffled: the held-out part is
    /// the tail of the stream.
    fn carve(mut self, valid_fraction: f64, _seed: u64) -> (Self, Self) {
        let keep = ((self.len() as f64) * (1.0 - valid_fraction)).round().max(0.0) as usize;
        let keep = keep.min(self.len());
        let tail = TokenStream {
            words: self.words.split_off(keep),
            chars: self.chars.split_off(keep * self.maxw),
            maxw: self.maxw,
        };
        (self, tail)
    }

    /// The whole stream as one JSON object
    fn dump(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

struct Splits<S> {
    train: S,
    valid: S,
    test: Option<S>,
    carved: bool,
}

// ─── PrepareUseCase ───────────────────────────────────────────────────────────
pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    /// Execute the full preparation pipeline end to end
    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg = &self.config;
        if !(0.0..1.0).contains(&cfg.valid_fraction) {
            bail!("valid_fraction must be in [0, 1), got {}", cfg.valid_fraction);
        }

        // ── Step 1-2: indices ────────────────────────────────────────────────
        tracing::info!("Preparing {:?} data from '{}'", cfg.task, cfg.train_file.display());
        let indices = Indices::build(cfg.task, &cfg.files(), &cfg.text)?;
        let store = VocabStore::new(&cfg.out_dir)?;
        let vocab = indices.save(&store, &cfg.text)?;

        // ── Step 3-4: encode ────────────────────────────────────────────────
        let mut summary = match &indices {
            Indices::Classify { words } => {
                let reader = LabelReader::new(cfg.text.label_options(), cfg.mxlen, cfg.mxfiltsz);
                let mut labels = LabelMap::for_classes();
                let splits = self.load_splits(|p| reader.load(p, words, &mut labels))?;
                store.save_labels("classes", &labels)?;
                self.finish(splits, Some(labels.len()), cfg.mxlen, None)?
            }
            Indices::Tagger { words, chars, max_sentence, max_word } => {
                let mxlen = cfg.mxlen.min(*max_sentence);
                let maxw = cfg.maxw.min(*max_word);
                tracing::info!("Tagger shapes: mxlen {mxlen}, maxw {maxw}");
                let reader = ConllReader::new(mxlen, maxw, cfg.text.word_transform());
                let mut tags = LabelMap::for_tags();
                let splits = self.load_splits(|p| Ok(reader.load(p, words, chars, &mut tags)?.0))?;
                store.save_labels("tags", &tags)?;
                self.finish(splits, Some(tags.len()), mxlen, Some(maxw))?
            }
            Indices::Seq2Seq { src, tgt } => {
                let reader = PairReader::new(cfg.mxlen);
                let splits = self.load_splits(|p| reader.load(p, src, tgt))?;
                self.finish(splits, None, cfg.mxlen, None)?
            }
            Indices::Lm { words, chars, max_word } => {
                let maxw = cfg.maxw.min(*max_word);
                let splits = self.load_splits(|p| LmReader::load(p, words, chars, maxw))?;
                self.finish(splits, None, 0, Some(maxw))?
            }
        };
        summary.vocab = vocab;

        // ── Step 5: config + summary ────────────────────────────────────────
        write_json(&cfg.out_dir.join("prepare_config.json"), cfg)?;
        write_json(&cfg.out_dir.join("summary.json"), &summary)?;
        tracing::info!(
            "Prepared {} train, {} valid{} into '{}'",
            summary.train,
            summary.valid,
            summary.test.map(|n| format!(", {n} test")).unwrap_or_default(),
            cfg.out_dir.display()
        );
        Ok(summary)
    }

    fn load_splits<S, F>(&self, mut load: F) -> Result<Splits<S>>
    where
        S: EncodedSplit,
        F: FnMut(&Path) -> Result<S>,
    {
        let cfg = &self.config;
        // train, valid, test: new labels get ids in this order
        let train = load(&cfg.train_file)?;
        let valid = cfg.valid_file.as_deref().map(&mut load).transpose()?;
        let test = cfg.test_file.as_deref().map(&mut load).transpose()?;

        let splits = match valid {
            Some(valid) => Splits { train, valid, test, carved: false },
            None => {
                tracing::info!("No validation file; holding out {:.0}% of train", cfg.valid_fraction * 100.0);
                let (train, valid) = train.carve(cfg.valid_fraction, cfg.seed);
                Splits { train, valid, test, carved: true }
            }
        };

        if splits.train.count() == 0 {
            bail!("Training split of '{}' is empty", cfg.train_file.display());
        }
        Ok(splits)
    }

    fn finish<S: EncodedSplit>(
        &self,
        splits: Splits<S>,
        labels: Option<usize>,
        mxlen: usize,
        maxw: Option<usize>,
    ) -> Result<PrepareSummary> {
        let cfg = &self.config;
        if cfg.dump {
            splits.train.dump(&cfg.out_dir.join("train.jsonl"))?;
            splits.valid.dump(&cfg.out_dir.join("valid.jsonl"))?;
            if let Some(test) = &splits.test {
                test.dump(&cfg.out_dir.join("test.jsonl"))?;
            }
        }

        Ok(PrepareSummary {
            task: cfg.task,
            vocab: BTreeMap::new(),
            labels,
            mxlen,
            maxw,
            train: splits.train.count(),
            valid: splits.valid.count(),
            test: splits.test.as_ref().map(|t| t.count()),
            valid_carved: splits.carved,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?).with_context(|| format!("Cannot write '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::{LabelExample, Seq2SeqExample};
    use crate::test_util::scratch_dir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_classify_carves_validation_split() {
        let dir = scratch_dir("prepare-classify");
        let lines: String = (0..10).map(|i| format!("{} w{i} common\n", i % 2)).collect();
        let cfg = PrepareConfig {
            train_file: write(&dir, "train.txt", &lines),
            out_dir: dir.join("out"),
            mxlen: 6,
            mxfiltsz: 2,
            valid_fraction: 0.2,
            dump: true,
            ..PrepareConfig::default()
        };

        let summary = PrepareUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.train, 8);
        assert_eq!(summary.valid, 2);
        assert!(summary.valid_carved);
        assert_eq!(summary.labels, Some(2));
        // <PADDING> <UNK> common w0..w9
        assert_eq!(summary.vocab["words"], 13);

        let dumped = fs::read_to_string(dir.join("out/train.jsonl")).unwrap();
        let first: LabelExample = serde_json::from_str(dumped.lines().next().unwrap()).unwrap();
        assert_eq!(first.x.len(), 6);
        assert!(dir.join("out/summary.json").exists());
        assert!(dir.join("out/classes.labels.json").exists());
    }

    #[test]
    fn test_valid_labels_numbered_before_test_labels() {
        let dir = scratch_dir("prepare-label-order");
        let cfg = PrepareConfig {
            train_file: write(&dir, "train.txt", "a x\na y\n"),
            valid_file: Some(write(&dir, "valid.txt", "b x\n")),
            test_file: Some(write(&dir, "test.txt", "c y\n")),
            out_dir: dir.join("out"),
            ..PrepareConfig::default()
        };

        let summary = PrepareUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.labels, Some(3));

        let labels = VocabStore::new(dir.join("out")).unwrap().load_labels("classes").unwrap();
        assert_eq!(labels.get("a"), Some(0));
        assert_eq!(labels.get("b"), Some(1));
        assert_eq!(labels.get("c"), Some(2));
    }

    #[test]
    fn test_seq2seq_with_explicit_splits() {
        let dir = scratch_dir("prepare-s2s");
        let cfg = PrepareConfig {
            task: Task::Seq2Seq,
            train_file: write(&dir, "train.tsv", "a b\tx y\nb c\ty z\n"),
            valid_file: Some(write(&dir, "valid.tsv", "a c\tx z\n")),
            test_file: Some(write(&dir, "test.tsv", "c\tz\n")),
            out_dir: dir.join("out"),
            mxlen: 5,
            dump: true,
            ..PrepareConfig::default()
        };

        let summary = PrepareUseCase::new(cfg).execute().unwrap();
        assert_eq!((summary.train, summary.valid, summary.test), (2, 1, Some(1)));
        assert!(!summary.valid_carved);
        assert!(summary.vocab.contains_key("src") && summary.vocab.contains_key("tgt"));

        let dumped = fs::read_to_string(dir.join("out/test.jsonl")).unwrap();
        let ex: Seq2SeqExample = serde_json::from_str(dumped.trim()).unwrap();
        assert_eq!(ex.tgt_len, 3);
    }

    #[test]
    fn test_tagger_shapes_clamped_to_data() {
        let dir = scratch_dir("prepare-tagger");
        let cfg = PrepareConfig {
            task: Task::Tagger,
            train_file: write(&dir, "train.conll", "EU B-ORG\nrejects O\n\nPeter B-PER\n\n"),
            valid_file: Some(write(&dir, "valid.conll", "Peter B-PER\n")),
            out_dir: dir.join("out"),
            ..PrepareConfig::default()
        };

        let summary = PrepareUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.mxlen, 2);
        assert_eq!(summary.maxw, Some(7));
        assert_eq!(summary.labels, Some(3));
        assert_eq!((summary.train, summary.valid), (2, 1));
    }

    #[test]
    fn test_lm_stream_carves_tail() {
        let stream = TokenStream { words: (0..10).collect(), chars: (0..20).collect(), maxw: 2 };
        let (train, valid) = stream.carve(0.3, 0);
        assert_eq!(train.words, (0..7).collect::<Vec<u32>>());
        assert_eq!(valid.words, vec![7, 8, 9]);
        assert_eq!(valid.chars, (14..20).collect::<Vec<u32>>());
    }

    #[test]
    fn test_bad_valid_fraction_is_rejected() {
        let dir = scratch_dir("prepare-fraction");
        let cfg = PrepareConfig {
            train_file: write(&dir, "train.txt", "0 a\n"),
            out_dir: dir.join("out"),
            valid_fraction: 1.0,
            ..PrepareConfig::default()
        };
        assert!(PrepareUseCase::new(cfg).execute().is_err());
    }
}
