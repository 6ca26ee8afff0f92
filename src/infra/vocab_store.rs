// ============================================================
// Layer 6 - Vocabulary Store
// ============================================================
// Persists indices so that training, evaluation and any later
// inference encode text with exactly the same ids.
//
//   {dir}/{name}.vocab.json     WordIndex, tokens in id order
//   {dir}/{name}.labels.json    LabelMap
//   {dir}/{name}.tokenizer.json the same word index as a Hugging
//                               Face WordLevel tokenizer
//
// The tokenizer export splits on whitespace only and applies no
// normaliser, so it reproduces reader ids only for readers that
// look words up unchanged. Unknown words map to `unk_token`:
// <UNK> for most readers, <PADDING> for classification.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tokenizers::Tokenizer;

use crate::data::vocab::{LabelMap, WordIndex};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_index(&self, name: &str, index: &WordIndex) -> Result<PathBuf> {
        let path = self.dir.join(format!("{name}.vocab.json"));
        write_json(&path, index)?;
        tracing::info!("Saved {} tokens to '{}'", index.len(), path.display());
        Ok(path)
    }

    pub fn load_index(&self, name: &str) -> Result<WordIndex> {
        let mut index: WordIndex = read_json(&self.dir.join(format!("{name}.vocab.json")))?;
        index.reindex();
        Ok(index)
    }

    pub fn save_labels(&self, name: &str, labels: &LabelMap) -> Result<PathBuf> {
        let path = self.dir.join(format!("{name}.labels.json"));
        write_json(&path, labels)?;
        Ok(path)
    }

    pub fn load_labels(&self, name: &str) -> Result<LabelMap> {
        let mut labels: LabelMap = read_json(&self.dir.join(format!("{name}.labels.json")))?;
        labels.reindex();
        Ok(labels)
    }

    /// Export `index` as a WordLevel tokenizer and load it back.
    pub fn export_tokenizer(&self, name: &str, index: &WordIndex, unk_token: &str) -> Result<Tokenizer> {
        if index.get(unk_token).is_none() {
            bail!("index has no {unk_token} token to map unknown words to");
        }

        let vocab: serde_json::Map<String, serde_json::Value> = index
            .tokens()
            .iter()
            .enumerate()
            .map(|(id, t)| (t.clone(), serde_json::json!(id)))
            .collect();

        // reserved ids come first and are never split or normalised
        let added_tokens: Vec<serde_json::Value> = index
            .tokens()
            .iter()
            .enumerate()
            .take_while(|(_, t)| t.starts_with('<') && t.ends_with('>'))
            .map(|(id, t)| {
                serde_json::json!({
                    "id": id, "content": t, "single_word": false, "lstrip": false,
                    "rstrip": false, "normalized": false, "special": true
                })
            })
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": unk_token
            }
        });

        let path = self.dir.join(format!("{name}.tokenizer.json"));
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Exported tokenizer to '{}'", path.display());

        Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("Cannot reload tokenizer '{}': {e}", path.display()))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::{Vocab, EOS, GO, PADDING, UNK};
    use crate::test_util::scratch_dir;

    fn sample_index() -> WordIndex {
        let mut v = Vocab::new();
        v.add_n("the", 3);
        v.add_n("cat", 2);
        v.add("sat");
        WordIndex::from_vocab(&v, 1, &[GO, EOS])
    }

    #[test]
    fn test_index_roundtrip() {
        let store = VocabStore::new(scratch_dir("store-index")).unwrap();
        let index = sample_index();
        store.save_index("src", &index).unwrap();
        let back = store.load_index("src").unwrap();
        assert_eq!(back, index);
        assert_eq!(back.get("cat"), index.get("cat"));
    }

    #[test]
    fn test_labels_roundtrip() {
        let store = VocabStore::new(scratch_dir("store-labels")).unwrap();
        let mut labels = LabelMap::for_tags();
        labels.get_or_insert("B-PER");
        labels.get_or_insert("O");
        store.save_labels("tags", &labels).unwrap();
        let back = store.load_labels("tags").unwrap();
        assert_eq!(back.get("O"), Some(2));
        assert_eq!(back.base(), 1);
    }

    #[test]
    fn test_exported_tokenizer_matches_index() {
        let store = VocabStore::new(scratch_dir("store-tokenizer")).unwrap();
        let index = sample_index();
        let tokenizer = store.export_tokenizer("src", &index, UNK).unwrap();

        let enc = tokenizer.encode("the cat zebra", false).unwrap();
        let expected = vec![index.get("the").unwrap(), index.get("cat").unwrap(), index.unk_id()];
        assert_eq!(enc.get_ids(), expected.as_slice());
    }

    #[test]
    fn test_classify_export_matches_label_reader() {
        use std::io::Cursor;

        use crate::data::label::{LabelReader, LabelReaderOptions};

        let store = VocabStore::new(scratch_dir("store-tokenizer-classify")).unwrap();
        let mut v = Vocab::new();
        v.add("fun");
        let index = WordIndex::from_vocab(&v, 1, &[]);
        let tokenizer = store.export_tokenizer("words", &index, PADDING).unwrap();

        // no filter padding, so x starts with the sentence
        let reader = LabelReader::new(LabelReaderOptions::default(), 2, 0);
        let mut labels = LabelMap::for_classes();
        let ex = reader.load_from(Cursor::new("pos zebra fun\n"), &index, &mut labels).unwrap();

        let enc = tokenizer.encode("zebra fun", false).unwrap();
        assert_eq!(enc.get_ids(), ex[0].x.as_slice());
        assert_eq!(enc.get_ids(), &[index.pad_id(), index.get("fun").unwrap()]);
    }

    #[test]
    fn test_export_requires_unk_token_in_index() {
        let store = VocabStore::new(scratch_dir("store-tokenizer-unk")).unwrap();
        assert!(store.export_tokenizer("src", &sample_index(), "<MISSING>").is_err());
    }
}
