// ============================================================
// Layer 4 - Text Helpers
// ============================================================
// Line-level tokenization shared by every reader.
//
// All readers treat their input as already tokenized: a token
// is a maximal run of non-whitespace characters. The helpers
// here only normalise tokens before they reach a vocabulary.
//
// Two normalisers exist:
//   web_cleanup  - collapses URLs, mentions, hashtags and a few
//                  emoticons that carry no lexical signal (tagging)
//   clean_text   - TREC-style cleanup that keeps only ASCII
//                  alphanumerics and a little punctuation,
//                  splitting off clitics (classification)

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};

/// Emoticons that are all mapped to a single placeholder
const UNREP_EMOTICONS: &[&str] = &[":)", ":(((", ":D", "=)", ":-)", "=(", "(=", "=[["];

/// Clitic and punctuation splits applied after character filtering,
/// in this order
const CLITIC_SPLITS: &[(&str, &str)] = &[
    ("'s", " 's "),
    ("'ve", " 've "),
    ("n't", " n't "),
    ("'re", " 're "),
    ("'d", " 'd "),
    ("'ll", " 'll "),
    (",", " , "),
    ("!", " ! "),
];

/// Split on runs of whitespace, never yielding empty tokens.
pub fn split_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Collapse web-specific tokens into stable placeholders.
pub fn web_cleanup(word: &str) -> String {
    if word.starts_with("http") {
        return "URL".to_string();
    }
    if word.starts_with('@') {
        return "@@@@".to_string();
    }
    if word.starts_with('#') {
        return "####".to_string();
    }
    if word == "\"" {
        return ",".to_string();
    }
    if UNREP_EMOTICONS.contains(&word) {
        return ";)".to_string();
    }
    if word == "<3" {
        return "&lt;3".to_string();
    }
    word.to_string()
}

/// Identity word transform, used when no cleanup is requested.
pub fn identity(word: &str) -> String {
    word.to_string()
}

/// TREC-style text cleanup.
///
/// Every character outside `[A-Za-z0-9(),!?'\x60]` becomes a space,
/// then clitics and some punctuation are split into their own tokens.
pub fn clean_text(line: &str) -> String {
    let mut out: String = line
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' => c,
            '(' | ')' | ',' | '!' | '?' | '\'' | '`' => c,
            _ => ' ',
        })
        .collect();

    for (from, to) in CLITIC_SPLITS {
        out = out.replace(from, to);
    }
    out.trim().to_string()
}

/// Split a `label<TAB|SPACE>text` line into its label and tokens.
///
/// * `chars` - the text becomes one token per character of the
///   concatenated words (whitespace dropped)
/// * `clean` - each word is lowercased and passed through
///   [`clean_text`], which may split it further
///
/// Returns `None` for lines without a label.
pub fn label_and_sentence(line: &str, clean: bool, chars: bool) -> Option<(String, Vec<String>)> {
    let mut fields = line.split_whitespace();
    let label = fields.next()?.to_string();

    let words: Vec<String> = if chars {
        fields.flat_map(|w| w.chars()).map(String::from).collect()
    } else {
        fields.map(String::from).collect()
    };

    let tokens = if clean {
        words
            .iter()
            .flat_map(|w| {
                clean_text(&w.to_lowercase())
                    .split_whitespace()
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .collect()
    } else {
        words
    };

    Some((label, tokens))
}

/// Count the lines of a UTF-8 text file.
pub fn num_lines(path: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;
    let mut lines = 0usize;
    for line in BufReader::new(file).lines() {
        line.with_context(|| format!("Cannot read '{}'", path.display()))?;
        lines += 1;
    }
    Ok(lines)
}

/// Open a file for line-by-line streaming.
pub(crate) fn open_lines(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;
    Ok(BufReader::new(file))
}
