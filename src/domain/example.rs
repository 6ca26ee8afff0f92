// ============================================================
// Layer 3 - Encoded Examples
// ============================================================
// One struct per task. Every index array is already padded to
// its fixed length, so batching is a plain concatenation.
//
// Multi-dimensional arrays are stored row-major in a flat Vec:
//   chars[j * maxw + k] is character k of word j.

use serde::{Deserialize, Serialize};

/// A sentence classification example.
///
/// `x` has length `mxlen`. Tokens start at offset `mxfiltsz / 2`
/// so a wide convolution never has to pad the front itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelExample {
    pub x: Vec<u32>,
    pub y: u32,
}

/// A source/target pair for sequence-to-sequence training.
///
/// Target layout: `<GO> t0 t1 ... tn <EOS> <PADDING>...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seq2SeqExample {
    pub src: Vec<u32>,
    pub tgt: Vec<u32>,
    /// Number of real source tokens
    pub src_len: usize,
    /// Number of real target positions, GO and EOS included
    pub tgt_len: usize,
}

/// A tagged sentence with word ids, char ids and tag ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedExample {
    /// Word ids, length `mxlen`
    pub words: Vec<u32>,
    /// Char ids, shape `[mxlen, maxw]` row-major
    pub chars: Vec<u32>,
    /// Tag ids, length `mxlen`, 0 on padding positions
    pub tags: Vec<u32>,
    /// Number of real tokens (at most `mxlen`)
    pub length: usize,
    /// Position of the sentence in its source file
    pub id: usize,
    /// Width of one row in `chars`
    pub maxw: usize,
}

impl TaggedExample {
    /// Char ids of the word at position `j`
    pub fn word_chars(&self, j: usize) -> &[u32] {
        &self.chars[j * self.maxw..(j + 1) * self.maxw]
    }
}

/// A language-model token stream: word ids plus one char row per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStream {
    pub words: Vec<u32>,
    /// Shape `[words.len(), maxw]` row-major
    pub chars: Vec<u32>,
    pub maxw: usize,
}

impl TokenStream {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
