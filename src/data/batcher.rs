// ============================================================
// Layer 4 - Burn Batchers
// ============================================================
// Implements Burn's Batcher trait for every example type, so a
// model written against Burn can turn a Vec of examples straight
// into Int tensors on its device.
//
// All examples of one task share the same fixed shape, so a batch
// is just the flattened concatenation reshaped with a leading
// batch dimension:
//
//   [e0_t0 .. e0_tT, e1_t0 .. eN_tT] -> [N, T]
//
// Burn Int tensors take i32 here; ids never exceed i32::MAX for
// any realistic vocabulary.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::lm::LmBatch;
use crate::domain::example::{LabelExample, Seq2SeqExample, TaggedExample};

fn ints<B: Backend>(values: Vec<i32>, device: &B::Device) -> Tensor<B, 1, Int> {
    Tensor::<B, 1, Int>::from_ints(values.as_slice(), device)
}

fn flat<'a>(rows: impl Iterator<Item = &'a [u32]>) -> Vec<i32> {
    rows.flat_map(|r| r.iter().map(|&x| x as i32)).collect()
}

// ─── Classification ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct LabelBatch<B: Backend> {
    /// `[batch, mxlen]`
    pub x: Tensor<B, 2, Int>,
    /// `[batch]`
    pub y: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct LabelBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> LabelBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<LabelExample, LabelBatch<B>> for LabelBatcher<B> {
    fn batch(&self, items: Vec<LabelExample>) -> LabelBatch<B> {
        let n = items.len();
        let mxlen = items.first().map_or(0, |e| e.x.len());

        let x = ints::<B>(flat(items.iter().map(|e| e.x.as_slice())), &self.device).reshape([n, mxlen]);
        let y = ints::<B>(items.iter().map(|e| e.y as i32).collect(), &self.device);
        LabelBatch { x, y }
    }
}

// ─── Tagging ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TaggerBatch<B: Backend> {
    /// `[batch, mxlen]`
    pub words: Tensor<B, 2, Int>,
    /// `[batch, mxlen, maxw]`
    pub chars: Tensor<B, 3, Int>,
    /// `[batch, mxlen]`
    pub tags: Tensor<B, 2, Int>,
    /// `[batch]`
    pub lengths: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct TaggerBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TaggerBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TaggedExample, TaggerBatch<B>> for TaggerBatcher<B> {
    fn batch(&self, items: Vec<TaggedExample>) -> TaggerBatch<B> {
        let n = items.len();
        let (mxlen, maxw) = items.first().map_or((0, 0), |e| (e.words.len(), e.maxw));

        let words = ints::<B>(flat(items.iter().map(|e| e.words.as_slice())), &self.device).reshape([n, mxlen]);
        let chars = ints::<B>(flat(items.iter().map(|e| e.chars.as_slice())), &self.device).reshape([n, mxlen, maxw]);
        let tags = ints::<B>(flat(items.iter().map(|e| e.tags.as_slice())), &self.device).reshape([n, mxlen]);
        let lengths = ints::<B>(items.iter().map(|e| e.length as i32).collect(), &self.device);

        TaggerBatch { words, chars, tags, lengths }
    }
}

// ─── Seq2seq ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    pub src: Tensor<B, 2, Int>,
    pub tgt: Tensor<B, 2, Int>,
    pub src_len: Tensor<B, 1, Int>,
    pub tgt_len: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Seq2SeqExample, Seq2SeqBatch<B>> for Seq2SeqBatcher<B> {
    fn batch(&self, items: Vec<Seq2SeqExample>) -> Seq2SeqBatch<B> {
        let n = items.len();
        let mxlen = items.first().map_or(0, |e| e.src.len());

        let src = ints::<B>(flat(items.iter().map(|e| e.src.as_slice())), &self.device).reshape([n, mxlen]);
        let tgt = ints::<B>(flat(items.iter().map(|e| e.tgt.as_slice())), &self.device).reshape([n, mxlen]);
        let src_len = ints::<B>(items.iter().map(|e| e.src_len as i32).collect(), &self.device);
        let tgt_len = ints::<B>(items.iter().map(|e| e.tgt_len as i32).collect(), &self.device);

        Seq2SeqBatch { src, tgt, src_len, tgt_len }
    }
}

// ─── Language model ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct LmTensors<B: Backend> {
    /// `[batch, nbptt]`
    pub x: Tensor<B, 2, Int>,
    /// `[batch, nbptt, maxw]`
    pub xch: Tensor<B, 3, Int>,
    /// `[batch, nbptt]`
    pub y: Tensor<B, 2, Int>,
}

impl<B: Backend> LmTensors<B> {
    /// LM windows are already batched by `LmFeed`; this only moves
    /// one onto a device.
    pub fn from_batch(batch: &LmBatch, device: &B::Device) -> Self {
        let (b, t, w) = (batch.batch_size, batch.nbptt, batch.maxw);
        let x = ints::<B>(flat(std::iter::once(batch.x.as_slice())), device).reshape([b, t]);
        let xch = ints::<B>(flat(std::iter::once(batch.xch.as_slice())), device).reshape([b, t, w]);
        let y = ints::<B>(flat(std::iter::once(batch.y.as_slice())), device).reshape([b, t]);
        Self { x, xch, y }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_label_batch_shapes() {
        let items = vec![
            LabelExample { x: vec![0, 5, 6, 0], y: 1 },
            LabelExample { x: vec![0, 7, 0, 0], y: 0 },
        ];
        let batch = LabelBatcher::<TestBackend>::new(device()).batch(items);
        assert_eq!(batch.x.dims(), [2, 4]);
        assert_eq!(batch.y.dims(), [2]);
        let x: Vec<i64> = batch.x.into_data().iter::<i64>().collect();
        assert_eq!(x, vec![0, 5, 6, 0, 0, 7, 0, 0]);
    }

    #[test]
    fn test_tagger_batch_shapes() {
        let ex = TaggedExample {
            words: vec![3, 4, 0],
            chars: vec![1, 2, 3, 4, 0, 0],
            tags: vec![1, 2, 0],
            length: 2,
            id: 0,
            maxw: 2,
        };
        let batch = TaggerBatcher::<TestBackend>::new(device()).batch(vec![ex.clone(), ex]);
        assert_eq!(batch.words.dims(), [2, 3]);
        assert_eq!(batch.chars.dims(), [2, 3, 2]);
        assert_eq!(batch.tags.dims(), [2, 3]);
        let lengths: Vec<i64> = batch.lengths.into_data().iter::<i64>().collect();
        assert_eq!(lengths, vec![2, 2]);
    }

    #[test]
    fn test_seq2seq_batch_shapes() {
        let ex = Seq2SeqExample { src: vec![4, 5, 0], tgt: vec![2, 6, 3], src_len: 2, tgt_len: 3 };
        let batch = Seq2SeqBatcher::<TestBackend>::new(device()).batch(vec![ex]);
        assert_eq!(batch.src.dims(), [1, 3]);
        assert_eq!(batch.tgt.dims(), [1, 3]);
        assert_eq!(batch.tgt_len.dims(), [1]);
    }

    #[test]
    fn test_lm_tensors_shapes() {
        let batch = LmBatch {
            x: vec![1, 2, 3, 4],
            xch: vec![0; 12],
            y: vec![2, 3, 4, 5],
            batch_size: 2,
            nbptt: 2,
            maxw: 3,
        };
        let t = LmTensors::<TestBackend>::from_batch(&batch, &device());
        assert_eq!(t.x.dims(), [2, 2]);
        assert_eq!(t.xch.dims(), [2, 2, 3]);
        let y: Vec<i64> = t.y.into_data().iter::<i64>().collect();
        assert_eq!(y, vec![2, 3, 4, 5]);
    }
}
