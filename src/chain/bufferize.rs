//! Stateful windowed reduction.

use anyhow::Result;
use async_trait::async_trait;
use std::mem;

use super::Source;

/// Reduction rules for [`Bufferize`].
///
/// For every element the engine first folds it with [`reduce`](Self::reduce),
/// then asks [`should_flush`](Self::should_flush). On a flush the accumulator
/// is emitted downstream and replaced by [`next_initial`](Self::next_initial).
pub trait Buffer<T>: Send {
    type Acc: Send;

    fn initial(&self) -> Self::Acc;

    fn reduce(&mut self, acc: Self::Acc, item: T) -> Result<Self::Acc>;

    fn should_flush(&self, _acc: &Self::Acc) -> bool {
        false
    }

    /// Accumulator to continue with after `acc` was flushed.
    fn next_initial(&self, _acc: &Self::Acc) -> Self::Acc {
        self.initial()
    }

    /// Whether an accumulator returned by `next_initial` already holds
    /// folded input, so it must be flushed at end-of-stream even if no
    /// further element arrives.
    fn carries_input(&self, _acc: &Self::Acc) -> bool {
        false
    }
}

pub struct Bufferize<S: Source, B: Buffer<S::Item>> {
    inner: S,
    buffer: B,
    acc: Option<B::Acc>,
    pending: bool,
    done: bool,
}

impl<S, B> Bufferize<S, B>
where
    S: Source,
    B: Buffer<S::Item>,
{
    pub(super) fn new(inner: S, buffer: B) -> Self {
        let acc = buffer.initial();
        Self {
            inner,
            buffer,
            acc: Some(acc),
            pending: false,
            done: false,
        }
    }
}

#[async_trait]
impl<S, B> Source for Bufferize<S, B>
where
    S: Source,
    B: Buffer<S::Item>,
{
    type Item = B::Acc;

    async fn next(&mut self) -> Result<Option<B::Acc>> {
        if self.done {
            return Ok(None);
        }

        while let Some(item) = self.inner.next().await? {
            let acc = match self.acc.take() {
                Some(acc) => acc,
                None => self.buffer.initial(),
            };
            let acc = self.buffer.reduce(acc, item)?;

            if self.buffer.should_flush(&acc) {
                let next = self.buffer.next_initial(&acc);
                self.pending = self.buffer.carries_input(&next);
                self.acc = Some(next);
                return Ok(Some(acc));
            }

            self.acc = Some(acc);
            self.pending = true;
        }

        self.done = true;
        if mem::take(&mut self.pending) {
            return Ok(self.acc.take());
        }
        Ok(None)
    }
}
