//! Lazy, pull-based operator chains over a single producer.
//!
//! A [`Chain`] wraps any [`Source`] and grows left to right: every operator
//! returns a new chain whose source pulls from the previous one on demand.
//! Nothing is read until a terminal operation ([`Chain::consume`],
//! [`Chain::last`], [`Chain::collect`]) drives the chain.

mod bufferize;
mod ops;

pub use bufferize::{Buffer, Bufferize};
pub use ops::{Filter, Map, OnEnd, Tap};

use anyhow::Result;
use async_trait::async_trait;
use std::iter::Fuse;

/// A finite, non-restartable producer of elements.
///
/// `Ok(None)` signals end-of-stream; once returned, every later call must
/// return `Ok(None)` as well. An `Err` is fatal for the whole chain.
#[async_trait]
pub trait Source: Send {
    type Item: Send;

    async fn next(&mut self) -> Result<Option<Self::Item>>;
}

/// Adapts a plain iterator into a [`Source`]. The iterator is fused, so
/// end-of-stream is final even for iterators that resume after `None`.
pub struct IterSource<I>(Fuse<I>);

#[async_trait]
impl<I> Source for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Item = I::Item;

    async fn next(&mut self) -> Result<Option<I::Item>> {
        Ok(self.0.next())
    }
}

/// Handle to a chain of operators ending in `S`.
pub struct Chain<S> {
    source: S,
}

impl<S: Source> Chain<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Drops elements for which `predicate` returns `false`.
    pub fn filter<F>(self, predicate: F) -> Chain<Filter<S, F>>
    where
        F: FnMut(&S::Item) -> bool + Send,
    {
        Chain::new(Filter::new(self.source, predicate))
    }

    /// Transforms every element.
    pub fn map<U, F>(self, func: F) -> Chain<Map<S, F>>
    where
        U: Send,
        F: FnMut(S::Item) -> U + Send,
    {
        Chain::new(Map::new(self.source, func))
    }

    /// Runs `func` for its side effect and forwards the element unchanged.
    /// An error returned by `func` terminates the chain.
    pub fn tap<F>(self, func: F) -> Chain<Tap<S, F>>
    where
        F: FnMut(&S::Item) -> Result<()> + Send,
    {
        Chain::new(Tap::new(self.source, func))
    }

    /// Folds elements into an accumulator, emitting it whenever
    /// [`Buffer::should_flush`] says so and once more at end-of-stream if
    /// it holds unflushed input.
    pub fn bufferize<B>(self, buffer: B) -> Chain<Bufferize<S, B>>
    where
        B: Buffer<S::Item>,
    {
        Chain::new(Bufferize::new(self.source, buffer))
    }

    /// Runs `hook` exactly once, after the upstream is exhausted and every
    /// upstream buffer has been flushed.
    pub fn on_end<F>(self, hook: F) -> Chain<OnEnd<S, F>>
    where
        F: FnMut() -> Result<()> + Send,
    {
        Chain::new(OnEnd::new(self.source, hook))
    }

    /// Drains the chain to completion.
    pub async fn consume(mut self) -> Result<()> {
        while self.source.next().await?.is_some() {}
        Ok(())
    }

    /// Drains the chain and returns the last element it produced.
    pub async fn last(mut self) -> Result<Option<S::Item>> {
        let mut last = None;
        while let Some(item) = self.source.next().await? {
            last = Some(item);
        }
        Ok(last)
    }

    /// Drains the chain into a vector.
    pub async fn collect(mut self) -> Result<Vec<S::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.source.next().await? {
            items.push(item);
        }
        Ok(items)
    }
}

impl<I> Chain<IterSource<I>>
where
    I: Iterator + Send,
    I::Item: Send,
{
    pub fn from_items<T>(items: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Chain::new(IterSource(items.into_iter().fuse()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[tokio::test]
    async fn test_filter_map_preserve_order() {
        let out = Chain::from_items(1..=10)
            .filter(|n| n % 2 == 0)
            .map(|n| n * 10)
            .collect()
            .await
            .unwrap();

        assert_eq!(out, vec![20, 40, 60, 80, 100]);
    }

    #[tokio::test]
    async fn test_tap_sees_every_element() {
        let mut seen = Vec::new();
        let out = Chain::from_items(vec!["a", "b", "c"])
            .tap(|s| {
                seen.push(s.to_string());
                Ok(())
            })
            .collect()
            .await
            .unwrap();

        assert_eq!(out, vec!["a", "b", "c"]);
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_tap_error_fails_consume() {
        let result = Chain::from_items(1..=5)
            .tap(|n| {
                if *n == 3 {
                    bail!("boom at {n}");
                }
                Ok(())
            })
            .consume()
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "boom at 3");
    }

    #[tokio::test]
    async fn test_last_on_empty_chain() {
        let last = Chain::from_items(Vec::<u32>::new()).last().await.unwrap();
        assert_eq!(last, None);
    }

    /// Alternates between an element and `None`, forever.
    struct Resuming(u32);

    impl Iterator for Resuming {
        type Item = u32;

        fn next(&mut self) -> Option<u32> {
            self.0 += 1;
            (self.0 % 2 == 1).then_some(self.0)
        }
    }

    #[tokio::test]
    async fn test_end_of_stream_is_final_through_map() {
        let mut chain = Chain::from_items(Resuming(0)).map(|n| n * 10);

        assert_eq!(chain.source.next().await.unwrap(), Some(10));
        assert_eq!(chain.source.next().await.unwrap(), None);
        assert_eq!(chain.source.next().await.unwrap(), None);
        assert_eq!(chain.source.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_on_end_fires_once_when_pulled_past_end() {
        let mut fired = 0;
        {
            let mut chain = Chain::from_items(Resuming(0)).on_end(|| {
                fired += 1;
                Ok(())
            });

            assert_eq!(chain.source.next().await.unwrap(), Some(1));
            for _ in 0..3 {
                assert_eq!(chain.source.next().await.unwrap(), None);
            }
        }
        assert_eq!(fired, 1);
    }

    #[tokio::test]
    async fn test_last_returns_final_element() {
        let last = Chain::from_items(1..=4).map(|n| n * n).last().await.unwrap();
        assert_eq!(last, Some(16));
    }
}
