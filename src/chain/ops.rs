//! Stateless operators: filter, map, tap and the end-of-stream hook.

use anyhow::Result;
use async_trait::async_trait;

use super::Source;

pub struct Filter<S, F> {
    inner: S,
    predicate: F,
}

impl<S, F> Filter<S, F> {
    pub(super) fn new(inner: S, predicate: F) -> Self {
        Self { inner, predicate }
    }
}

#[async_trait]
impl<S, F> Source for Filter<S, F>
where
    S: Source,
    F: FnMut(&S::Item) -> bool + Send,
{
    type Item = S::Item;

    async fn next(&mut self) -> Result<Option<S::Item>> {
        while let Some(item) = self.inner.next().await? {
            if (self.predicate)(&item) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }
}

pub struct Map<S, F> {
    inner: S,
    func: F,
}

impl<S, F> Map<S, F> {
    pub(super) fn new(inner: S, func: F) -> Self {
        Self { inner, func }
    }
}

#[async_trait]
impl<S, F, U> Source for Map<S, F>
where
    S: Source,
    F: FnMut(S::Item) -> U + Send,
    U: Send,
{
    type Item = U;

    async fn next(&mut self) -> Result<Option<U>> {
        Ok(self.inner.next().await?.map(&mut self.func))
    }
}

pub struct Tap<S, F> {
    inner: S,
    func: F,
}

impl<S, F> Tap<S, F> {
    pub(super) fn new(inner: S, func: F) -> Self {
        Self { inner, func }
    }
}

#[async_trait]
impl<S, F> Source for Tap<S, F>
where
    S: Source,
    F: FnMut(&S::Item) -> Result<()> + Send,
{
    type Item = S::Item;

    async fn next(&mut self) -> Result<Option<S::Item>> {
        let Some(item) = self.inner.next().await? else {
            return Ok(None);
        };
        (self.func)(&item)?;
        Ok(Some(item))
    }
}

pub struct OnEnd<S, F> {
    inner: S,
    hook: F,
    fired: bool,
}

impl<S, F> OnEnd<S, F> {
    pub(super) fn new(inner: S, hook: F) -> Self {
        Self {
            inner,
            hook,
            fired: false,
        }
    }
}

#[async_trait]
impl<S, F> Source for OnEnd<S, F>
where
    S: Source,
    F: FnMut() -> Result<()> + Send,
{
    type Item = S::Item;

    async fn next(&mut self) -> Result<Option<S::Item>> {
        if self.fired {
            return Ok(None);
        }
        match self.inner.next().await? {
            Some(item) => Ok(Some(item)),
            None => {
                self.fired = true;
                (self.hook)()?;
                Ok(None)
            }
        }
    }
}
