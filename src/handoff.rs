//! Single-producer / single-consumer hand-off between two chains.
//!
//! [`channel`] returns a cloneable [`Handoff`] for the producing chain and a
//! [`HandoffReceiver`] that is itself a [`Source`], so it can head a second
//! chain. The queue is unbounded: pushing never waits. Ending the queue lets
//! the receiver drain what was already pushed and then report end-of-stream.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::warn;

use crate::chain::Source;

/// Producer side of the hand-off queue.
pub struct Handoff<T> {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<T>>>>,
}

impl<T> Clone for Handoff<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer side of the hand-off queue.
pub struct HandoffReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

pub fn channel<T>() -> (Handoff<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Handoff {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        HandoffReceiver { rx },
    )
}

impl<T> Handoff<T> {
    /// Enqueues one item, waking the receiver if it is waiting.
    ///
    /// # Errors
    ///
    /// Fails if the queue was already ended or the receiver is gone.
    pub fn push(&self, item: T) -> Result<()> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("hand-off queue lock poisoned"))?;
        let Some(tx) = guard.as_ref() else {
            bail!("push on a hand-off queue that was already ended");
        };
        tx.send(item)
            .map_err(|_| anyhow!("hand-off queue receiver is gone"))
    }

    /// Marks that no further items will be pushed.
    ///
    /// Ending twice is tolerated but logged, since it means two parties
    /// believe they own the end of the stream.
    pub fn end(&self) -> Result<()> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("hand-off queue lock poisoned"))?;
        if guard.take().is_none() {
            warn!("hand-off queue ended more than once");
        }
        Ok(())
    }

    /// Whether [`end`](Self::end) has been called on any clone of this handle.
    ///
    /// # Errors
    ///
    /// Fails if the queue lock is poisoned.
    pub fn is_ended(&self) -> Result<bool> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("hand-off queue lock poisoned"))?;
        Ok(guard.is_none())
    }
}

#[async_trait]
impl<T: Send> Source for HandoffReceiver<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>> {
        Ok(self.rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pushes_then_end_drain_exactly() {
        let (queue, rx) = channel();
        for i in 0..5 {
            queue.push(i).unwrap();
        }
        queue.end().unwrap();

        let items = Chain::new(rx).collect().await.unwrap();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_consumer_waiting_before_pushes() {
        let (queue, rx) = channel::<()>();

        let consumer = tokio::spawn(Chain::new(rx).collect());
        tokio::time::sleep(Duration::from_millis(20)).await;

        for _ in 0..3 {
            queue.push(()).unwrap();
            tokio::task::yield_now().await;
        }
        queue.end().unwrap();

        let items = consumer.await.unwrap().unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_end_without_pushes_is_empty_stream() {
        let (queue, mut rx) = channel::<()>();
        queue.end().unwrap();

        assert_eq!(rx.next().await.unwrap(), None);
        assert_eq!(rx.next().await.unwrap(), None);
    }

    #[test]
    fn test_push_after_end_fails() {
        let (queue, _rx) = channel();
        queue.end().unwrap();

        let err = queue.push(1).unwrap_err();
        assert!(err.to_string().contains("already ended"));
    }

    #[test]
    fn test_end_twice_is_tolerated() {
        let (queue, _rx) = channel::<()>();
        let other = queue.clone();

        queue.end().unwrap();
        other.end().unwrap();
        assert!(queue.is_ended().unwrap());
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let (queue, _rx) = channel::<u8>();
        assert!(!queue.is_ended().unwrap());

        let other = queue.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = other.tx.lock().unwrap();
            panic!("producer died holding the lock");
        })
        .join();
        assert!(panicked.is_err());

        assert!(queue.is_ended().is_err());
        assert!(queue.push(1).is_err());
        assert!(queue.end().is_err());
    }
}
