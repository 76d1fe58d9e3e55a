//! Input queue filled by the change feed reader.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Source of raw change lines for one indexer.
///
/// There is exactly one consumer per queue, so implementations need no
/// coordination beyond their own waiting.
#[async_trait]
pub trait ChangeQueue: Send {
    /// Wait for the next change for as long as it takes.
    ///
    /// Returns `None` once the queue is closed and drained.
    async fn take(&mut self) -> Option<String>;

    /// Wait for the next change at most `timeout`.
    ///
    /// Returns `None` on timeout or when the queue is closed and drained.
    async fn poll(&mut self, timeout: Duration) -> Option<String>;
}

/// Queue backed by a bounded tokio channel.
#[derive(Debug)]
pub struct ChannelQueue {
    rx: mpsc::Receiver<String>,
}

impl ChannelQueue {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }
}

/// Create a queue together with the sender the feed reader pushes into.
pub fn changes_channel(capacity: usize) -> (mpsc::Sender<String>, ChannelQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelQueue::new(rx))
}

#[async_trait]
impl ChangeQueue for ChannelQueue {
    async fn take(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    async fn poll(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }
}
