//! Consumer side of the bridge.
//!
//! [`DeliveryQueue`] is a read-only, FIFO view over the events producers have
//! enqueued. Whoever holds it owes every item it takes exactly one resolution.

use super::request::PendingItem;
use chatgpt_source_core::DeliveryError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Receiving end of the bounded hand-off.
#[derive(Debug)]
pub struct DeliveryQueue {
    rx: mpsc::Receiver<PendingItem>,
}

impl DeliveryQueue {
    pub(crate) const fn new(rx: mpsc::Receiver<PendingItem>) -> Self {
        Self { rx }
    }

    /// Waits for the next item.
    ///
    /// Returns `None` once every producer handle is gone (or the queue was
    /// closed) and nothing is left to take. Cancel-safe.
    pub async fn recv(&mut self) -> Option<PendingItem> {
        self.rx.recv().await
    }

    /// Takes the next item if one is ready.
    pub fn try_recv(&mut self) -> Option<PendingItem> {
        self.rx.try_recv().ok()
    }

    /// Number of items waiting to be taken.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Stops accepting new items. Items already queued can still be taken.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Closes the queue and fails every remaining item with `err`.
    ///
    /// Returns how many items were failed.
    pub fn drain_with(&mut self, err: &DeliveryError) -> usize {
        self.close();

        let mut failed = 0;
        while let Some(item) = self.try_recv() {
            item.fail(err.clone());
            failed += 1;
        }
        failed
    }

    /// Turns the queue into a [`Stream`](tokio_stream::Stream) of items.
    pub fn into_stream(self) -> ReceiverStream<PendingItem> {
        ReceiverStream::new(self.rx)
    }
}
