//! Lifecycle of the delivery consumers.
//!
//! [`DeliveryPool`] spawns the consumer tasks and coordinates their shutdown
//! through a shared [`CancellationToken`]. Items left in the queue once the
//! consumers have stopped are failed so that no producer waits forever.

use crate::server::{bridge::DeliveryQueue, pool::worker::consumer_loop, sink::EventSink};
use chatgpt_source_core::DeliveryError;
use core::time::Duration;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;

const CONSUMER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// A fixed set of consumer tasks sharing one [`DeliveryQueue`].
pub struct DeliveryPool {
    queue: Arc<Mutex<DeliveryQueue>>,
    consumers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    num_consumers: usize,
    shutdown_token: CancellationToken,
}

impl DeliveryPool {
    /// Spawns `num_consumers` tasks delivering from `queue` to `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `num_consumers` is zero.
    pub fn spawn(queue: DeliveryQueue, sink: Arc<dyn EventSink>, num_consumers: usize) -> Self {
        assert!(num_consumers > 0, "pool needs at least one consumer");

        let queue = Arc::new(Mutex::new(queue));
        let shutdown_token = CancellationToken::new();

        let consumers = (0..num_consumers)
            .map(|consumer_id| {
                tokio::spawn(consumer_loop(
                    consumer_id,
                    Arc::clone(&queue),
                    Arc::clone(&sink),
                    shutdown_token.clone(),
                ))
            })
            .collect();

        Self {
            queue,
            consumers: parking_lot::Mutex::new(consumers),
            num_consumers,
            shutdown_token,
        }
    }

    pub const fn num_consumers(&self) -> usize {
        self.num_consumers
    }

    /// Stops the consumers and fails whatever is still queued.
    ///
    /// - Cancels the shared [`CancellationToken`] so consumers stop taking
    ///   items.
    /// - Waits (up to 3 seconds per consumer) for each to finish its current
    ///   delivery, aborting the ones that do not.
    /// - Fails every item left in the queue with
    ///   [`DeliveryError::ShuttingDown`].
    ///
    /// Returns the number of queued items that were failed. Calling it again
    /// only repeats the last step.
    pub async fn shutdown(&self) -> usize {
        // === Phase 0: Stop taking new items ===
        tracing::debug!("Stopping {} consumers", self.num_consumers);
        self.shutdown_token.cancel();

        // === Phase 1: Wait for consumers to finish their current delivery ===
        let consumers = std::mem::take(&mut *self.consumers.lock());
        let joins = consumers.into_iter().enumerate().map(|(i, handle)| async move {
            let abort = handle.abort_handle();
            match timeout(CONSUMER_SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => tracing::trace!("Consumer {i} shut down"),
                Ok(Err(e)) => tracing::error!("Consumer {i} failed: {e}"),
                Err(_) => {
                    tracing::warn!("Consumer {i} shutdown timed out, aborting");
                    abort.abort();
                }
            }
        });
        futures::future::join_all(joins).await;

        // === Phase 2: Fail whatever nobody will deliver ===
        let failed = self
            .queue
            .lock()
            .await
            .drain_with(&DeliveryError::ShuttingDown);
        if failed > 0 {
            tracing::warn!("Failed {failed} undelivered events");
        }

        tracing::info!("Delivery pool shutdown complete");
        failed
    }
}
