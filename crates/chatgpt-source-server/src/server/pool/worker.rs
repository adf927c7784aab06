use crate::server::{
    bridge::{DeliveryQueue, PendingItem},
    sink::EventSink,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Consumer task delivering events taken from the shared queue.
///
/// The queue lock is only held while waiting for the next item, so several
/// consumers deliver concurrently. Every item taken is resolved with the
/// sink's result before the next one is requested.
///
/// The loop ends when `shutdown_token` is cancelled or the queue is closed
/// and empty. A delivery already in progress is finished first.
pub async fn consumer_loop(
    consumer_id: usize,
    queue: Arc<Mutex<DeliveryQueue>>,
    sink: Arc<dyn EventSink>,
    shutdown_token: CancellationToken,
) {
    tracing::trace!("Consumer {consumer_id} started");

    loop {
        let item = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => {
                tracing::debug!("Consumer {consumer_id} received shutdown signal");
                break;
            }
            item = next_item(&queue) => item,
        };

        let Some(item) = item else {
            tracing::debug!("Consumer {consumer_id} found the queue closed");
            break;
        };

        deliver(consumer_id, item, sink.as_ref()).await;
    }

    tracing::trace!("Consumer {consumer_id} stopped");
}

async fn next_item(queue: &Mutex<DeliveryQueue>) -> Option<PendingItem> {
    queue.lock().await.recv().await
}

#[tracing::instrument(skip(item, sink), fields(event_id = %item.event().id()))]
async fn deliver(consumer_id: usize, item: PendingItem, sink: &dyn EventSink) {
    let outcome = sink.deliver(item.event()).await;
    match &outcome {
        Ok(()) => tracing::info!("Event delivered"),
        Err(e) => tracing::warn!("Failed to deliver event: {e}"),
    }
    item.resolve(outcome);
}
