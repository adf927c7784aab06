//! Bounded hand-off between request handlers and delivery consumers.
//!
//! The [`Bridge`] turns "deliver this event" into a call that suspends the
//! calling task until a consumer has resolved the event, while keeping the
//! number of unresolved events bounded.
//!
//! ## Structure
//!
//! - [`completion`] - Single-fire latch between producer and consumer.
//! - [`request`] - [`PendingItem`], the unit carried by the queue.
//! - [`queue`] - [`DeliveryQueue`], the consumer-facing FIFO view.
//!
//! ## Capacity
//!
//! Each enqueue acquires a permit from a semaphore sized to the capacity. The
//! permit travels inside the [`PendingItem`] and is released only when the
//! item is resolved or dropped, so the bound covers items still queued *and*
//! items a consumer has taken but not yet resolved. A full bridge suspends new
//! producers instead of rejecting them.
//!
//! ## Shutdown
//!
//! [`Bridge::shutdown`] refuses new events, gives in-flight calls a grace
//! period to finish, then releases whatever is still waiting with
//! [`DeliveryError::ShuttingDown`].

pub mod completion;
pub mod queue;
pub mod request;


use crate::server::telemetry::{decrement_events_inflight, increment_events_inflight};
use chatgpt_source_core::{DeliveryError, Event, Result};
use completion::{Completion, Outcome, Waiter};
use core::time::Duration;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::{
    sync::{Semaphore, mpsc},
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

pub use queue::DeliveryQueue;
pub use request::PendingItem;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Producer handle of the bounded hand-off. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

#[derive(Debug)]
struct BridgeInner {
    tx: mpsc::Sender<PendingItem>,
    permits: Arc<Semaphore>,
    capacity: usize,
    inflight: AtomicUsize,
    completion_timeout: Option<Duration>,
    /// Cancelled when the bridge stops accepting new events.
    draining: CancellationToken,
    /// Cancelled when remaining waiters must be released.
    shutdown_token: CancellationToken,
}

/// Counts an admitted request for as long as it runs.
#[derive(Debug)]
struct InflightGuard<'a> {
    inflight: &'a AtomicUsize,
}

impl<'a> InflightGuard<'a> {
    fn new(inflight: &'a AtomicUsize) -> Self {
        inflight.fetch_add(1, Ordering::SeqCst);
        increment_events_inflight();
        Self { inflight }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::SeqCst);
        decrement_events_inflight();
    }
}

/// A request the bridge has agreed to carry.
///
/// Obtained from [`Bridge::admit`] before any work is done for the request.
/// While it is alive the request counts as in flight, so
/// [`Bridge::shutdown`] waits for it during the grace period even if its
/// event has not been built yet.
#[derive(Debug)]
pub struct Admission<'a> {
    bridge: &'a Bridge,
    _guard: InflightGuard<'a>,
}

impl Bridge {
    /// Creates a bridge holding at most `capacity` unresolved events.
    ///
    /// `completion_timeout` bounds how long a producer waits for its event to
    /// be resolved; `None` waits until a consumer resolves it or the bridge
    /// shuts down.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, completion_timeout: Option<Duration>) -> (Self, DeliveryQueue) {
        assert!(capacity > 0, "bridge capacity must be greater than 0");

        // The semaphore admits at most `capacity` items, so the channel can
        // never be full when a permit holder sends.
        let (tx, rx) = mpsc::channel(capacity);

        let bridge = Self {
            inner: Arc::new(BridgeInner {
                tx,
                permits: Arc::new(Semaphore::new(capacity)),
                capacity,
                inflight: AtomicUsize::new(0),
                completion_timeout,
                draining: CancellationToken::new(),
                shutdown_token: CancellationToken::new(),
            }),
        };

        (bridge, DeliveryQueue::new(rx))
    }

    /// Admits a new request.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::ShuttingDown`] once shutdown has started.
    pub fn admit(&self) -> Result<Admission<'_>> {
        // Count first, then check: a shutdown that starts in between sees
        // this request in its drain loop.
        let guard = InflightGuard::new(&self.inner.inflight);
        if self.inner.draining.is_cancelled() {
            return Err(DeliveryError::ShuttingDown);
        }

        Ok(Admission {
            bridge: self,
            _guard: guard,
        })
    }

    /// Admits `event` and suspends until a consumer resolves it.
    ///
    /// Shorthand for [`admit`](Self::admit) followed by
    /// [`Admission::enqueue_and_wait`].
    ///
    /// # Errors
    ///
    /// See [`Admission::enqueue_and_wait`].
    pub async fn enqueue_and_wait(&self, event: Event) -> Result<()> {
        self.admit()?.enqueue_and_wait(event).await
    }

    async fn wait_for(&self, waiter: Waiter) -> Outcome {
        match self.inner.completion_timeout {
            Some(after) => timeout(after, waiter.wait())
                .await
                .unwrap_or(Err(DeliveryError::Timeout { after })),
            None => waiter.wait().await,
        }
    }

    /// Stops accepting events and releases every waiting producer.
    ///
    /// - Refuses new admissions.
    /// - Waits up to `grace` for admitted requests to finish on their own.
    /// - Releases the rest with [`DeliveryError::ShuttingDown`].
    ///
    /// Items already handed to the queue stay there; the consumer side decides
    /// whether to finish or fail them.
    pub async fn shutdown(&self, grace: Duration) {
        // === Phase 0: Stop accepting new events ===
        tracing::info!("Refusing new events");
        self.inner.draining.cancel();

        // === Phase 1: Wait for in-flight calls to drain ===
        tracing::info!("Draining in-flight events ({} active)", self.inflight());
        let drain_result = timeout(grace, async {
            while self.inflight() > 0 {
                sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => tracing::debug!("All in-flight events drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} events still active)",
                self.inflight()
            ),
        }

        // === Phase 2: Release whatever is still waiting ===
        tracing::debug!("Releasing remaining producers via shutdown token");
        self.inner.shutdown_token.cancel();
        self.inner.permits.close();
    }

    /// Number of admitted requests that have not finished yet.
    pub fn inflight(&self) -> usize {
        self.inner.inflight.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of events that can be enqueued without suspending.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.draining.is_cancelled()
    }
}

impl Admission<'_> {
    /// Enqueues `event` and suspends until a consumer resolves it.
    ///
    /// Suspends first while the bridge is at capacity, then until the event's
    /// completion fires.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::ShuttingDown`] if the grace period ran out, either
    ///   before the event was enqueued or while waiting for its resolution.
    /// - [`DeliveryError::QueueClosed`] if the consumer side is gone.
    /// - [`DeliveryError::Timeout`] if a completion timeout is configured and
    ///   expires.
    /// - Any error the consumer reported for this event.
    #[tracing::instrument(skip_all, fields(event_id = %event.id()))]
    pub async fn enqueue_and_wait(self, event: Event) -> Result<()> {
        let inner = &self.bridge.inner;

        let permit = tokio::select! {
            biased;
            () = inner.shutdown_token.cancelled() => {
                return Err(DeliveryError::ShuttingDown);
            }
            permit = Arc::clone(&inner.permits).acquire_owned() => {
                permit.map_err(|_| DeliveryError::ShuttingDown)?
            }
        };

        let (completion, waiter) = Completion::new();
        let item = PendingItem::new(event, completion, permit);

        if inner.tx.send(item).await.is_err() {
            // The rejected item is dropped with the send error, which fires
            // its latch; nobody is listening on `waiter` anymore.
            return Err(DeliveryError::QueueClosed);
        }
        tracing::trace!("Event enqueued");

        tokio::select! {
            biased;
            outcome = self.bridge.wait_for(waiter) => outcome,
            () = inner.shutdown_token.cancelled() => Err(DeliveryError::ShuttingDown),
        }
    }
}
