//! Single-fire completion latch shared by a producer and its consumer.
//!
//! A [`Completion`] is the consumer half and a [`Waiter`] the producer half of
//! one `oneshot` channel carrying the delivery outcome. The latch fires at
//! most once: the first resolution wins and every later attempt is ignored. A
//! `Completion` dropped without being resolved fires
//! [`DeliveryError::Abandoned`], so a waiting producer always observes exactly
//! one outcome.

use chatgpt_source_core::DeliveryError;
use tokio::sync::oneshot;

/// The result a producer observes for its event.
pub type Outcome = Result<(), DeliveryError>;

/// Consumer half of the latch.
#[derive(Debug)]
pub struct Completion {
    tx: Option<oneshot::Sender<Outcome>>,
}

/// Producer half of the latch.
#[derive(Debug)]
pub struct Waiter {
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    pub fn new() -> (Self, Waiter) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, Waiter { rx })
    }

    /// Fires the latch. Returns `false` if it had already fired.
    ///
    /// A producer that stopped waiting (timed out or shut down) is not an
    /// error: the latch still counts as fired.
    pub(crate) fn resolve(&mut self, outcome: Outcome) -> bool {
        match self.tx.take() {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::trace!("Producer stopped waiting before completion");
                }
                true
            }
            None => false,
        }
    }

    pub fn succeed(mut self) {
        self.resolve(Ok(()));
    }

    pub fn fail(mut self, err: DeliveryError) {
        self.resolve(Err(err));
    }

    pub const fn is_resolved(&self) -> bool {
        self.tx.is_none()
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.resolve(Err(DeliveryError::Abandoned)) {
            tracing::warn!("Pending event dropped without completion");
        }
    }
}

impl Waiter {
    /// Suspends until the latch fires.
    pub async fn wait(self) -> Outcome {
        // The sender always fires before it is dropped, so a receive error
        // can only mean the same thing as an abandoned event.
        self.rx.await.unwrap_or(Err(DeliveryError::Abandoned))
    }
}
