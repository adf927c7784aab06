//! Unit of work travelling from a request handler to a delivery consumer.
//!
//! A [`PendingItem`] owns the event, the consumer half of its completion
//! latch, and the capacity permit that was acquired to enqueue it. Resolving
//! the item consumes it, which fires the latch and releases the permit in one
//! step.

use super::completion::{Completion, Outcome};
use chatgpt_source_core::{DeliveryError, Event};
use tokio::sync::OwnedSemaphorePermit;

/// An event awaiting exactly-once resolution by a consumer.
#[derive(Debug)]
pub struct PendingItem {
    event: Event,
    completion: Completion,
    _permit: OwnedSemaphorePermit,
}

impl PendingItem {
    pub(crate) fn new(
        event: Event,
        completion: Completion,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            event,
            completion,
            _permit: permit,
        }
    }

    /// The event to deliver.
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// Reports successful delivery to the waiting producer.
    pub fn succeed(self) {
        self.completion.succeed();
    }

    /// Reports failed delivery to the waiting producer.
    pub fn fail(self, err: DeliveryError) {
        self.completion.fail(err);
    }

    /// Resolves the item from a delivery result.
    pub fn resolve(self, outcome: Outcome) {
        match outcome {
            Ok(()) => self.succeed(),
            Err(err) => self.fail(err),
        }
    }
}
