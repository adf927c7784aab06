//! Error types for the connector.
//!
//! Failures fall into two tiers that are never conflated:
//!
//! - [`GenerationError`]: producing the content failed. Non-fatal; the event is
//!   still built and delivered, and the message is surfaced in the eventual
//!   success response.
//! - [`DeliveryError`]: handing the event to the delivery pipeline failed.
//!   Fatal to the request that produced the event.

use core::time::Duration;

pub type Result<T> = core::result::Result<T, DeliveryError>;

/// Outcome of an event that could not be delivered.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    /// The target answered with a non-success status.
    #[error("target responded with {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The target could not be reached or the exchange broke mid-flight.
    #[error("transport error: {context}")]
    Transport { context: String },

    /// No consumer resolved the event before the completion deadline.
    #[error("delivery not completed within {after:?}")]
    Timeout { after: Duration },

    /// The connector is shutting down and no longer accepts or awaits events.
    #[error("service is shutting down")]
    ShuttingDown,

    /// The pending event was dropped by its consumer without being resolved.
    #[error("event was dropped before delivery completed")]
    Abandoned,

    /// The delivery queue has no consumer side anymore.
    #[error("delivery queue is closed")]
    QueueClosed,
}

/// Failure to obtain generated content for a prompt.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum GenerationError {
    /// The daily generation allowance is used up.
    #[error("reached the daily limit of {limit} requests")]
    QuotaExhausted { limit: u32 },

    /// The completion endpoint could not be reached.
    #[error("completion request failed: {context}")]
    Request { context: String },

    /// The completion endpoint returned an error response.
    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The completion endpoint answered without any choices.
    #[error("completion API returned no content")]
    EmptyResponse,
}
