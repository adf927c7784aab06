//! Delivery targets for events taken off the bridge.
//!
//! An [`EventSink`] performs one transmission attempt per call. It does not
//! retry; whatever it returns becomes the outcome the waiting request sees.
//!
//! - [`HttpSink`] - POSTs the event to a target URL in CloudEvents structured
//!   mode.
//! - [`LogSink`] - Logs the event and reports success. Used when no target is
//!   configured.

mod http;
mod logging;


use async_trait::async_trait;
use chatgpt_source_core::{DeliveryError, Event};

pub use http::HttpSink;
pub use logging::LogSink;

/// Destination that transmits a single event.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Attempts to transmit `event` once.
    async fn deliver(&self, event: &Event) -> Result<(), DeliveryError>;
}
