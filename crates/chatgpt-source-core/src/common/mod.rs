//! Shared types and error definitions used across the connector.
//!
//! ## Submodules
//!
//! - [`error`] - Delivery and generation error types.
//! - [`event`] - The CloudEvents envelope handed to the delivery pipeline.
//! - [`types`] - Header names and default event attributes.

pub mod error;
pub mod event;
pub mod types;

pub use error::{DeliveryError, GenerationError, Result};
pub use event::Event;
