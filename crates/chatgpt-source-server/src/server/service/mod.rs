//! HTTP intake and lifecycle of the pipeline behind it.
//!
//! This module owns the request path: read the prompt, generate content,
//! build the event, hand it to the bridge, and answer once delivery has been
//! resolved. It also sequences shutdown of the bridge and the delivery pool.
//!
//! ## Structure
//!
//! - [`handler`] - [`IntakeService`] and its HTTP handler.

pub mod handler;

#[cfg(test)]
mod tests;

pub use handler::IntakeService;
