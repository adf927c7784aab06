//! Request intake, bridge, and delivery pipeline.
//!
//! ## Structure
//!
//! - [`config`] - CLI/environment configuration.
//! - [`bridge`] - Bounded hand-off that suspends a request until its event is
//!   delivered.
//! - [`generation`] - Completion client and daily quota.
//! - [`sink`] - Where delivered events go.
//! - [`pool`] - Consumer tasks draining the bridge into a sink.
//! - [`service`] - HTTP handler and shutdown sequencing.
//! - [`telemetry`] - Logging, tracing and metrics.

pub mod bridge;
pub mod config;
pub mod generation;
pub mod pool;
pub mod service;
pub mod sink;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
