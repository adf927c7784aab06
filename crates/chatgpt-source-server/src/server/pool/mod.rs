//! Delivery consumers.
//!
//! A [`DeliveryPool`] owns the consumer side of the bridge and runs a fixed
//! number of tasks that take events off the queue, hand them to an
//! [`EventSink`](crate::server::sink::EventSink), and resolve each event with
//! the sink's answer.
//!
//! ## Structure
//!
//! - [`manager`] - [`DeliveryPool`], spawning and shutdown.
//! - [`worker`] - The loop each consumer task runs.

pub mod manager;
pub mod worker;


pub use manager::DeliveryPool;
