//! Header names and default event attributes.
//!
//! Callers can override an event's `source` and `type` attributes per request
//! through [`HEADER_SOURCE`] and [`HEADER_TYPE`]. When a header is missing or
//! empty, the corresponding default is used.

/// Event type used when the request does not carry [`HEADER_TYPE`].
pub const DEFAULT_EVENT_TYPE: &str = "vanus-chatGPT-type";

/// Event source used when the request does not carry [`HEADER_SOURCE`].
pub const DEFAULT_EVENT_SOURCE: &str = "vanus-chatGPT-source";

/// Request header overriding the event `source` attribute.
pub const HEADER_SOURCE: &str = "vanus-source";

/// Request header overriding the event `type` attribute.
pub const HEADER_TYPE: &str = "vanus-type";

/// CloudEvents specification version emitted by this connector.
pub const SPEC_VERSION: &str = "1.0";

/// Content type of the event `data` payload.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type of a CloudEvent sent in structured mode.
pub const CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

/// Key under which generated text is stored in the event data.
pub const CONTENT_KEY: &str = "content";
