//! CloudEvents envelope for generated content.
//!
//! An [`Event`] is built once per accepted request and never mutated
//! afterwards. It serializes to the CloudEvents 1.0 structured JSON format:
//!
//! ```json
//! {
//!   "specversion": "1.0",
//!   "id": "5b0c0a1e-...",
//!   "source": "vanus-chatGPT-source",
//!   "type": "vanus-chatGPT-type",
//!   "time": "2026-10-16T09:12:44.120Z",
//!   "datacontenttype": "application/json",
//!   "data": { "content": "..." }
//! }
//! ```

use super::types::{APPLICATION_JSON, CONTENT_KEY, SPEC_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// An immutable CloudEvent carrying a string map as its data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    specversion: String,
    id: Uuid,
    source: String,
    #[serde(rename = "type")]
    ty: String,
    time: DateTime<Utc>,
    datacontenttype: String,
    data: BTreeMap<String, String>,
}

impl Event {
    /// Builds an event with a fresh random id and the current UTC time.
    pub fn new(
        source: impl Into<String>,
        ty: impl Into<String>,
        data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            specversion: SPEC_VERSION.to_string(),
            id: Uuid::new_v4(),
            source: source.into(),
            ty: ty.into(),
            time: Utc::now(),
            datacontenttype: APPLICATION_JSON.to_string(),
            data,
        }
    }

    /// Builds an event whose data is `{"content": content}`.
    ///
    /// A failed generation is recorded with an empty `content`.
    pub fn with_content(
        source: impl Into<String>,
        ty: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut data = BTreeMap::new();
        data.insert(CONTENT_KEY.to_string(), content.into());
        Self::new(source, ty, data)
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn spec_version(&self) -> &str {
        &self.specversion
    }

    pub fn data_content_type(&self) -> &str {
        &self.datacontenttype
    }

    pub const fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    /// Generated text, if the event carries any.
    pub fn content(&self) -> Option<&str> {
        self.data.get(CONTENT_KEY).map(String::as_str)
    }
}
