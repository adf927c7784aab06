use super::EventSink;
use async_trait::async_trait;
use chatgpt_source_core::{DeliveryError, Event, types::CLOUDEVENTS_JSON};
use core::time::Duration;
use reqwest::header::CONTENT_TYPE;

/// Sends events to an HTTP endpoint as `application/cloudevents+json`.
///
/// Any 2xx answer counts as delivered.
#[derive(Clone, Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    target: String,
}

impl HttpSink {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (for example when
    /// the TLS backend fails to initialize).
    pub fn new(target: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            target: target.into(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn deliver(&self, event: &Event) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(event).map_err(|e| DeliveryError::Transport {
            context: format!("failed to encode event: {e}"),
        })?;

        let response = self
            .client
            .post(&self.target)
            .header(CONTENT_TYPE, CLOUDEVENTS_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                context: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // The body is only used for the error message; a broken body should
        // not hide the status.
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
