//! Request handler turning prompts into delivered events.
//!
//! Every method and path is accepted. The body is the prompt; the
//! `vanus-source` and `vanus-type` headers override the event's source and
//! type.
//!
//! ## Responses
//!
//! | Outcome                                  | Status | Body                                |
//! |------------------------------------------|--------|-------------------------------------|
//! | Empty or unreadable body                 | 400    | reason                              |
//! | Generated and delivered                  | 200    | empty                               |
//! | Generation failed, event still delivered | 200    | generation error                    |
//! | Delivery failed                          | 500    | `send event to target error: {err}` |
//!
//! A generation failure never prevents delivery: the event is sent with empty
//! content and the failure is only reported in the response.

use crate::server::{
    bridge::Bridge,
    config::ServerConfig,
    generation::{CompletionClient, DailyQuota},
    pool::DeliveryPool,
    sink::EventSink,
    telemetry::{
        increment_delivery_errors, increment_generation_errors, increment_requests,
        record_request_duration,
    },
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chatgpt_source_core::{
    DeliveryError, Event, GenerationError,
    types::{DEFAULT_EVENT_SOURCE, DEFAULT_EVENT_TYPE, HEADER_SOURCE, HEADER_TYPE},
};
use core::time::Duration;
use std::{sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// The prompt-to-event pipeline behind the HTTP intake.
///
/// Cloning is cheap; every clone shares the same bridge, collaborators and
/// consumers.
#[derive(Clone)]
pub struct IntakeService {
    bridge: Bridge,
    generator: Arc<dyn CompletionClient>,
    quota: Arc<DailyQuota>,
    pool: Arc<DeliveryPool>,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
}

impl IntakeService {
    /// Builds the bridge and spawns the delivery consumers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: &ServerConfig,
        generator: Arc<dyn CompletionClient>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (bridge, queue) = Bridge::new(config.queue_capacity, config.completion_timeout);
        let pool = DeliveryPool::spawn(queue, sink, config.delivery.num_consumers);

        Self {
            bridge,
            generator,
            quota: Arc::new(DailyQuota::new(config.generation.max_daily_requests)),
            pool: Arc::new(pool),
            shutdown_timeout: config.shutdown_timeout,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Router answering every method on every path with [`ingest`].
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(ingest)
            .with_state(self.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(DefaultBodyLimit::max(self.max_body_bytes)),
            )
    }

    pub const fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn quota(&self) -> &DailyQuota {
        &self.quota
    }

    /// Drains in-flight requests, then stops the delivery consumers.
    ///
    /// New requests are refused as soon as this starts. Requests already
    /// accepted, including those still generating content, get the grace
    /// period to deliver their event. Requests still waiting after it are
    /// answered with [`DeliveryError::ShuttingDown`].
    pub async fn shutdown(&self) {
        self.bridge.shutdown(self.shutdown_timeout).await;
        self.pool.shutdown().await;
    }

    /// Produces the event content, or an empty string with the reason it is
    /// missing.
    async fn generate(&self, prompt: &str) -> (String, Option<GenerationError>) {
        let generated = match self.quota.try_acquire() {
            Ok(()) => self.generator.complete(prompt).await,
            Err(e) => Err(e),
        };

        match generated {
            Ok(content) => (content, None),
            Err(e) => {
                increment_generation_errors();
                tracing::warn!("Failed to get content from the completion API: {e}");
                (String::new(), Some(e))
            }
        }
    }
}

/// Handles one prompt end to end.
#[tracing::instrument(skip_all)]
async fn ingest(
    State(service): State<IntakeService>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();
    increment_requests();

    let response = match body {
        Ok(body) if body.is_empty() => {
            (StatusCode::BAD_REQUEST, "request body is empty").into_response()
        }
        Ok(body) => process(&service, &headers, &String::from_utf8_lossy(&body)).await,
        Err(rejection) => {
            tracing::debug!("Unreadable request body: {rejection}");
            (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
        }
    };

    record_request_duration(start.elapsed().as_secs_f64() * 1000.0);
    response
}

async fn process(service: &IntakeService, headers: &HeaderMap, prompt: &str) -> Response {
    // Admitted before generation so a shutdown waits for this request.
    let admission = match service.bridge.admit() {
        Ok(admission) => admission,
        Err(e) => return delivery_failed(&e),
    };

    let (content, generation_error) = service.generate(prompt).await;

    let event = Event::with_content(
        header_or(headers, HEADER_SOURCE, DEFAULT_EVENT_SOURCE),
        header_or(headers, HEADER_TYPE, DEFAULT_EVENT_TYPE),
        content,
    );

    match admission.enqueue_and_wait(event).await {
        Ok(()) => {
            tracing::info!("Sent event to target");
            let body = generation_error.map(|e| e.to_string()).unwrap_or_default();
            (StatusCode::OK, body).into_response()
        }
        Err(e) => delivery_failed(&e),
    }
}

fn delivery_failed(err: &DeliveryError) -> Response {
    increment_delivery_errors();
    tracing::warn!("Failed to send event to target: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("send event to target error: {err}"),
    )
        .into_response()
}

/// Value of header `name`, or `default` when it is missing, empty or not
/// valid text.
fn header_or(headers: &HeaderMap, name: &str, default: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}
