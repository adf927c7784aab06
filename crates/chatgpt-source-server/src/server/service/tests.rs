use super::IntakeService;
use crate::server::{
    config::{DeliveryConfig, GenerationConfig, ServerConfig},
    generation::CompletionClient,
    testing::{RecordingSink, ScriptedClient},
};
use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chatgpt_source_core::{
    DeliveryError, GenerationError,
    types::{DEFAULT_EVENT_SOURCE, DEFAULT_EVENT_TYPE},
};
use core::time::Duration;
use std::sync::Arc;
use tower::ServiceExt;

fn config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        queue_capacity: 8,
        completion_timeout: None,
        shutdown_timeout: Duration::from_secs(1),
        max_body_bytes: 1024,
        delivery: DeliveryConfig {
            target: None,
            timeout: Duration::from_secs(1),
            num_consumers: 2,
        },
        generation: GenerationConfig {
            api_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-test".to_string(),
            max_tokens: 16,
            temperature: 0.7,
            timeout: Duration::from_secs(1),
            max_daily_requests: 0,
        },
    }
}

/// Completion client that takes a while to answer.
struct SlowClient {
    delay: Duration,
}

#[async_trait]
impl CompletionClient for SlowClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("slow: {prompt}"))
    }
}

fn post(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from(body))
        .unwrap()
}

async fn send(service: &IntakeService, request: Request<Body>) -> (StatusCode, String) {
    let response = service.router().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn delivered_event_answers_ok_with_empty_body() {
    let client = Arc::new(ScriptedClient::default());
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(&config(), client.clone(), sink.clone());

    assert_eq!(
        send(&service, post("tell me a joke")).await,
        (StatusCode::OK, String::new())
    );

    assert_eq!(*client.prompts.lock(), vec!["tell me a joke".to_string()]);
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].content(), Some("echo: tell me a joke"));
    assert_eq!(delivered[0].source(), DEFAULT_EVENT_SOURCE);
    assert_eq!(delivered[0].ty(), DEFAULT_EVENT_TYPE);
}

#[tokio::test]
async fn generation_failure_is_reported_after_successful_delivery() {
    let err = GenerationError::Api {
        status: 500,
        message: "model overloaded".to_string(),
    };
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(
        &config(),
        ScriptedClient::answering(Err(err.clone())),
        sink.clone(),
    );

    assert_eq!(
        send(&service, post("hello")).await,
        (StatusCode::OK, err.to_string())
    );

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].content(), Some(""));
}

#[tokio::test]
async fn delivery_failure_answers_internal_error() {
    let err = DeliveryError::Rejected {
        status: 503,
        body: "down".to_string(),
    };
    let service = IntakeService::new(
        &config(),
        Arc::new(ScriptedClient::default()),
        RecordingSink::new(Err(err.clone())),
    );

    assert_eq!(
        send(&service, post("hello")).await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("send event to target error: {err}")
        )
    );
}

#[tokio::test]
async fn delivery_failure_takes_precedence_over_generation_failure() {
    let service = IntakeService::new(
        &config(),
        ScriptedClient::answering(Err(GenerationError::EmptyResponse)),
        RecordingSink::new(Err(DeliveryError::Transport {
            context: "connection refused".to_string(),
        })),
    );

    let (status, body) = send(&service, post("hello")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        "send event to target error: transport error: connection refused"
    );
}

#[tokio::test]
async fn empty_body_is_rejected_before_generation() {
    let client = Arc::new(ScriptedClient::default());
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(&config(), client.clone(), sink.clone());

    let (status, _) = send(&service, post("")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(client.calls(), 0);
    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = config();
    config.max_body_bytes = 8;
    let client = Arc::new(ScriptedClient::default());
    let service = IntakeService::new(&config, client.clone(), RecordingSink::new(Ok(())));

    let (status, _) = send(&service, post("this prompt is far too long")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn headers_override_source_and_type() {
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(&config(), Arc::new(ScriptedClient::default()), sink.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("vanus-source", "my-source")
        .header("vanus-type", "my-type")
        .body(Body::from("hello"))
        .unwrap();
    assert_eq!(send(&service, request).await.0, StatusCode::OK);

    let delivered = sink.delivered();
    assert_eq!(delivered[0].source(), "my-source");
    assert_eq!(delivered[0].ty(), "my-type");
}

#[tokio::test]
async fn empty_override_headers_fall_back_to_defaults() {
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(&config(), Arc::new(ScriptedClient::default()), sink.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("vanus-source", "")
        .body(Body::from("hello"))
        .unwrap();
    assert_eq!(send(&service, request).await.0, StatusCode::OK);
    assert_eq!(sink.delivered()[0].source(), DEFAULT_EVENT_SOURCE);
}

#[tokio::test]
async fn any_method_and_path_is_accepted() {
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(&config(), Arc::new(ScriptedClient::default()), sink.clone());

    let request = Request::builder()
        .method("PUT")
        .uri("/some/nested/path?x=1")
        .body(Body::from("hello"))
        .unwrap();
    assert_eq!(send(&service, request).await.0, StatusCode::OK);
    assert_eq!(sink.delivered().len(), 1);
}

#[tokio::test]
async fn exhausted_quota_still_delivers_with_empty_content() {
    let mut config = config();
    config.generation.max_daily_requests = 1;
    let client = Arc::new(ScriptedClient::default());
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(&config, client.clone(), sink.clone());

    assert_eq!(
        send(&service, post("first")).await,
        (StatusCode::OK, String::new())
    );
    assert_eq!(
        send(&service, post("second")).await,
        (
            StatusCode::OK,
            GenerationError::QuotaExhausted { limit: 1 }.to_string()
        )
    );

    assert_eq!(client.calls(), 1);
    assert_eq!(service.quota().remaining(), Some(0));
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[1].content(), Some(""));
}

#[tokio::test]
async fn shutdown_lets_a_request_still_generating_deliver() {
    let mut config = config();
    config.shutdown_timeout = Duration::from_secs(5);
    let sink = RecordingSink::new(Ok(()));
    let service = IntakeService::new(
        &config,
        Arc::new(SlowClient {
            delay: Duration::from_millis(200),
        }),
        sink.clone(),
    );

    let request = tokio::spawn(service.router().oneshot(post("hello")));
    while service.bridge().inflight() < 1 {
        tokio::task::yield_now().await;
    }

    service.shutdown().await;

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].content(), Some("slow: hello"));
}

#[tokio::test]
async fn requests_after_shutdown_are_refused() {
    let client = Arc::new(ScriptedClient::default());
    let service = IntakeService::new(&config(), client.clone(), RecordingSink::new(Ok(())));
    service.shutdown().await;
    assert!(service.bridge().is_shutting_down());

    assert_eq!(
        send(&service, post("hello")).await,
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "send event to target error: service is shutting down".to_string()
        )
    );
    // Refused before generation, so no quota or API call is spent.
    assert_eq!(client.calls(), 0);
}
