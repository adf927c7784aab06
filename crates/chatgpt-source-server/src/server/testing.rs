//! Helpers shared by the unit tests of several modules.

use async_trait::async_trait;
use axum::Router;
use chatgpt_source_core::{DeliveryError, Event, GenerationError};
use parking_lot::Mutex;
use std::{collections::VecDeque, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

use crate::server::{generation::CompletionClient, sink::EventSink};

/// Serves `router` on an ephemeral local port and returns its address.
pub(crate) async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub(crate) async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Completion client answering from a fixed script and recording prompts.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    answers: Mutex<VecDeque<Result<String, GenerationError>>>,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn answering(answer: Result<&str, GenerationError>) -> Arc<Self> {
        let client = Self::default();
        client.answers.lock().push_back(answer.map(str::to_string));
        Arc::new(client)
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {prompt}")))
    }
}

/// Sink answering from a fixed outcome and recording delivered events.
pub(crate) struct RecordingSink {
    outcome: Result<(), DeliveryError>,
    pub(crate) events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub(crate) fn new(outcome: Result<(), DeliveryError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            events: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn delivered(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn deliver(&self, event: &Event) -> Result<(), DeliveryError> {
        self.events.lock().push(event.clone());
        self.outcome.clone()
    }
}
