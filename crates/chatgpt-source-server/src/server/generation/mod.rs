//! Text generation for incoming prompts.
//!
//! The intake handler only sees the [`CompletionClient`] trait. A failed
//! generation never aborts a request: the event is still delivered and the
//! error is reported alongside the delivery outcome.
//!
//! - [`OpenAiClient`] - Chat completions over HTTP.
//! - [`DailyQuota`] - Per-day allowance of generation calls.

mod openai;
mod quota;


use async_trait::async_trait;
use chatgpt_source_core::GenerationError;

pub use openai::OpenAiClient;
pub use quota::DailyQuota;

/// Produces text for a prompt.
#[async_trait]
pub trait CompletionClient: Send + Sync + 'static {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
