use super::EventSink;
use async_trait::async_trait;
use chatgpt_source_core::{DeliveryError, Event};

/// Logs each event at `info` and reports it as delivered.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn deliver(&self, event: &Event) -> Result<(), DeliveryError> {
        tracing::info!(
            id = %event.id(),
            source = event.source(),
            r#type = event.ty(),
            time = %event.time(),
            content = event.content().unwrap_or_default(),
            "Event received"
        );
        Ok(())
    }
}
