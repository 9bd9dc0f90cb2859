use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::domain::{
    repositories::event_sink::EventSink, value_objects::domain_events::DomainEvent,
};

/// Default sink: writes domain events to the log stream, where the external
/// notification pipeline picks them up. Never fails a caller.
#[derive(Debug, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        info!(event = ?event, "domain event emitted");
        Ok(())
    }
}
