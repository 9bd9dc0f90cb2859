use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::domain_events::DomainEvent;

/// Outbound seam to the notification sink. Publishing is fire-and-forget:
/// the core never blocks a state transition on delivery.
#[automock]
#[async_trait]
pub trait EventSink {
    async fn publish(&self, event: DomainEvent) -> Result<()>;
}
