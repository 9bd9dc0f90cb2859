use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::enums::payment_statuses::PaymentStatus,
};

/// Result of applying one gateway notification to a payment row. The row is
/// locked for the duration of the decision, so notifications for the same
/// transaction id serialize.
#[derive(Debug)]
pub enum ReconcileOutcome {
    Applied(PaymentEntity),
    /// At-least-once redelivery of a status already reflected in the row.
    Duplicate(PaymentEntity),
    /// The notification would move the payment backwards; nothing was
    /// changed.
    Regression {
        current: String,
        incoming: PaymentStatus,
    },
    NotFound,
}

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn create(&self, insert_payment_entity: InsertPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_booking_id(&self, booking_id: Uuid) -> Result<Option<PaymentEntity>>;

    async fn find_by_gateway_transaction_id(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<Option<PaymentEntity>>;

    async fn set_checkout_session(
        &self,
        payment_id: Uuid,
        checkout_url: String,
        checkout_token: String,
    ) -> Result<()>;

    /// Locks the payment row by gateway transaction id and applies `incoming`
    /// under the forward-only reconciliation rules. Sets `paid_at` on the
    /// transition to paid and records the payment method reported by the
    /// gateway.
    async fn apply_gateway_transition(
        &self,
        gateway_transaction_id: &str,
        incoming: PaymentStatus,
        payment_method: Option<String>,
    ) -> Result<ReconcileOutcome>;
}
