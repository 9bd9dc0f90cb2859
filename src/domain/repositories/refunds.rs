use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    payments::PaymentEntity,
    refunds::{InsertRefundEntity, RefundEntity},
};

/// Result of confirming a refund from a gateway notification. Confirmation
/// settles the refund and the owning payment in the same transaction.
#[derive(Debug)]
pub enum RefundConfirmOutcome {
    Applied {
        refund: RefundEntity,
        payment: PaymentEntity,
    },
    /// The refund is already completed and the payment refunded.
    Duplicate,
    /// No payment is known under the notification's order id.
    PaymentNotFound,
    /// The payment exists but no refund was ever initiated for it.
    NotInitiated,
    /// The refund/payment pair is not in a confirmable state.
    InvalidState {
        refund_status: String,
        payment_status: String,
    },
}

#[automock]
#[async_trait]
pub trait RefundRepository {
    async fn create(&self, insert_refund_entity: InsertRefundEntity) -> Result<RefundEntity>;

    async fn find_by_payment_id(&self, payment_id: Uuid) -> Result<Option<RefundEntity>>;

    /// Locks the payment row by gateway transaction id, then moves its
    /// refund `processed -> completed` and the payment `paid -> refunded`
    /// atomically.
    async fn confirm_by_gateway_transaction_id(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<RefundConfirmOutcome>;
}
