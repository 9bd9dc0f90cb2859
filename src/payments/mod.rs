pub mod midtrans_client;

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use crate::domain::value_objects::gateway_notifications::GatewayNotification;

/// A hosted checkout session issued by the gateway for a pending payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub token: String,
    pub redirect_url: String,
}

/// Gateway acknowledgement of an accepted refund request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub refund_id: String,
}

/// Seam to the external payment processor. The order id is always the
/// booking id, which makes every outbound call idempotent on the gateway
/// side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(
        &self,
        order_id: &str,
        gross_amount_minor: i64,
        item_name: &str,
    ) -> AnyResult<CheckoutSession>;

    async fn refund(
        &self,
        order_id: &str,
        amount_minor: i64,
        reason: &str,
    ) -> AnyResult<RefundReceipt>;

    fn verify_signature(&self, notification: &GatewayNotification) -> bool;
}
