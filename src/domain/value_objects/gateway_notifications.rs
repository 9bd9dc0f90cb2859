use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

/// Asynchronous payment notification as posted by the gateway.
/// `order_id` correlates to the payment's gateway transaction id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayNotification {
    pub transaction_time: Option<String>,
    pub transaction_status: String,
    pub transaction_id: String,
    pub status_message: Option<String>,
    pub status_code: String,
    pub signature_key: String,
    pub settlement_time: Option<String>,
    pub payment_type: Option<String>,
    pub order_id: String,
    pub merchant_id: Option<String>,
    pub gross_amount: String,
    pub fraud_status: Option<String>,
    pub currency: Option<String>,
}

/// How a notification's `transaction_status` routes through reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Moves the payment to the carried target status.
    Payment(PaymentStatus),
    /// The gateway re-announced a still-pending transaction; nothing to do.
    StillPending,
    /// Confirms a previously initiated refund.
    Refund,
    /// A transaction_status this service does not act on.
    Unrecognized,
}

impl GatewayNotification {
    pub fn kind(&self) -> NotificationKind {
        match self.transaction_status.as_str() {
            "capture" | "settlement" => NotificationKind::Payment(PaymentStatus::Paid),
            "deny" | "failure" => NotificationKind::Payment(PaymentStatus::Failed),
            "cancel" | "expire" => NotificationKind::Payment(PaymentStatus::Cancelled),
            "pending" => NotificationKind::StillPending,
            "refund" | "partial_refund" => NotificationKind::Refund,
            _ => NotificationKind::Unrecognized,
        }
    }
}
