use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

/// Facts the core announces to the external notification sink. Delivery
/// (email, in-app) happens downstream; the core only emits, exactly once per
/// effective state transition.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingApproved {
        booking_id: Uuid,
        room_id: Uuid,
    },
    BookingRejected {
        booking_id: Uuid,
        room_id: Uuid,
        reason: String,
    },
    PaymentSucceeded {
        payment_id: Uuid,
        booking_id: Uuid,
        total_minor: i64,
    },
    PaymentFailed {
        payment_id: Uuid,
        booking_id: Uuid,
        status: PaymentStatus,
    },
    RefundCompleted {
        refund_id: Uuid,
        payment_id: Uuid,
        amount_minor: i64,
    },
}
