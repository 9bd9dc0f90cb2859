pub mod booking_statuses;
pub mod payment_statuses;
pub mod refund_statuses;
