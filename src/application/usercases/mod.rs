pub mod availability;
pub mod bookings;
pub mod payment_webhook;
pub mod refunds;
