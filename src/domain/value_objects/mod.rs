pub mod bookings;
pub mod domain_events;
pub mod enums;
pub mod gateway_notifications;
pub mod payments;
pub mod refunds;
pub mod time_range;
