pub mod bookings;
pub mod event_sink;
pub mod payments;
pub mod refunds;
pub mod rooms;
