use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::bookings;

/// A request to rent a room for an activity over a date/time range.
/// `requester_id` is a weak reference: the requesting account may be deleted
/// later without invalidating the booking history.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = bookings)]
pub struct BookingEntity {
    pub id: Uuid,
    pub room_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub activity_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub document_ref: Option<String>,
    pub rejected_reason: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct InsertBookingEntity {
    pub room_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub activity_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub document_ref: Option<String>,
    pub status: String,
}
