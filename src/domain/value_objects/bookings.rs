use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    value_objects::{
        enums::booking_statuses::BookingStatus,
        time_range::{InvalidRangeError, TimeRange},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingModel {
    pub id: Uuid,
    pub room_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub activity_name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub document_ref: Option<String>,
    pub rejected_reason: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingEntity> for BookingModel {
    fn from(entity: BookingEntity) -> Self {
        Self {
            id: entity.id,
            room_id: entity.room_id,
            requester_id: entity.requester_id,
            activity_name: entity.activity_name,
            starts_at: entity.starts_at,
            ends_at: entity.ends_at,
            document_ref: entity.document_ref,
            rejected_reason: entity.rejected_reason,
            status: BookingStatus::from_str(&entity.status).unwrap_or_default(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Booking request as submitted by the requester. Dates and times are the
/// campus wall clock; they are normalized through [`TimeRange`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertBookingModel {
    pub room_id: Uuid,
    pub requester_id: Option<Uuid>,
    pub activity_name: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub document_ref: Option<String>,
}

impl InsertBookingModel {
    pub fn time_range(&self) -> Result<TimeRange, InvalidRangeError> {
        TimeRange::new(self.start_date, self.start_time, self.end_date, self.end_time)
    }

    pub fn to_entity(&self, range: &TimeRange) -> InsertBookingEntity {
        InsertBookingEntity {
            room_id: self.room_id,
            requester_id: self.requester_id,
            activity_name: self.activity_name.clone(),
            starts_at: range.start(),
            ends_at: range.end(),
            document_ref: self.document_ref.clone(),
            status: BookingStatus::Processing.to_string(),
        }
    }
}

/// Candidate slot for the availability probe. Same range semantics as a
/// booking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQueryModel {
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
}

impl AvailabilityQueryModel {
    pub fn time_range(&self) -> Result<TimeRange, InvalidRangeError> {
        TimeRange::new(self.start_date, self.start_time, self.end_date, self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityModel {
    pub available: bool,
    pub conflicts: Vec<BookingModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectBookingModel {
    pub reason: String,
}
