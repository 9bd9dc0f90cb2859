use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    value_objects::enums::booking_statuses::BookingStatus,
};

/// Result of the approve-inside-lock transaction. Exactly one concurrent
/// approval for overlapping slots can come back `Approved`.
#[derive(Debug)]
pub enum ApproveOutcome {
    Approved(BookingEntity),
    /// The re-check found blocking bookings; the slot was taken by a
    /// concurrent approval or an earlier one.
    SlotTaken(Vec<BookingEntity>),
    /// The booking is not in `processing` anymore.
    InvalidState { current: String },
    NotFound,
}

/// Result of a guarded status transition.
#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(BookingEntity),
    InvalidTransition { current: String },
    NotFound,
}

#[automock]
#[async_trait]
pub trait BookingRepository {
    async fn create(&self, insert_booking_entity: InsertBookingEntity) -> Result<BookingEntity>;

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>>;

    /// Coarse pre-filter for conflict detection: bookings of the room that
    /// hold their slot (approved/completed) and whose stored window touches
    /// `[window_start, window_end]` inclusively. The caller applies the
    /// precise half-open overlap test.
    async fn find_blocking_in_window(
        &self,
        room_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookingEntity>>;

    /// Re-runs the conflict check and flips `processing -> approved` inside
    /// one transaction, holding a lock on the room row so concurrent
    /// approvals for the same room serialize.
    async fn approve_within_slot_lock(&self, booking_id: Uuid) -> Result<ApproveOutcome>;

    /// Applies `next` under the booking-status transition rules, storing the
    /// rejection reason when transitioning to rejected.
    async fn transition_status(
        &self,
        booking_id: Uuid,
        next: BookingStatus,
        rejected_reason: Option<String>,
    ) -> Result<TransitionOutcome>;

    /// Completes every approved booking whose end has elapsed; returns the
    /// completed rows.
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<Vec<BookingEntity>>;
}
