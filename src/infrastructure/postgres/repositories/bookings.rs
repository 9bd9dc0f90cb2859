use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::query_dsl::methods::LockingDsl;
use diesel::{insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            bookings::{BookingEntity, InsertBookingEntity},
            rooms::RoomEntity,
        },
        repositories::bookings::{ApproveOutcome, BookingRepository, TransitionOutcome},
        value_objects::{enums::booking_statuses::BookingStatus, time_range::TimeRange},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{bookings, rooms},
    },
};

pub struct BookingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BookingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn blocking_statuses() -> Vec<String> {
        vec![
            BookingStatus::Approved.to_string(),
            BookingStatus::Completed.to_string(),
        ]
    }
}

#[async_trait]
impl BookingRepository for BookingPostgres {
    async fn create(&self, insert_booking_entity: InsertBookingEntity) -> Result<BookingEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let booking = insert_into(bookings::table)
            .values(&insert_booking_entity)
            .returning(BookingEntity::as_returning())
            .get_result::<BookingEntity>(&mut conn)?;

        Ok(booking)
    }

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let booking = bookings::table
            .find(booking_id)
            .select(BookingEntity::as_select())
            .first::<BookingEntity>(&mut conn)
            .optional()?;

        Ok(booking)
    }

    async fn find_blocking_in_window(
        &self,
        room_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Inclusive bounds on purpose: this is the coarse pre-filter, the
        // half-open overlap test runs in the availability checker.
        let results = bookings::table
            .filter(bookings::room_id.eq(room_id))
            .filter(bookings::status.eq_any(Self::blocking_statuses()))
            .filter(bookings::starts_at.le(window_end))
            .filter(bookings::ends_at.ge(window_start))
            .select(BookingEntity::as_select())
            .load::<BookingEntity>(&mut conn)?;

        Ok(results)
    }

    async fn approve_within_slot_lock(&self, booking_id: Uuid) -> Result<ApproveOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<ApproveOutcome, anyhow::Error, _>(|conn| {
            let booking = bookings::table
                .find(booking_id)
                .for_update()
                .select(BookingEntity::as_select())
                .first::<BookingEntity>(conn)
                .optional()?;
            let Some(booking) = booking else {
                return Ok(ApproveOutcome::NotFound);
            };

            if booking.status != BookingStatus::Processing.to_string() {
                return Ok(ApproveOutcome::InvalidState {
                    current: booking.status,
                });
            }

            // The room row is the serialization point: two approvals for the
            // same room cannot both hold this lock, so the loser re-checks
            // against the winner's already-approved row.
            rooms::table
                .find(booking.room_id)
                .for_update()
                .select(RoomEntity::as_select())
                .first::<RoomEntity>(conn)?;

            let candidate = TimeRange::from_instants(booking.starts_at, booking.ends_at)?;
            let blocking = bookings::table
                .filter(bookings::room_id.eq(booking.room_id))
                .filter(bookings::status.eq_any(Self::blocking_statuses()))
                .filter(bookings::starts_at.le(booking.ends_at))
                .filter(bookings::ends_at.ge(booking.starts_at))
                .select(BookingEntity::as_select())
                .load::<BookingEntity>(conn)?;

            let mut conflicts: Vec<BookingEntity> = blocking
                .into_iter()
                .filter(|row| {
                    TimeRange::from_instants(row.starts_at, row.ends_at)
                        .map(|booked| booked.overlaps(&candidate))
                        .unwrap_or(false)
                })
                .collect();
            if !conflicts.is_empty() {
                conflicts.sort_by_key(|row| row.starts_at);
                return Ok(ApproveOutcome::SlotTaken(conflicts));
            }

            let approved = update(bookings::table.find(booking_id))
                .set((
                    bookings::status.eq(BookingStatus::Approved.to_string()),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .returning(BookingEntity::as_returning())
                .get_result::<BookingEntity>(conn)?;

            Ok(ApproveOutcome::Approved(approved))
        })?;

        Ok(outcome)
    }

    async fn transition_status(
        &self,
        booking_id: Uuid,
        next: BookingStatus,
        rejected_reason: Option<String>,
    ) -> Result<TransitionOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<TransitionOutcome, anyhow::Error, _>(|conn| {
            let booking = bookings::table
                .find(booking_id)
                .for_update()
                .select(BookingEntity::as_select())
                .first::<BookingEntity>(conn)
                .optional()?;
            let Some(booking) = booking else {
                return Ok(TransitionOutcome::NotFound);
            };

            let allowed = BookingStatus::from_str(&booking.status)
                .map(|current| current.can_transition_to(next))
                .unwrap_or(false);
            if !allowed {
                return Ok(TransitionOutcome::InvalidTransition {
                    current: booking.status,
                });
            }

            let updated = if next == BookingStatus::Rejected {
                update(bookings::table.find(booking_id))
                    .set((
                        bookings::status.eq(next.to_string()),
                        bookings::rejected_reason.eq(rejected_reason),
                        bookings::updated_at.eq(Utc::now()),
                    ))
                    .returning(BookingEntity::as_returning())
                    .get_result::<BookingEntity>(conn)?
            } else {
                update(bookings::table.find(booking_id))
                    .set((
                        bookings::status.eq(next.to_string()),
                        bookings::updated_at.eq(Utc::now()),
                    ))
                    .returning(BookingEntity::as_returning())
                    .get_result::<BookingEntity>(conn)?
            };

            Ok(TransitionOutcome::Applied(updated))
        })?;

        Ok(outcome)
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<Vec<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let completed = update(
            bookings::table
                .filter(bookings::status.eq(BookingStatus::Approved.to_string()))
                .filter(bookings::ends_at.le(now)),
        )
        .set((
            bookings::status.eq(BookingStatus::Completed.to_string()),
            bookings::updated_at.eq(now),
        ))
        .returning(BookingEntity::as_returning())
        .get_results::<BookingEntity>(&mut conn)?;

        Ok(completed)
    }
}
