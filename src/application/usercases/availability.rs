use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    repositories::bookings::BookingRepository,
    value_objects::{bookings::BookingModel, time_range::TimeRange},
};

/// Conflict detector for a room and a candidate slot. The repository
/// pre-filters on the coarse stored window; the precise half-open overlap
/// test runs here, so back-to-back bookings never count as conflicts.
pub struct AvailabilityUseCase<B>
where
    B: BookingRepository + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
}

impl<B> AvailabilityUseCase<B>
where
    B: BookingRepository + Send + Sync + 'static,
{
    pub fn new(booking_repo: Arc<B>) -> Self {
        Self { booking_repo }
    }

    /// Blocking bookings that truly overlap the candidate, sorted by start
    /// time for deterministic error messages.
    pub async fn find_conflicts(
        &self,
        room_id: Uuid,
        candidate: &TimeRange,
    ) -> Result<Vec<BookingModel>> {
        let rows = self
            .booking_repo
            .find_blocking_in_window(room_id, candidate.start(), candidate.end())
            .await?;

        let candidate_count = rows.len();
        let mut conflicts: Vec<BookingModel> = rows
            .into_iter()
            .filter(|entity| {
                TimeRange::from_instants(entity.starts_at, entity.ends_at)
                    .map(|booked| booked.overlaps(candidate))
                    .unwrap_or(false)
            })
            .map(BookingModel::from)
            .collect();
        conflicts.sort_by_key(|booking| booking.starts_at);

        debug!(
            %room_id,
            candidate_count,
            conflict_count = conflicts.len(),
            "availability: conflict check finished"
        );

        Ok(conflicts)
    }

    pub async fn is_available(&self, room_id: Uuid, candidate: &TimeRange) -> Result<bool> {
        Ok(self.find_conflicts(room_id, candidate).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use mockall::predicate::eq;

    use crate::domain::{
        entities::bookings::BookingEntity,
        repositories::bookings::MockBookingRepository,
        value_objects::enums::booking_statuses::BookingStatus,
    };

    fn instant(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    fn booking_row(id_byte: u8, starts_at: &str, ends_at: &str) -> BookingEntity {
        BookingEntity {
            id: Uuid::from_bytes([id_byte; 16]),
            room_id: Uuid::from_bytes([1; 16]),
            requester_id: None,
            activity_name: "seminar".to_string(),
            starts_at: instant(starts_at),
            ends_at: instant(ends_at),
            document_ref: None,
            rejected_reason: None,
            status: BookingStatus::Approved.to_string(),
            created_at: instant("2024-01-01T00:00:00Z"),
            updated_at: instant("2024-01-01T00:00:00Z"),
        }
    }

    #[tokio::test]
    async fn filters_adjacent_rows_and_sorts_conflicts() {
        let room_id = Uuid::from_bytes([1; 16]);
        let candidate = TimeRange::from_instants(
            instant("2024-01-10T02:00:00Z"),
            instant("2024-01-10T05:00:00Z"),
        )
        .unwrap();

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_find_blocking_in_window()
            .with(eq(room_id), eq(candidate.start()), eq(candidate.end()))
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    // Later overlap first: output must come back sorted.
                    booking_row(3, "2024-01-10T04:00:00Z", "2024-01-10T06:00:00Z"),
                    booking_row(2, "2024-01-10T01:00:00Z", "2024-01-10T03:00:00Z"),
                    // Ends exactly at the candidate start: no conflict.
                    booking_row(4, "2024-01-10T00:00:00Z", "2024-01-10T02:00:00Z"),
                ])
            });

        let usecase = AvailabilityUseCase::new(Arc::new(booking_repo));
        let conflicts = usecase.find_conflicts(room_id, &candidate).await.unwrap();

        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].id, Uuid::from_bytes([2; 16]));
        assert_eq!(conflicts[1].id, Uuid::from_bytes([3; 16]));
    }

    #[tokio::test]
    async fn reports_available_when_nothing_blocks() {
        let room_id = Uuid::from_bytes([1; 16]);
        let candidate = TimeRange::from_instants(
            instant("2024-01-10T02:00:00Z"),
            instant("2024-01-10T05:00:00Z"),
        )
        .unwrap();

        let mut booking_repo = MockBookingRepository::new();
        booking_repo
            .expect_find_blocking_in_window()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let usecase = AvailabilityUseCase::new(Arc::new(booking_repo));
        assert!(usecase.is_available(room_id, &candidate).await.unwrap());
    }
}
