use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usercases::{availability::AvailabilityUseCase, refunds::RefundUseCase},
    domain::{
        entities::{bookings::BookingEntity, payments::InsertPaymentEntity},
        repositories::{
            bookings::{ApproveOutcome, BookingRepository, TransitionOutcome},
            event_sink::EventSink,
            payments::PaymentRepository,
            refunds::RefundRepository,
            rooms::RoomRepository,
        },
        value_objects::{
            bookings::{AvailabilityModel, AvailabilityQueryModel, BookingModel, InsertBookingModel},
            domain_events::DomainEvent,
            enums::{booking_statuses::BookingStatus, payment_statuses::PaymentStatus},
            payments::PaymentModel,
            time_range::RENTAL_UTC_OFFSET_SECS,
        },
    },
    payments::PaymentGateway,
};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("room not found")]
    RoomNotFound,
    #[error("booking not found")]
    BookingNotFound,
    #[error("requested slot conflicts with {} existing booking(s)", .conflicts.len())]
    Conflict { conflicts: Vec<BookingModel> },
    #[error("slot is no longer available")]
    SlotNoLongerAvailable,
    #[error("booking has already been decided: {current}")]
    AlreadyDecided { current: String },
    #[error("invalid status transition from {current}")]
    InvalidTransition { current: String },
    #[error("booking has not reached its end time yet")]
    NotYetElapsed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::RoomNotFound | BookingError::BookingNotFound => StatusCode::NOT_FOUND,
            BookingError::Conflict { .. }
            | BookingError::SlotNoLongerAvailable
            | BookingError::AlreadyDecided { .. }
            | BookingError::InvalidTransition { .. }
            | BookingError::NotYetElapsed => StatusCode::CONFLICT,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BookingError>;

/// Orchestrates the booking lifecycle: availability-guarded creation, the
/// approval path that opens a payment, rejection with refund hand-off, and
/// system-driven completion.
pub struct BookingUseCase<R, B, P, F, G, E>
where
    R: RoomRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    room_repo: Arc<R>,
    booking_repo: Arc<B>,
    payment_repo: Arc<P>,
    availability: Arc<AvailabilityUseCase<B>>,
    refunds: Arc<RefundUseCase<F, G, E>>,
    gateway: Arc<G>,
    event_sink: Arc<E>,
    gateway_fee_minor: i64,
}

impl<R, B, P, F, G, E> BookingUseCase<R, B, P, F, G, E>
where
    R: RoomRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_repo: Arc<R>,
        booking_repo: Arc<B>,
        payment_repo: Arc<P>,
        availability: Arc<AvailabilityUseCase<B>>,
        refunds: Arc<RefundUseCase<F, G, E>>,
        gateway: Arc<G>,
        event_sink: Arc<E>,
        gateway_fee_minor: i64,
    ) -> Self {
        Self {
            room_repo,
            booking_repo,
            payment_repo,
            availability,
            refunds,
            gateway,
            event_sink,
            gateway_fee_minor,
        }
    }

    pub async fn create_booking(
        &self,
        insert_booking_model: InsertBookingModel,
    ) -> UseCaseResult<BookingModel> {
        info!(
            room_id = %insert_booking_model.room_id,
            activity = %insert_booking_model.activity_name,
            "bookings: create booking requested"
        );

        if insert_booking_model.activity_name.trim().is_empty() {
            let err = BookingError::Validation("activity name is required".to_string());
            warn!(
                room_id = %insert_booking_model.room_id,
                status = err.status_code().as_u16(),
                "bookings: booking request without activity name"
            );
            return Err(err);
        }

        let range = insert_booking_model.time_range().map_err(|err| {
            warn!(
                room_id = %insert_booking_model.room_id,
                error = %err,
                "bookings: booking request with invalid range"
            );
            BookingError::Validation(err.to_string())
        })?;

        let room = self
            .room_repo
            .find_by_id(insert_booking_model.room_id)
            .await
            .map_err(|err| {
                error!(
                    room_id = %insert_booking_model.room_id,
                    db_error = ?err,
                    "bookings: failed to load room"
                );
                BookingError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = BookingError::RoomNotFound;
                warn!(
                    room_id = %insert_booking_model.room_id,
                    status = err.status_code().as_u16(),
                    "bookings: booking request for unknown room"
                );
                err
            })?;

        let conflicts = self
            .availability
            .find_conflicts(insert_booking_model.room_id, &range)
            .await
            .map_err(|err| {
                error!(
                    room_id = %insert_booking_model.room_id,
                    db_error = ?err,
                    "bookings: conflict check failed"
                );
                BookingError::Internal(err)
            })?;
        if !conflicts.is_empty() {
            let err = BookingError::Conflict { conflicts };
            warn!(
                room_id = %insert_booking_model.room_id,
                status = err.status_code().as_u16(),
                "bookings: booking request conflicts with existing bookings"
            );
            return Err(err);
        }

        let entity = self
            .booking_repo
            .create(insert_booking_model.to_entity(&range))
            .await
            .map_err(|err| {
                error!(
                    room_id = %insert_booking_model.room_id,
                    db_error = ?err,
                    "bookings: failed to persist booking"
                );
                BookingError::Internal(err)
            })?;

        info!(
            booking_id = %entity.id,
            room = %room.name,
            "bookings: booking created in processing"
        );
        Ok(BookingModel::from(entity))
    }

    /// Flips `processing -> approved` behind the repository's slot lock and
    /// opens the payment. A raced approval is auto-rejected with a
    /// system-generated reason.
    pub async fn approve(&self, booking_id: Uuid, actor_id: Uuid) -> UseCaseResult<BookingModel> {
        info!(%booking_id, %actor_id, "bookings: approval requested");

        let outcome = self
            .booking_repo
            .approve_within_slot_lock(booking_id)
            .await
            .map_err(|err| {
                error!(
                    %booking_id,
                    db_error = ?err,
                    "bookings: approval transaction failed"
                );
                BookingError::Internal(err)
            })?;

        let approved = match outcome {
            ApproveOutcome::NotFound => {
                let err = BookingError::BookingNotFound;
                warn!(
                    %booking_id,
                    status = err.status_code().as_u16(),
                    "bookings: approval for unknown booking"
                );
                return Err(err);
            }
            ApproveOutcome::InvalidState { current } => {
                let err = BookingError::AlreadyDecided {
                    current: current.clone(),
                };
                warn!(
                    %booking_id,
                    status = err.status_code().as_u16(),
                    current = %current,
                    "bookings: approval for already-decided booking"
                );
                return Err(err);
            }
            ApproveOutcome::SlotTaken(blocking) => {
                warn!(
                    %booking_id,
                    blocking = blocking.len(),
                    "bookings: slot no longer available at approval time"
                );
                self.auto_reject_raced(booking_id).await;
                return Err(BookingError::SlotNoLongerAvailable);
            }
            ApproveOutcome::Approved(entity) => entity,
        };

        let room = self
            .room_repo
            .find_by_id(approved.room_id)
            .await
            .map_err(|err| {
                error!(
                    %booking_id,
                    room_id = %approved.room_id,
                    db_error = ?err,
                    "bookings: failed to load room for payment"
                );
                BookingError::Internal(err)
            })?
            .ok_or_else(|| {
                error!(
                    %booking_id,
                    room_id = %approved.room_id,
                    "bookings: approved booking references missing room"
                );
                BookingError::RoomNotFound
            })?;

        let payment = self
            .payment_repo
            .create(InsertPaymentEntity {
                booking_id: approved.id,
                // The order id equals the booking id; it is the idempotency
                // key for every outbound gateway call.
                gateway_transaction_id: approved.id.to_string(),
                invoice_number: invoice_number(&approved),
                amount_minor: room.rental_price_minor,
                gateway_fee_minor: self.gateway_fee_minor,
                total_minor: room.rental_price_minor + self.gateway_fee_minor,
                status: PaymentStatus::Pending.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    %booking_id,
                    db_error = ?err,
                    "bookings: failed to create payment for approved booking"
                );
                BookingError::Internal(err)
            })?;

        match self
            .gateway
            .create_checkout(
                &payment.gateway_transaction_id,
                payment.total_minor,
                &approved.activity_name,
            )
            .await
        {
            Ok(session) => {
                if let Err(error) = self
                    .payment_repo
                    .set_checkout_session(payment.id, session.redirect_url, session.token)
                    .await
                {
                    error!(
                        payment_id = %payment.id,
                        db_error = ?error,
                        "bookings: failed to store checkout session"
                    );
                }
            }
            Err(error) => {
                // A timed-out call may still have been applied gateway-side;
                // the order id keys later reconciliation by webhook.
                warn!(
                    payment_id = %payment.id,
                    error = ?error,
                    "bookings: checkout session creation failed"
                );
            }
        }

        self.emit(DomainEvent::BookingApproved {
            booking_id: approved.id,
            room_id: approved.room_id,
        })
        .await;

        info!(
            %booking_id,
            payment_id = %payment.id,
            total_minor = payment.total_minor,
            "bookings: booking approved and payment opened"
        );
        Ok(BookingModel::from(approved))
    }

    pub async fn reject(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        reason: &str,
    ) -> UseCaseResult<BookingModel> {
        info!(%booking_id, %actor_id, "bookings: rejection requested");

        let reason = reason.trim();
        if reason.is_empty() {
            let err = BookingError::Validation("a rejection reason is required".to_string());
            warn!(
                %booking_id,
                status = err.status_code().as_u16(),
                "bookings: rejection without reason"
            );
            return Err(err);
        }

        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "bookings: failed to load booking");
                BookingError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = BookingError::BookingNotFound;
                warn!(
                    %booking_id,
                    status = err.status_code().as_u16(),
                    "bookings: rejection for unknown booking"
                );
                err
            })?;

        let current = BookingStatus::from_str(&booking.status).ok_or_else(|| {
            error!(
                %booking_id,
                stored_status = %booking.status,
                "bookings: booking row carries unknown status"
            );
            BookingError::Internal(anyhow::anyhow!(
                "booking {booking_id} carries unknown status {}",
                booking.status
            ))
        })?;
        if !current.can_transition_to(BookingStatus::Rejected) {
            let err = BookingError::AlreadyDecided {
                current: booking.status.clone(),
            };
            warn!(
                %booking_id,
                status = err.status_code().as_u16(),
                current = %booking.status,
                "bookings: rejection for booking that cannot be rejected"
            );
            return Err(err);
        }

        if current == BookingStatus::Approved {
            self.refund_if_paid(booking_id, reason).await?;
        }

        let outcome = self
            .booking_repo
            .transition_status(booking_id, BookingStatus::Rejected, Some(reason.to_string()))
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "bookings: rejection transition failed");
                BookingError::Internal(err)
            })?;

        match outcome {
            TransitionOutcome::Applied(entity) => {
                self.emit(DomainEvent::BookingRejected {
                    booking_id: entity.id,
                    room_id: entity.room_id,
                    reason: reason.to_string(),
                })
                .await;
                info!(%booking_id, "bookings: booking rejected");
                Ok(BookingModel::from(entity))
            }
            TransitionOutcome::InvalidTransition { current } => {
                let err = BookingError::AlreadyDecided {
                    current: current.clone(),
                };
                warn!(
                    %booking_id,
                    status = err.status_code().as_u16(),
                    current = %current,
                    "bookings: rejection lost a race with another decision"
                );
                Err(err)
            }
            TransitionOutcome::NotFound => Err(BookingError::BookingNotFound),
        }
    }

    /// System-invoked once the rental window has elapsed.
    pub async fn complete(&self, booking_id: Uuid) -> UseCaseResult<BookingModel> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "bookings: failed to load booking");
                BookingError::Internal(err)
            })?
            .ok_or(BookingError::BookingNotFound)?;

        if booking.status != BookingStatus::Approved.to_string() {
            let err = BookingError::InvalidTransition {
                current: booking.status.clone(),
            };
            warn!(
                %booking_id,
                status = err.status_code().as_u16(),
                current = %booking.status,
                "bookings: completion for booking that is not approved"
            );
            return Err(err);
        }

        if booking.ends_at > Utc::now() {
            let err = BookingError::NotYetElapsed;
            warn!(
                %booking_id,
                ends_at = %booking.ends_at,
                status = err.status_code().as_u16(),
                "bookings: completion before end of rental"
            );
            return Err(err);
        }

        let outcome = self
            .booking_repo
            .transition_status(booking_id, BookingStatus::Completed, None)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "bookings: completion transition failed");
                BookingError::Internal(err)
            })?;

        match outcome {
            TransitionOutcome::Applied(entity) => {
                info!(%booking_id, "bookings: booking completed");
                Ok(BookingModel::from(entity))
            }
            TransitionOutcome::InvalidTransition { current } => {
                Err(BookingError::InvalidTransition { current })
            }
            TransitionOutcome::NotFound => Err(BookingError::BookingNotFound),
        }
    }

    /// Sweep for the background loop: completes every approved booking whose
    /// end has elapsed.
    pub async fn complete_elapsed(&self) -> UseCaseResult<usize> {
        let completed = self
            .booking_repo
            .complete_elapsed(Utc::now())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "bookings: completion sweep failed");
                BookingError::Internal(err)
            })?;

        for booking in &completed {
            info!(
                booking_id = %booking.id,
                ends_at = %booking.ends_at,
                "bookings: booking completed after end of rental"
            );
        }
        Ok(completed.len())
    }

    pub async fn get_availability(
        &self,
        query: AvailabilityQueryModel,
    ) -> UseCaseResult<AvailabilityModel> {
        let range = query.time_range().map_err(|err| {
            warn!(
                room_id = %query.room_id,
                error = %err,
                "bookings: availability probe with invalid range"
            );
            BookingError::Validation(err.to_string())
        })?;

        self.room_repo
            .find_by_id(query.room_id)
            .await
            .map_err(|err| {
                error!(room_id = %query.room_id, db_error = ?err, "bookings: failed to load room");
                BookingError::Internal(err)
            })?
            .ok_or(BookingError::RoomNotFound)?;

        let conflicts = self
            .availability
            .find_conflicts(query.room_id, &range)
            .await
            .map_err(|err| {
                error!(
                    room_id = %query.room_id,
                    db_error = ?err,
                    "bookings: availability probe failed"
                );
                BookingError::Internal(err)
            })?;

        Ok(AvailabilityModel {
            available: conflicts.is_empty(),
            conflicts,
        })
    }

    async fn auto_reject_raced(&self, booking_id: Uuid) {
        let reason =
            "Slot is no longer available: the room was approved for an overlapping booking"
                .to_string();
        match self
            .booking_repo
            .transition_status(booking_id, BookingStatus::Rejected, Some(reason.clone()))
            .await
        {
            Ok(TransitionOutcome::Applied(entity)) => {
                info!(%booking_id, "bookings: raced booking auto-rejected");
                self.emit(DomainEvent::BookingRejected {
                    booking_id: entity.id,
                    room_id: entity.room_id,
                    reason,
                })
                .await;
            }
            Ok(other) => {
                warn!(
                    %booking_id,
                    outcome = ?other,
                    "bookings: could not auto-reject raced booking"
                );
            }
            Err(error) => {
                error!(
                    %booking_id,
                    db_error = ?error,
                    "bookings: auto-reject of raced booking failed"
                );
            }
        }
    }

    async fn refund_if_paid(&self, booking_id: Uuid, reason: &str) -> UseCaseResult<()> {
        let payment = self
            .payment_repo
            .find_by_booking_id(booking_id)
            .await
            .map_err(|err| {
                error!(%booking_id, db_error = ?err, "bookings: failed to load payment");
                BookingError::Internal(err)
            })?;

        if let Some(payment) = payment.map(PaymentModel::from) {
            if payment.status == PaymentStatus::Paid {
                if let Err(error) = self
                    .refunds
                    .initiate(&payment, BookingStatus::Rejected, reason)
                    .await
                {
                    // Refund failure never blocks the rejection; retry is an
                    // out-of-band concern.
                    warn!(
                        %booking_id,
                        payment_id = %payment.id,
                        error = ?error,
                        "bookings: refund initiation failed during rejection"
                    );
                }
            }
        }
        Ok(())
    }

    async fn emit(&self, event: DomainEvent) {
        if let Err(error) = self.event_sink.publish(event).await {
            warn!(error = ?error, "bookings: event sink rejected domain event");
        }
    }
}

fn invoice_number(booking: &BookingEntity) -> String {
    let offset = FixedOffset::east_opt(RENTAL_UTC_OFFSET_SECS).expect("rental offset is in range");
    let day = booking.starts_at.with_timezone(&offset).format("%Y%m%d");
    let short_id = booking.id.simple().to_string()[..8].to_uppercase();
    format!("INV/{day}/{short_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
    use mockall::predicate::eq;

    use crate::{
        domain::{
            entities::{payments::PaymentEntity, rooms::RoomEntity},
            repositories::{
                bookings::MockBookingRepository, event_sink::MockEventSink,
                payments::MockPaymentRepository, refunds::MockRefundRepository,
                rooms::MockRoomRepository,
            },
        },
        payments::{CheckoutSession, MockPaymentGateway, RefundReceipt},
    };

    const ROOM_ID: Uuid = Uuid::from_bytes([1; 16]);
    const BOOKING_ID: Uuid = Uuid::from_bytes([2; 16]);
    const ACTOR_ID: Uuid = Uuid::from_bytes([3; 16]);
    const PAYMENT_ID: Uuid = Uuid::from_bytes([4; 16]);

    fn instant(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    fn room() -> RoomEntity {
        RoomEntity {
            id: ROOM_ID,
            name: "Auditorium A".to_string(),
            rental_price_minor: 1_000_000,
            capacity: 300,
            created_at: instant("2023-12-01T00:00:00Z"),
        }
    }

    fn booking(status: BookingStatus) -> BookingEntity {
        BookingEntity {
            id: BOOKING_ID,
            room_id: ROOM_ID,
            requester_id: Some(ACTOR_ID),
            activity_name: "graduation ceremony".to_string(),
            starts_at: instant("2024-01-10T02:00:00Z"),
            ends_at: instant("2024-01-10T04:00:00Z"),
            document_ref: Some("docs/proposal.pdf".to_string()),
            rejected_reason: None,
            status: status.to_string(),
            created_at: instant("2024-01-01T00:00:00Z"),
            updated_at: instant("2024-01-01T00:00:00Z"),
        }
    }

    fn payment(status: PaymentStatus) -> PaymentEntity {
        PaymentEntity {
            id: PAYMENT_ID,
            booking_id: BOOKING_ID,
            gateway_transaction_id: BOOKING_ID.to_string(),
            invoice_number: "INV/20240110/02020202".to_string(),
            amount_minor: 1_000_000,
            gateway_fee_minor: 0,
            total_minor: 1_000_000,
            payment_method: Some("bank_transfer".to_string()),
            checkout_url: None,
            checkout_token: None,
            status: status.to_string(),
            paid_at: None,
            created_at: instant("2024-01-02T00:00:00Z"),
            updated_at: instant("2024-01-02T00:00:00Z"),
        }
    }

    fn insert_model() -> InsertBookingModel {
        InsertBookingModel {
            room_id: ROOM_ID,
            requester_id: Some(ACTOR_ID),
            activity_name: "graduation ceremony".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            document_ref: None,
        }
    }

    struct Mocks {
        room_repo: MockRoomRepository,
        booking_repo: MockBookingRepository,
        availability_repo: MockBookingRepository,
        payment_repo: MockPaymentRepository,
        refund_repo: MockRefundRepository,
        gateway: MockPaymentGateway,
        refund_gateway: MockPaymentGateway,
        event_sink: MockEventSink,
        refund_event_sink: MockEventSink,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                room_repo: MockRoomRepository::new(),
                booking_repo: MockBookingRepository::new(),
                availability_repo: MockBookingRepository::new(),
                payment_repo: MockPaymentRepository::new(),
                refund_repo: MockRefundRepository::new(),
                gateway: MockPaymentGateway::new(),
                refund_gateway: MockPaymentGateway::new(),
                event_sink: MockEventSink::new(),
                refund_event_sink: MockEventSink::new(),
            }
        }

        fn build(
            self,
        ) -> BookingUseCase<
            MockRoomRepository,
            MockBookingRepository,
            MockPaymentRepository,
            MockRefundRepository,
            MockPaymentGateway,
            MockEventSink,
        > {
            let availability = Arc::new(AvailabilityUseCase::new(Arc::new(self.availability_repo)));
            let refunds = Arc::new(RefundUseCase::new(
                Arc::new(self.refund_repo),
                Arc::new(self.refund_gateway),
                Arc::new(self.refund_event_sink),
            ));
            BookingUseCase::new(
                Arc::new(self.room_repo),
                Arc::new(self.booking_repo),
                Arc::new(self.payment_repo),
                availability,
                refunds,
                Arc::new(self.gateway),
                Arc::new(self.event_sink),
                0,
            )
        }
    }

    #[tokio::test]
    async fn creates_a_booking_in_processing_when_slot_is_free() {
        let mut mocks = Mocks::new();
        mocks
            .room_repo
            .expect_find_by_id()
            .with(eq(ROOM_ID))
            .times(1)
            .returning(|_| Ok(Some(room())));
        mocks
            .availability_repo
            .expect_find_blocking_in_window()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        mocks
            .booking_repo
            .expect_create()
            .withf(|insert| {
                insert.room_id == ROOM_ID
                    && insert.status == BookingStatus::Processing.to_string()
                    && insert.starts_at == "2024-01-10T02:00:00Z".parse::<DateTime<Utc>>().unwrap()
            })
            .times(1)
            .returning(|_| Ok(booking(BookingStatus::Processing)));

        let result = mocks.build().create_booking(insert_model()).await.unwrap();
        assert_eq!(result.status, BookingStatus::Processing);
    }

    #[tokio::test]
    async fn refuses_a_degenerate_range_before_touching_storage() {
        let mut model = insert_model();
        model.end_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let err = Mocks::new().build().create_booking(model).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refuses_a_conflicting_booking_request() {
        let mut mocks = Mocks::new();
        mocks
            .room_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(room())));
        mocks
            .availability_repo
            .expect_find_blocking_in_window()
            .times(1)
            .returning(|_, _, _| Ok(vec![booking(BookingStatus::Approved)]));

        let err = mocks
            .build()
            .create_booking(insert_model())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict { ref conflicts } if conflicts.len() == 1));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn approval_opens_a_pending_payment_and_checkout() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_approve_within_slot_lock()
            .with(eq(BOOKING_ID))
            .times(1)
            .returning(|_| Ok(ApproveOutcome::Approved(booking(BookingStatus::Approved))));
        mocks
            .room_repo
            .expect_find_by_id()
            .with(eq(ROOM_ID))
            .times(1)
            .returning(|_| Ok(Some(room())));
        mocks
            .payment_repo
            .expect_create()
            .withf(|insert| {
                insert.booking_id == BOOKING_ID
                    && insert.gateway_transaction_id == BOOKING_ID.to_string()
                    && insert.amount_minor == 1_000_000
                    && insert.total_minor == 1_000_000
                    && insert.status == PaymentStatus::Pending.to_string()
            })
            .times(1)
            .returning(|_| Ok(payment(PaymentStatus::Pending)));
        mocks
            .gateway
            .expect_create_checkout()
            .withf(|order_id, amount, _name| {
                order_id == BOOKING_ID.to_string() && *amount == 1_000_000
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(CheckoutSession {
                    token: "snap-token".to_string(),
                    redirect_url: "https://app.sandbox.midtrans.com/snap/v4/redirection/x".to_string(),
                })
            });
        mocks
            .payment_repo
            .expect_set_checkout_session()
            .with(
                eq(PAYMENT_ID),
                eq("https://app.sandbox.midtrans.com/snap/v4/redirection/x".to_string()),
                eq("snap-token".to_string()),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .event_sink
            .expect_publish()
            .withf(|event| matches!(event, DomainEvent::BookingApproved { .. }))
            .times(1)
            .returning(|_| Ok(()));

        let result = mocks.build().approve(BOOKING_ID, ACTOR_ID).await.unwrap();
        assert_eq!(result.status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn approval_survives_a_failed_checkout_call() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_approve_within_slot_lock()
            .times(1)
            .returning(|_| Ok(ApproveOutcome::Approved(booking(BookingStatus::Approved))));
        mocks
            .room_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(room())));
        mocks
            .payment_repo
            .expect_create()
            .times(1)
            .returning(|_| Ok(payment(PaymentStatus::Pending)));
        mocks
            .gateway
            .expect_create_checkout()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("gateway timeout")));
        // No set_checkout_session expectation: the payment stays without a
        // session until reconciliation or a later retry.
        mocks
            .event_sink
            .expect_publish()
            .withf(|event| matches!(event, DomainEvent::BookingApproved { .. }))
            .times(1)
            .returning(|_| Ok(()));

        let result = mocks.build().approve(BOOKING_ID, ACTOR_ID).await.unwrap();
        assert_eq!(result.status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn raced_approval_is_auto_rejected() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_approve_within_slot_lock()
            .times(1)
            .returning(|_| Ok(ApproveOutcome::SlotTaken(vec![booking(BookingStatus::Approved)])));
        mocks
            .booking_repo
            .expect_transition_status()
            .withf(|id, next, reason| {
                *id == BOOKING_ID
                    && *next == BookingStatus::Rejected
                    && reason
                        .as_deref()
                        .is_some_and(|r| r.contains("no longer available"))
            })
            .times(1)
            .returning(|_, _, reason| {
                let mut entity = booking(BookingStatus::Rejected);
                entity.rejected_reason = reason;
                Ok(TransitionOutcome::Applied(entity))
            });
        mocks
            .event_sink
            .expect_publish()
            .withf(|event| {
                matches!(
                    event,
                    DomainEvent::BookingRejected { reason, .. } if reason.contains("no longer available")
                )
            })
            .times(1)
            .returning(|_| Ok(()));

        let err = mocks.build().approve(BOOKING_ID, ACTOR_ID).await.unwrap_err();
        assert!(matches!(err, BookingError::SlotNoLongerAvailable));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn approving_a_decided_booking_fails() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_approve_within_slot_lock()
            .times(1)
            .returning(|_| {
                Ok(ApproveOutcome::InvalidState {
                    current: BookingStatus::Rejected.to_string(),
                })
            });

        let err = mocks.build().approve(BOOKING_ID, ACTOR_ID).await.unwrap_err();
        assert!(matches!(err, BookingError::AlreadyDecided { .. }));
    }

    #[tokio::test]
    async fn rejection_requires_a_reason() {
        let err = Mocks::new()
            .build()
            .reject(BOOKING_ID, ACTOR_ID, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_a_processing_booking_without_refund() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(booking(BookingStatus::Processing))));
        mocks
            .booking_repo
            .expect_transition_status()
            .withf(|_, next, reason| {
                *next == BookingStatus::Rejected
                    && reason.as_deref() == Some("room under maintenance")
            })
            .times(1)
            .returning(|_, _, reason| {
                let mut entity = booking(BookingStatus::Rejected);
                entity.rejected_reason = reason;
                Ok(TransitionOutcome::Applied(entity))
            });
        mocks
            .event_sink
            .expect_publish()
            .withf(|event| matches!(event, DomainEvent::BookingRejected { .. }))
            .times(1)
            .returning(|_| Ok(()));

        let result = mocks
            .build()
            .reject(BOOKING_ID, ACTOR_ID, "room under maintenance")
            .await
            .unwrap();
        assert_eq!(result.status, BookingStatus::Rejected);
    }

    #[tokio::test]
    async fn rejecting_a_paid_approved_booking_initiates_a_refund() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(booking(BookingStatus::Approved))));
        mocks
            .payment_repo
            .expect_find_by_booking_id()
            .with(eq(BOOKING_ID))
            .times(1)
            .returning(|_| Ok(Some(payment(PaymentStatus::Paid))));
        mocks
            .refund_repo
            .expect_find_by_payment_id()
            .times(1)
            .returning(|_| Ok(None));
        mocks
            .refund_gateway
            .expect_refund()
            .withf(|order_id, amount, reason| {
                order_id == BOOKING_ID.to_string()
                    && *amount == 1_000_000
                    && reason == "venue double-booked internally"
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(RefundReceipt {
                    refund_id: "ref-1".to_string(),
                })
            });
        mocks
            .refund_repo
            .expect_create()
            .withf(|insert| insert.amount_minor == 1_000_000)
            .times(1)
            .returning(|insert| {
                use crate::domain::entities::refunds::RefundEntity;
                Ok(RefundEntity {
                    id: Uuid::from_bytes([9; 16]),
                    payment_id: insert.payment_id,
                    amount_minor: insert.amount_minor,
                    reason: insert.reason,
                    gateway_refund_id: insert.gateway_refund_id,
                    status: insert.status,
                    created_at: instant("2024-01-10T00:00:00Z"),
                    updated_at: instant("2024-01-10T00:00:00Z"),
                })
            });
        mocks
            .booking_repo
            .expect_transition_status()
            .times(1)
            .returning(|_, _, reason| {
                let mut entity = booking(BookingStatus::Rejected);
                entity.rejected_reason = reason;
                Ok(TransitionOutcome::Applied(entity))
            });
        mocks
            .event_sink
            .expect_publish()
            .withf(|event| matches!(event, DomainEvent::BookingRejected { .. }))
            .times(1)
            .returning(|_| Ok(()));

        let result = mocks
            .build()
            .reject(BOOKING_ID, ACTOR_ID, "venue double-booked internally")
            .await
            .unwrap();
        assert_eq!(result.status, BookingStatus::Rejected);
    }

    #[tokio::test]
    async fn refund_failure_does_not_block_the_rejection() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(booking(BookingStatus::Approved))));
        mocks
            .payment_repo
            .expect_find_by_booking_id()
            .times(1)
            .returning(|_| Ok(Some(payment(PaymentStatus::Paid))));
        mocks
            .refund_repo
            .expect_find_by_payment_id()
            .times(1)
            .returning(|_| Ok(None));
        mocks
            .refund_gateway
            .expect_refund()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("gateway unavailable")));
        mocks
            .booking_repo
            .expect_transition_status()
            .times(1)
            .returning(|_, _, reason| {
                let mut entity = booking(BookingStatus::Rejected);
                entity.rejected_reason = reason;
                Ok(TransitionOutcome::Applied(entity))
            });
        mocks
            .event_sink
            .expect_publish()
            .times(1)
            .returning(|_| Ok(()));

        let result = mocks
            .build()
            .reject(BOOKING_ID, ACTOR_ID, "cancelled by administration")
            .await
            .unwrap();
        assert_eq!(result.status, BookingStatus::Rejected);
    }

    #[tokio::test]
    async fn rejecting_a_terminal_booking_fails() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(booking(BookingStatus::Completed))));

        let err = mocks
            .build()
            .reject(BOOKING_ID, ACTOR_ID, "too late")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::AlreadyDecided { .. }));
    }

    #[tokio::test]
    async fn completion_requires_the_end_to_have_elapsed() {
        let mut mocks = Mocks::new();
        mocks.booking_repo.expect_find_by_id().times(1).returning(|_| {
            let mut entity = booking(BookingStatus::Approved);
            entity.ends_at = Utc::now() + Duration::hours(2);
            Ok(Some(entity))
        });

        let err = mocks.build().complete(BOOKING_ID).await.unwrap_err();
        assert!(matches!(err, BookingError::NotYetElapsed));
    }

    #[tokio::test]
    async fn completes_an_elapsed_approved_booking() {
        let mut mocks = Mocks::new();
        mocks.booking_repo.expect_find_by_id().times(1).returning(|_| {
            let mut entity = booking(BookingStatus::Approved);
            entity.ends_at = Utc::now() - Duration::hours(2);
            Ok(Some(entity))
        });
        mocks
            .booking_repo
            .expect_transition_status()
            .withf(|_, next, reason| *next == BookingStatus::Completed && reason.is_none())
            .times(1)
            .returning(|_, _, _| Ok(TransitionOutcome::Applied(booking(BookingStatus::Completed))));

        let result = mocks.build().complete(BOOKING_ID).await.unwrap();
        assert_eq!(result.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn completion_sweep_reports_the_number_of_completed_bookings() {
        let mut mocks = Mocks::new();
        mocks
            .booking_repo
            .expect_complete_elapsed()
            .times(1)
            .returning(|_| Ok(vec![booking(BookingStatus::Completed)]));

        assert_eq!(mocks.build().complete_elapsed().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn availability_probe_reports_conflicts() {
        let mut mocks = Mocks::new();
        mocks
            .room_repo
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(room())));
        mocks
            .availability_repo
            .expect_find_blocking_in_window()
            .times(1)
            .returning(|_, _, _| Ok(vec![booking(BookingStatus::Approved)]));

        let query = AvailabilityQueryModel {
            room_id: ROOM_ID,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        };

        let availability = mocks.build().get_availability(query).await.unwrap();
        assert!(!availability.available);
        assert_eq!(availability.conflicts.len(), 1);
    }

    #[test]
    fn invoice_numbers_carry_the_rental_date_and_short_id() {
        let entity = booking(BookingStatus::Approved);
        let invoice = invoice_number(&entity);
        assert_eq!(invoice, "INV/20240110/02020202");
    }
}
