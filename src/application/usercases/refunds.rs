use std::sync::Arc;

use anyhow::Result as AnyResult;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    domain::{
        entities::refunds::InsertRefundEntity,
        repositories::{
            event_sink::EventSink,
            refunds::{RefundConfirmOutcome, RefundRepository},
        },
        value_objects::{
            domain_events::DomainEvent,
            enums::{
                booking_statuses::BookingStatus, payment_statuses::PaymentStatus,
                refund_statuses::RefundStatus,
            },
            gateway_notifications::GatewayNotification,
            payments::PaymentModel,
            refunds::RefundModel,
        },
    },
    payments::PaymentGateway,
};

#[derive(Debug, Error)]
pub enum RefundError {
    #[error("payment is not in a refundable state: {current}")]
    PaymentNotPaid { current: String },
    #[error("booking must be rejected before its payment can be refunded: {current}")]
    BookingNotRejected { current: String },
    #[error("a refund has already been initiated for this payment")]
    AlreadyInitiated,
    #[error("refund was not accepted by the payment gateway")]
    Initiation(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RefundError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            RefundError::PaymentNotPaid { .. }
            | RefundError::BookingNotRejected { .. }
            | RefundError::AlreadyInitiated => StatusCode::CONFLICT,
            RefundError::Initiation(_) => StatusCode::BAD_GATEWAY,
            RefundError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, RefundError>;

/// Issues refunds for paid bookings that were rejected after approval, and
/// settles them when the gateway's confirmation notification arrives.
pub struct RefundUseCase<F, G, E>
where
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    refund_repo: Arc<F>,
    gateway: Arc<G>,
    event_sink: Arc<E>,
}

impl<F, G, E> RefundUseCase<F, G, E>
where
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    pub fn new(refund_repo: Arc<F>, gateway: Arc<G>, event_sink: Arc<E>) -> Self {
        Self {
            refund_repo,
            gateway,
            event_sink,
        }
    }

    /// Requests a full refund of `payment` from the gateway and records it
    /// as `processed`. `booking_status` is the status the owning booking
    /// holds (or is being given) in the same logical operation.
    pub async fn initiate(
        &self,
        payment: &PaymentModel,
        booking_status: BookingStatus,
        reason: &str,
    ) -> UseCaseResult<RefundModel> {
        info!(
            payment_id = %payment.id,
            booking_id = %payment.booking_id,
            "refunds: initiation requested"
        );

        if payment.status != PaymentStatus::Paid {
            let err = RefundError::PaymentNotPaid {
                current: payment.status.to_string(),
            };
            warn!(
                payment_id = %payment.id,
                status = err.status_code().as_u16(),
                payment_status = %payment.status,
                "refunds: refused to refund unpaid payment"
            );
            return Err(err);
        }

        if booking_status != BookingStatus::Rejected {
            let err = RefundError::BookingNotRejected {
                current: booking_status.to_string(),
            };
            warn!(
                payment_id = %payment.id,
                status = err.status_code().as_u16(),
                booking_status = %booking_status,
                "refunds: refused to refund a booking that is not rejected"
            );
            return Err(err);
        }

        let existing = self
            .refund_repo
            .find_by_payment_id(payment.id)
            .await
            .map_err(|err| {
                error!(
                    payment_id = %payment.id,
                    db_error = ?err,
                    "refunds: failed to look up existing refund"
                );
                RefundError::Internal(err)
            })?;
        if existing.is_some() {
            let err = RefundError::AlreadyInitiated;
            warn!(
                payment_id = %payment.id,
                status = err.status_code().as_u16(),
                "refunds: refund already initiated"
            );
            return Err(err);
        }

        // Full refund unless a partial-refund policy is ever configured.
        let amount_minor = payment.total_minor;

        let receipt = self
            .gateway
            .refund(&payment.gateway_transaction_id, amount_minor, reason)
            .await
            .map_err(|err| {
                error!(
                    payment_id = %payment.id,
                    gateway_transaction_id = %payment.gateway_transaction_id,
                    amount_minor,
                    error = ?err,
                    "refunds: gateway refund call failed"
                );
                RefundError::Initiation(err)
            })?;

        let refund = self
            .refund_repo
            .create(InsertRefundEntity {
                payment_id: payment.id,
                amount_minor,
                reason: reason.to_string(),
                gateway_refund_id: Some(receipt.refund_id.clone()),
                status: RefundStatus::Processed.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    payment_id = %payment.id,
                    gateway_refund_id = %receipt.refund_id,
                    db_error = ?err,
                    "refunds: failed to record processed refund"
                );
                RefundError::Internal(err)
            })?;

        info!(
            refund_id = %refund.id,
            payment_id = %payment.id,
            gateway_refund_id = %receipt.refund_id,
            amount_minor,
            "refunds: refund initiated"
        );

        Ok(RefundModel::from(refund))
    }

    /// Settles a refund from the gateway's confirmation notification:
    /// refund `processed -> completed`, payment `paid -> refunded`, one
    /// `RefundCompleted` event per effective confirmation.
    pub async fn confirm_from_notification(
        &self,
        notification: &GatewayNotification,
    ) -> AnyResult<RefundConfirmOutcome> {
        let outcome = self
            .refund_repo
            .confirm_by_gateway_transaction_id(&notification.order_id)
            .await?;

        if let RefundConfirmOutcome::Applied { refund, payment } = &outcome {
            info!(
                refund_id = %refund.id,
                payment_id = %payment.id,
                order_id = %notification.order_id,
                "refunds: refund confirmed by gateway"
            );
            let event = DomainEvent::RefundCompleted {
                refund_id: refund.id,
                payment_id: payment.id,
                amount_minor: refund.amount_minor,
            };
            if let Err(error) = self.event_sink.publish(event).await {
                warn!(
                    refund_id = %refund.id,
                    error = ?error,
                    "refunds: event sink rejected domain event"
                );
            }
        }

        Ok(outcome)
    }
}
