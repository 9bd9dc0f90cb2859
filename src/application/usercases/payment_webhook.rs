use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    application::usercases::refunds::RefundUseCase,
    domain::{
        repositories::{
            event_sink::EventSink,
            payments::{PaymentRepository, ReconcileOutcome},
            refunds::{RefundConfirmOutcome, RefundRepository},
        },
        value_objects::{
            domain_events::DomainEvent,
            enums::payment_statuses::PaymentStatus,
            gateway_notifications::{GatewayNotification, NotificationKind},
        },
    },
    payments::PaymentGateway,
};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid notification signature")]
    InvalidSignature,
    #[error("unknown transaction")]
    UnknownTransaction,
    #[error("illegal status regression from {current} on {incoming}")]
    IllegalRegression { current: String, incoming: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::UnknownTransaction => StatusCode::NOT_FOUND,
            WebhookError::IllegalRegression { .. } => StatusCode::CONFLICT,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, WebhookError>;

/// Consumes asynchronous gateway notifications and applies them to
/// payment/refund state exactly once. Notifications arrive at-least-once and
/// in any order; every gate below holds under replay.
pub struct PaymentWebhookUseCase<P, F, G, E>
where
    P: PaymentRepository + Send + Sync + 'static,
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    refunds: Arc<RefundUseCase<F, G, E>>,
    gateway: Arc<G>,
    event_sink: Arc<E>,
}

impl<P, F, G, E> PaymentWebhookUseCase<P, F, G, E>
where
    P: PaymentRepository + Send + Sync + 'static,
    F: RefundRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    E: EventSink + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        refunds: Arc<RefundUseCase<F, G, E>>,
        gateway: Arc<G>,
        event_sink: Arc<E>,
    ) -> Self {
        Self {
            payment_repo,
            refunds,
            gateway,
            event_sink,
        }
    }

    pub async fn handle_notification(
        &self,
        notification: GatewayNotification,
    ) -> UseCaseResult<()> {
        info!(
            order_id = %notification.order_id,
            transaction_id = %notification.transaction_id,
            transaction_status = %notification.transaction_status,
            "payment webhook: notification received"
        );

        // Authenticity first: nothing below runs on a bad signature.
        if !self.gateway.verify_signature(&notification) {
            error!(
                order_id = %notification.order_id,
                transaction_id = %notification.transaction_id,
                merchant_id = ?notification.merchant_id,
                payment_type = ?notification.payment_type,
                transaction_time = ?notification.transaction_time,
                "payment webhook: signature verification failed"
            );
            return Err(WebhookError::InvalidSignature);
        }

        match notification.kind() {
            NotificationKind::Unrecognized => {
                warn!(
                    order_id = %notification.order_id,
                    transaction_status = %notification.transaction_status,
                    "payment webhook: unrecognized transaction status ignored"
                );
                Ok(())
            }
            NotificationKind::StillPending => self.handle_still_pending(&notification).await,
            NotificationKind::Refund => self.handle_refund_confirmation(&notification).await,
            NotificationKind::Payment(target) => {
                self.handle_payment_transition(&notification, target).await
            }
        }
    }

    async fn handle_still_pending(&self, notification: &GatewayNotification) -> UseCaseResult<()> {
        let payment = self
            .payment_repo
            .find_by_gateway_transaction_id(&notification.order_id)
            .await
            .map_err(|err| {
                error!(
                    order_id = %notification.order_id,
                    db_error = ?err,
                    "payment webhook: failed to look up payment"
                );
                WebhookError::Internal(err)
            })?;

        match payment {
            Some(payment) => {
                debug!(
                    payment_id = %payment.id,
                    order_id = %notification.order_id,
                    "payment webhook: transaction still pending; nothing to apply"
                );
                Ok(())
            }
            None => {
                warn!(
                    order_id = %notification.order_id,
                    "payment webhook: pending notification for unknown transaction"
                );
                Err(WebhookError::UnknownTransaction)
            }
        }
    }

    async fn handle_refund_confirmation(
        &self,
        notification: &GatewayNotification,
    ) -> UseCaseResult<()> {
        let outcome = self
            .refunds
            .confirm_from_notification(notification)
            .await
            .map_err(|err| {
                error!(
                    order_id = %notification.order_id,
                    error = ?err,
                    "payment webhook: refund confirmation failed"
                );
                WebhookError::Internal(err)
            })?;

        match outcome {
            RefundConfirmOutcome::Applied { .. } => Ok(()),
            RefundConfirmOutcome::Duplicate => {
                info!(
                    order_id = %notification.order_id,
                    "payment webhook: duplicate refund confirmation ignored"
                );
                Ok(())
            }
            RefundConfirmOutcome::PaymentNotFound => {
                warn!(
                    order_id = %notification.order_id,
                    "payment webhook: refund notification for unknown transaction"
                );
                Err(WebhookError::UnknownTransaction)
            }
            RefundConfirmOutcome::NotInitiated => {
                warn!(
                    order_id = %notification.order_id,
                    "payment webhook: refund notification without an initiated refund"
                );
                Err(WebhookError::IllegalRegression {
                    current: "no refund initiated".to_string(),
                    incoming: notification.transaction_status.clone(),
                })
            }
            RefundConfirmOutcome::InvalidState {
                refund_status,
                payment_status,
            } => {
                warn!(
                    order_id = %notification.order_id,
                    refund_status = %refund_status,
                    payment_status = %payment_status,
                    "payment webhook: refund notification in unconfirmable state"
                );
                Err(WebhookError::IllegalRegression {
                    current: format!("payment {payment_status}, refund {refund_status}"),
                    incoming: notification.transaction_status.clone(),
                })
            }
        }
    }

    async fn handle_payment_transition(
        &self,
        notification: &GatewayNotification,
        target: PaymentStatus,
    ) -> UseCaseResult<()> {
        let outcome = self
            .payment_repo
            .apply_gateway_transition(
                &notification.order_id,
                target,
                notification.payment_type.clone(),
            )
            .await
            .map_err(|err| {
                error!(
                    order_id = %notification.order_id,
                    db_error = ?err,
                    "payment webhook: failed to apply gateway transition"
                );
                WebhookError::Internal(err)
            })?;

        match outcome {
            ReconcileOutcome::Applied(payment) => {
                info!(
                    payment_id = %payment.id,
                    booking_id = %payment.booking_id,
                    order_id = %notification.order_id,
                    payment_status = %target,
                    "payment webhook: payment transition applied"
                );
                // Payment state never moves the booking; an admin decision or
                // the completion sweep does that.
                let event = match target {
                    PaymentStatus::Paid => DomainEvent::PaymentSucceeded {
                        payment_id: payment.id,
                        booking_id: payment.booking_id,
                        total_minor: payment.total_minor,
                    },
                    other => DomainEvent::PaymentFailed {
                        payment_id: payment.id,
                        booking_id: payment.booking_id,
                        status: other,
                    },
                };
                self.emit(event).await;
                Ok(())
            }
            ReconcileOutcome::Duplicate(payment) => {
                info!(
                    payment_id = %payment.id,
                    order_id = %notification.order_id,
                    "payment webhook: duplicate delivery ignored"
                );
                Ok(())
            }
            ReconcileOutcome::Regression { current, incoming } => {
                warn!(
                    order_id = %notification.order_id,
                    current = %current,
                    incoming = %incoming,
                    "payment webhook: regressive notification refused"
                );
                Err(WebhookError::IllegalRegression {
                    current,
                    incoming: incoming.to_string(),
                })
            }
            ReconcileOutcome::NotFound => {
                warn!(
                    order_id = %notification.order_id,
                    "payment webhook: notification for unknown transaction"
                );
                Err(WebhookError::UnknownTransaction)
            }
        }
    }

    async fn emit(&self, event: DomainEvent) {
        if let Err(error) = self.event_sink.publish(event).await {
            warn!(
                error = ?error,
                "payment webhook: event sink rejected domain event"
            );
        }
    }
}
