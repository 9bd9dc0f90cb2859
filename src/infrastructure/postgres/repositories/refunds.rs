use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::query_dsl::methods::LockingDsl;
use diesel::{insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            payments::PaymentEntity,
            refunds::{InsertRefundEntity, RefundEntity},
        },
        repositories::refunds::{RefundConfirmOutcome, RefundRepository},
        value_objects::enums::{
            payment_statuses::PaymentStatus, refund_statuses::RefundStatus,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{payments, refunds},
    },
};

pub struct RefundPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl RefundPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RefundRepository for RefundPostgres {
    async fn create(&self, insert_refund_entity: InsertRefundEntity) -> Result<RefundEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let refund = insert_into(refunds::table)
            .values(&insert_refund_entity)
            .returning(RefundEntity::as_returning())
            .get_result::<RefundEntity>(&mut conn)?;

        Ok(refund)
    }

    async fn find_by_payment_id(&self, payment_id: Uuid) -> Result<Option<RefundEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let refund = refunds::table
            .filter(refunds::payment_id.eq(payment_id))
            .select(RefundEntity::as_select())
            .first::<RefundEntity>(&mut conn)
            .optional()?;

        Ok(refund)
    }

    async fn confirm_by_gateway_transaction_id(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<RefundConfirmOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<RefundConfirmOutcome, anyhow::Error, _>(|conn| {
            let payment = payments::table
                .filter(payments::gateway_transaction_id.eq(gateway_transaction_id))
                .for_update()
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(conn)
                .optional()?;
            let Some(payment) = payment else {
                return Ok(RefundConfirmOutcome::PaymentNotFound);
            };

            let refund = refunds::table
                .filter(refunds::payment_id.eq(payment.id))
                .for_update()
                .select(RefundEntity::as_select())
                .first::<RefundEntity>(conn)
                .optional()?;
            let Some(refund) = refund else {
                return Ok(RefundConfirmOutcome::NotInitiated);
            };

            match (
                RefundStatus::from_str(&refund.status),
                PaymentStatus::from_str(&payment.status),
            ) {
                (Some(RefundStatus::Completed), Some(PaymentStatus::Refunded)) => {
                    Ok(RefundConfirmOutcome::Duplicate)
                }
                (Some(RefundStatus::Processed), Some(PaymentStatus::Paid)) => {
                    let confirmed_refund = update(refunds::table.find(refund.id))
                        .set((
                            refunds::status.eq(RefundStatus::Completed.to_string()),
                            refunds::updated_at.eq(Utc::now()),
                        ))
                        .returning(RefundEntity::as_returning())
                        .get_result::<RefundEntity>(conn)?;

                    let refunded_payment = update(payments::table.find(payment.id))
                        .set((
                            payments::status.eq(PaymentStatus::Refunded.to_string()),
                            payments::updated_at.eq(Utc::now()),
                        ))
                        .returning(PaymentEntity::as_returning())
                        .get_result::<PaymentEntity>(conn)?;

                    Ok(RefundConfirmOutcome::Applied {
                        refund: confirmed_refund,
                        payment: refunded_payment,
                    })
                }
                _ => Ok(RefundConfirmOutcome::InvalidState {
                    refund_status: refund.status,
                    payment_status: payment.status,
                }),
            }
        })?;

        Ok(outcome)
    }
}
