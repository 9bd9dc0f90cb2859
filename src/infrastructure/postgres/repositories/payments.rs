use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::query_dsl::methods::LockingDsl;
use diesel::{insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity},
        repositories::payments::{PaymentRepository, ReconcileOutcome},
        value_objects::enums::payment_statuses::{PaymentStatus, ReconcileDecision},
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create(&self, insert_payment_entity: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = insert_into(payments::table)
            .values(&insert_payment_entity)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)?;

        Ok(payment)
    }

    async fn find_by_booking_id(&self, booking_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .filter(payments::booking_id.eq(booking_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn find_by_gateway_transaction_id(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .filter(payments::gateway_transaction_id.eq(gateway_transaction_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn set_checkout_session(
        &self,
        payment_id: Uuid,
        checkout_url: String,
        checkout_token: String,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payments::table.find(payment_id))
            .set((
                payments::checkout_url.eq(Some(checkout_url)),
                payments::checkout_token.eq(Some(checkout_token)),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn apply_gateway_transition(
        &self,
        gateway_transaction_id: &str,
        incoming: PaymentStatus,
        payment_method: Option<String>,
    ) -> Result<ReconcileOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The row lock is what serializes notifications for one transaction
        // id; notifications for other ids proceed in parallel.
        let outcome = conn.transaction::<ReconcileOutcome, anyhow::Error, _>(|conn| {
            let payment = payments::table
                .filter(payments::gateway_transaction_id.eq(gateway_transaction_id))
                .for_update()
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(conn)
                .optional()?;
            let Some(payment) = payment else {
                return Ok(ReconcileOutcome::NotFound);
            };

            let current = PaymentStatus::from_str(&payment.status).ok_or_else(|| {
                anyhow::anyhow!(
                    "payment {} carries unknown status {}",
                    payment.id,
                    payment.status
                )
            })?;

            match current.reconcile(incoming) {
                ReconcileDecision::DuplicateNoop => Ok(ReconcileOutcome::Duplicate(payment)),
                ReconcileDecision::Regression => Ok(ReconcileOutcome::Regression {
                    current: payment.status,
                    incoming,
                }),
                ReconcileDecision::Apply => {
                    let method = payment_method.or_else(|| payment.payment_method.clone());
                    let updated = if incoming == PaymentStatus::Paid {
                        update(payments::table.find(payment.id))
                            .set((
                                payments::status.eq(incoming.to_string()),
                                payments::payment_method.eq(method),
                                payments::paid_at.eq(Some(Utc::now())),
                                payments::updated_at.eq(Utc::now()),
                            ))
                            .returning(PaymentEntity::as_returning())
                            .get_result::<PaymentEntity>(conn)?
                    } else {
                        update(payments::table.find(payment.id))
                            .set((
                                payments::status.eq(incoming.to_string()),
                                payments::payment_method.eq(method),
                                payments::updated_at.eq(Utc::now()),
                            ))
                            .returning(PaymentEntity::as_returning())
                            .get_result::<PaymentEntity>(conn)?
                    };
                    Ok(ReconcileOutcome::Applied(updated))
                }
            }
        })?;

        Ok(outcome)
    }
}
