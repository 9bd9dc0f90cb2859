use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

/// The single payment attached to an approved booking.
/// `gateway_transaction_id` is the order id sent to the gateway and doubles
/// as the checkout idempotency key.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub gateway_transaction_id: String,
    pub invoice_number: String,
    pub amount_minor: i64,
    pub gateway_fee_minor: i64,
    pub total_minor: i64,
    pub payment_method: Option<String>,
    pub checkout_url: Option<String>,
    pub checkout_token: Option<String>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub booking_id: Uuid,
    pub gateway_transaction_id: String,
    pub invoice_number: String,
    pub amount_minor: i64,
    pub gateway_fee_minor: i64,
    pub total_minor: i64,
    pub status: String,
}
