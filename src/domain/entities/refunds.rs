use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::refunds;

/// Reversal of a paid payment whose booking was rejected after approval.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = refunds)]
pub struct RefundEntity {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub amount_minor: i64,
    pub reason: String,
    pub gateway_refund_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = refunds)]
pub struct InsertRefundEntity {
    pub payment_id: Uuid,
    pub amount_minor: i64,
    pub reason: String,
    pub gateway_refund_id: Option<String>,
    pub status: String,
}
