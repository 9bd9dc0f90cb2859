use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity, value_objects::enums::payment_statuses::PaymentStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentModel {
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
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentModel {
    fn from(entity: PaymentEntity) -> Self {
        Self {
            id: entity.id,
            booking_id: entity.booking_id,
            gateway_transaction_id: entity.gateway_transaction_id,
            invoice_number: entity.invoice_number,
            amount_minor: entity.amount_minor,
            gateway_fee_minor: entity.gateway_fee_minor,
            total_minor: entity.total_minor,
            payment_method: entity.payment_method,
            checkout_url: entity.checkout_url,
            checkout_token: entity.checkout_token,
            status: PaymentStatus::from_str(&entity.status).unwrap_or_default(),
            paid_at: entity.paid_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
