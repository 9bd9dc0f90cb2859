use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::refunds::RefundEntity, value_objects::enums::refund_statuses::RefundStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundModel {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub amount_minor: i64,
    pub reason: String,
    pub gateway_refund_id: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RefundEntity> for RefundModel {
    fn from(entity: RefundEntity) -> Self {
        Self {
            id: entity.id,
            payment_id: entity.payment_id,
            amount_minor: entity.amount_minor,
            reason: entity.reason,
            gateway_refund_id: entity.gateway_refund_id,
            status: RefundStatus::from_str(&entity.status).unwrap_or_default(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
