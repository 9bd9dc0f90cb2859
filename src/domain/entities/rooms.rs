use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::rooms;

/// A rentable building. Owned by the catalog; the booking core only reads it.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = rooms)]
pub struct RoomEntity {
    pub id: Uuid,
    pub name: String,
    pub rental_price_minor: i64,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}
