use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{entities::rooms::RoomEntity, repositories::rooms::RoomRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::rooms},
};

pub struct RoomPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl RoomPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RoomRepository for RoomPostgres {
    async fn find_by_id(&self, room_id: Uuid) -> Result<Option<RoomEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let room = rooms::table
            .find(room_id)
            .select(RoomEntity::as_select())
            .first::<RoomEntity>(&mut conn)
            .optional()?;

        Ok(room)
    }
}
