use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::rooms::RoomEntity;

#[automock]
#[async_trait]
pub trait RoomRepository {
    async fn find_by_id(&self, room_id: Uuid) -> Result<Option<RoomEntity>>;
}
