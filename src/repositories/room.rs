//! RoomRepository - Repository per la gestione delle stanze
//!
//! Room creation and administration live in another service; this backend
//! only ever reads rooms and their participant lists.

use super::Read;
use crate::entities::Room;
use sqlx::{Error, MySqlPool};

// ROOM REPO
pub struct RoomRepository {
    connection_pool: MySqlPool,
}

impl RoomRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Whether `user_id` currently participates in `room_id`.
    pub async fn is_participant(&self, room_id: &str, user_id: &str) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM room_participants WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count > 0)
    }

    /// Get all participants of a specific room
    pub async fn participants(&self, room_id: &str) -> Result<Vec<String>, Error> {
        let user_ids: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM room_participants WHERE room_id = ?")
                .bind(room_id)
                .fetch_all(&self.connection_pool)
                .await?;

        Ok(user_ids)
    }

    /// Get the ids of every room the user participates in
    pub async fn rooms_of_user(&self, user_id: &str) -> Result<Vec<String>, Error> {
        let room_ids: Vec<String> =
            sqlx::query_scalar("SELECT room_id FROM room_participants WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.connection_pool)
                .await?;

        Ok(room_ids)
    }
}

impl Read<Room, String> for RoomRepository {
    async fn read(&self, id: &String) -> Result<Option<Room>, Error> {
        let room = sqlx::query_as::<_, Room>(
            "SELECT room_id, title, created_at FROM rooms WHERE room_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(room)
    }
}
