//! Room entity - Entità stanza

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Room {
    pub room_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}
