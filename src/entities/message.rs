//! Message entity - Entità messaggio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: String,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    // riferimento opzionale al file storage esterno, mai risolto qui
    pub file_id: Option<String>,
    // il server si aspetta una stringa litterale iso8601 che viene parsata in oggetto DateTime di tipo UTC
    // la conversione viene fatta in automatico da serde, la feature è stata abilitata
    pub created_at: DateTime<Utc>,
}

/// One row of the `readers` set: the user has read the message at `read_at`.
/// At most one row exists per (message, user) pair.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct MessageReader {
    pub message_id: String,
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}
