//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::{Message, MessageReader};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageDTO {
    pub message_id: String,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub file_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Chi ha letto il messaggio e quando. Al più una entry per utente.
    #[serde(default)]
    pub readers: Vec<ReaderEntryDTO>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReaderEntryDTO {
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}

impl From<MessageReader> for ReaderEntryDTO {
    fn from(value: MessageReader) -> Self {
        Self {
            user_id: value.user_id,
            read_at: value.read_at,
        }
    }
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            message_id: value.message_id,
            room_id: value.room_id,
            sender_id: value.sender_id,
            content: value.content,
            file_id: value.file_id,
            created_at: value.created_at,
            readers: Vec::new(),
        }
    }
}

/// Pagina di messaggi di una stanza, dal più vecchio al più recente
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessagesPageDTO {
    pub messages: Vec<MessageDTO>,
    pub has_more: bool,
    pub oldest_timestamp: Option<DateTime<Utc>>,
}

/// Risposta alla richiesta di cancellazione di un messaggio
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteResultDTO {
    pub message_id: String,
    pub delete_type: crate::entities::DeleteType,
}
