//! WebSocket Event DTOs - Data Transfer Objects per eventi WebSocket

use crate::entities::DeleteType;
use serde::{Deserialize, Serialize};

use crate::dtos::MessageDTO;

/// Notifica di cancellazione messaggio. I nomi dei campi sono contratto
/// esterno verso i client realtime, quindi camelCase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedDTO {
    pub message_id: String,
    pub deleted_by: String,
    pub delete_type: DeleteType,
}

/// Enum per gestire gli eventi WebSocket in modo type-safe
/// Tagged union per eventi WebSocket
/// Serde serializza questo come:
/// { "type": "MessageDeleted", "data": { ... } }
/// oppure
/// { "type": "Message", "data": { ... } }
/// etc.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "data")]
pub enum WsEventDTO {
    Message(MessageDTO),
    MessageDeleted(MessageDeletedDTO),
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_delete_event_shape() {
        let event = WsEventDTO::MessageDeleted(MessageDeletedDTO {
            message_id: "m1".to_string(),
            deleted_by: "u1".to_string(),
            delete_type: DeleteType::Global,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MessageDeleted");
        assert_eq!(json["data"]["messageId"], "m1");
        assert_eq!(json["data"]["deletedBy"], "u1");
        assert_eq!(json["data"]["deleteType"], "global");
    }

    #[test]
    fn test_local_delete_type_serializes_lowercase() {
        let json = serde_json::to_value(DeleteType::Local).unwrap();
        assert_eq!(json, "local");
    }
}
