//! Read-status DTOs - payload della coda e body dell'endpoint di read-ack

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Wire payload of the durable queue. Field names are part of the external
/// contract shared with the consumer, so they stay camelCase regardless of
/// the rest of the API.
///
/// `message_ids` may contain duplicates; the consumer applies entries with
/// an add-if-absent write, so duplicates and re-deliveries are harmless.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatusEvent {
    #[validate(length(min = 1, message = "roomId must not be empty"))]
    pub room_id: String,

    #[validate(length(min = 1, message = "userId must not be empty"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "messageIds must not be empty"))]
    pub message_ids: Vec<String>,

    pub read_at: DateTime<Utc>,
}

/// Body di POST /rooms/{room_id}/messages/read
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct ReadAckRequestDTO {
    #[validate(length(min = 1, message = "message_ids must not be empty"))]
    pub message_ids: Vec<String>,

    /// Timestamp osservato dal client; se assente vale "adesso".
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_camel_case() {
        let event = ReadStatusEvent {
            room_id: "r1".to_string(),
            user_id: "u1".to_string(),
            message_ids: vec!["m1".to_string(), "m2".to_string()],
            read_at: "2025-03-01T10:00:00Z".parse().unwrap(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["roomId"], "r1");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["messageIds"].as_array().unwrap().len(), 2);
        assert!(json["readAt"].as_str().unwrap().starts_with("2025-03-01T10:00:00"));
    }

    #[test]
    fn test_event_rejects_empty_message_ids() {
        let event = ReadStatusEvent {
            room_id: "r1".to_string(),
            user_id: "u1".to_string(),
            message_ids: vec![],
            read_at: Utc::now(),
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_event_rejects_empty_user_id() {
        let event = ReadStatusEvent {
            room_id: "r1".to_string(),
            user_id: "".to_string(),
            message_ids: vec!["m1".to_string()],
            read_at: Utc::now(),
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_event_roundtrip_from_wire_json() {
        let raw = r#"{
            "roomId": "room-7",
            "userId": "user-3",
            "messageIds": ["a", "b", "a"],
            "readAt": "2025-03-01T10:00:00Z"
        }"#;

        let event: ReadStatusEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.room_id, "room-7");
        assert_eq!(event.message_ids, vec!["a", "b", "a"]);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_missing_user_id_is_a_parse_error() {
        let raw = r#"{"roomId": "r", "messageIds": ["a"], "readAt": "2025-03-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<ReadStatusEvent>(raw).is_err());
    }
}
