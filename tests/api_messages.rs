//! Integration tests per gli endpoints dei messaggi
//!
//! Questi test esercitano il router completo senza database: coprono i
//! percorsi di rifiuto dei middleware e gli endpoint pubblici. I percorsi
//! che toccano lo store sono coperti dai test unitari dei singoli moduli.

mod common;

#[cfg(test)]
mod message_tests {
    use super::common::*;
    use axum_test::http::HeaderName;
    use serde_json::json;

    // ============================================================
    // Test per GET / - health check
    // ============================================================

    #[tokio::test]
    async fn test_root_is_public() {
        let server = create_test_server(create_test_state());

        let response = server.get("/").await;

        response.assert_status_ok();
    }

    // ============================================================
    // Test per GET /rooms/{room_id}/messages - get_room_messages
    // ============================================================

    #[tokio::test]
    async fn test_get_messages_without_token() {
        let server = create_test_server(create_test_state());

        let response = server.get("/rooms/room-1/messages").await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_get_messages_with_invalid_token() {
        let server = create_test_server(create_test_state());

        let response = server
            .get("/rooms/room-1/messages")
            .add_header(
                HeaderName::from_static("authorization"),
                "Bearer not.a.real.token",
            )
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_get_messages_with_wrong_secret_token() {
        let server = create_test_server(create_test_state());
        let token = create_test_jwt("user-1", "alice", "unaltrosegreto");

        let response = server
            .get("/rooms/room-1/messages")
            .add_header(
                HeaderName::from_static("authorization"),
                format!("Bearer {}", token),
            )
            .await;

        response.assert_status_unauthorized();
    }

    // ============================================================
    // Test per POST /rooms/{room_id}/messages/read - mark_messages_read
    // ============================================================

    #[tokio::test]
    async fn test_read_ack_without_token() {
        let server = create_test_server(create_test_state());

        let response = server
            .post("/rooms/room-1/messages/read")
            .json(&json!({ "message_ids": ["m1"] }))
            .await;

        response.assert_status_forbidden();
    }

    // ============================================================
    // Test per DELETE /messages/{message_id} - delete_message
    // ============================================================

    #[tokio::test]
    async fn test_delete_message_without_token() {
        let server = create_test_server(create_test_state());

        let response = server.delete("/messages/m1").await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_delete_message_with_malformed_header() {
        let server = create_test_server(create_test_state());

        let response = server
            .delete("/messages/m1")
            .add_header(HeaderName::from_static("authorization"), "Bearer")
            .await;

        response.assert_status_forbidden();
    }
}
