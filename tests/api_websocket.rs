//! Integration tests per il lato realtime
//!
//! Test per:
//! - Connessione WebSocket rifiutata senza autenticazione
//! - Gestione utenti duplicati (stesso utente che si connette due volte)
//! - Primitive di notifica usate dal deletion engine:
//!   broadcast alla stanza e notifica al singolo utente

mod common;

#[cfg(test)]
mod ws_tests {
    use super::common::*;
    use chat_server::dtos::{MessageDeletedDTO, WsEventDTO};
    use chat_server::entities::DeleteType;
    use chat_server::ws::usermap::{InternalSignal, UserMap};
    use chat_server::ws::{broadcast_to_room, notify_user};
    use tokio::sync::mpsc;

    fn deleted_event(delete_type: DeleteType) -> WsEventDTO {
        WsEventDTO::MessageDeleted(MessageDeletedDTO {
            message_id: "m1".to_string(),
            deleted_by: "user-1".to_string(),
            delete_type,
        })
    }

    // ============================================================
    // Test per GET /ws - upgrade
    // ============================================================

    #[tokio::test]
    async fn test_ws_upgrade_requires_token() {
        let server = create_test_server(create_test_state());

        let response = server.get("/ws").await;

        response.assert_status_forbidden();
    }

    // ============================================================
    // Test unitari per UserMap - connessioni duplicate
    // ============================================================

    /// Quando lo stesso utente si connette due volte la seconda connessione
    /// sovrascrive la prima: i segnali vanno solo al canale nuovo.
    #[tokio::test]
    async fn test_usermap_duplicate_connection_overwrites() {
        let user_map = UserMap::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        user_map.register_online("user-1", tx1);

        assert!(user_map.is_user_online("user-1"));
        assert_eq!(user_map.online_count(), 1);

        // seconda connessione dello stesso utente (altro device o refresh)
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        user_map.register_online("user-1", tx2);

        assert!(user_map.is_user_online("user-1"));
        assert_eq!(user_map.online_count(), 1);

        user_map.send_server_message_if_online("user-1", InternalSignal::Shutdown);

        assert!(rx1.try_recv().is_err(), "old channel must not receive");
        assert!(
            matches!(rx2.try_recv(), Ok(InternalSignal::Shutdown)),
            "new channel must receive the signal"
        );
    }

    // ============================================================
    // Test per le primitive di notifica del deletion engine
    // ============================================================

    /// La notifica di local delete raggiunge solo la connessione del
    /// richiedente, mai gli altri utenti online.
    #[tokio::test]
    async fn test_notify_user_reaches_only_target() {
        let state = create_test_state();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        state.users_online.register_online("user-1", tx1);
        state.users_online.register_online("user-2", tx2);

        notify_user(&state, "user-1", deleted_event(DeleteType::Local));

        match rx1.try_recv() {
            Ok(InternalSignal::Event(event)) => match event.as_ref() {
                WsEventDTO::MessageDeleted(data) => {
                    assert_eq!(data.message_id, "m1");
                    assert_eq!(data.delete_type, DeleteType::Local);
                }
                other => panic!("Unexpected event: {:?}", other),
            },
            other => panic!("Expected Event signal, got {:?}", other.is_ok()),
        }

        assert!(rx2.try_recv().is_err(), "other users must not be notified");
    }

    /// Notificare un utente offline non è un errore.
    #[tokio::test]
    async fn test_notify_offline_user_is_noop() {
        let state = create_test_state();
        notify_user(&state, "ghost", deleted_event(DeleteType::Local));
    }

    /// Il global delete viene broadcast a ogni subscriber della stanza.
    #[tokio::test]
    async fn test_global_delete_broadcast_reaches_room_subscribers() {
        let state = create_test_state();

        let mut rx_a = state.rooms_online.subscribe("room-1");
        let mut rx_b = state.rooms_online.subscribe("room-1");
        let mut rx_other = state.rooms_online.subscribe("room-2");

        let reached = broadcast_to_room(&state, "room-1", deleted_event(DeleteType::Global));
        assert_eq!(reached, 2);

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await.unwrap().as_ref() {
                WsEventDTO::MessageDeleted(data) => {
                    assert_eq!(data.delete_type, DeleteType::Global);
                    assert_eq!(data.deleted_by, "user-1");
                }
                other => panic!("Unexpected event: {:?}", other),
            }
        }

        assert!(rx_other.try_recv().is_err(), "other rooms must not receive");
    }

    /// Broadcast su una stanza senza ascoltatori: zero consegne, nessun errore.
    #[tokio::test]
    async fn test_broadcast_without_listeners_is_noop() {
        let state = create_test_state();

        let reached = broadcast_to_room(&state, "empty-room", deleted_event(DeleteType::Global));

        assert_eq!(reached, 0);
    }
}
