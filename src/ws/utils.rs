//! WebSocket Utilities - Primitive realtime usate dal resto del server
//!
//! Due sole primitive, entrambe fire-and-forget: broadcast a una stanza e
//! notifica alla connessione di un singolo utente. Un fallimento qui non
//! risale mai al chiamante.

use crate::AppState;
use crate::dtos::WsEventDTO;
use crate::ws::usermap::InternalSignal;
use std::sync::Arc;
use tracing::debug;

/// Invia un evento a tutti i membri online di una stanza.
/// Ritorna quanti receiver l'hanno ricevuto (0 se nessuno è in ascolto).
pub fn broadcast_to_room(state: &AppState, room_id: &str, event: WsEventDTO) -> usize {
    match state.rooms_online.send(room_id, Arc::new(event)) {
        Ok(n) => n,
        Err(_) => {
            // stanza senza ascoltatori: nessuno da avvisare, non è un errore
            debug!(room_id, "No online receivers for room event");
            0
        }
    }
}

/// Invia un evento alla sola connessione attiva dell'utente, se esiste.
pub fn notify_user(state: &AppState, user_id: &str, event: WsEventDTO) {
    state
        .users_online
        .send_server_message_if_online(user_id, InternalSignal::Event(Arc::new(event)));
}
