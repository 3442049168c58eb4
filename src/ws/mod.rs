//! WebSocket Module - Gestione WebSocket per comunicazione real-time
//!
//! Questo modulo gestisce le connessioni WebSocket per la comunicazione in tempo reale
//! tra client e server. Include:
//! - Gestione upgrade HTTP -> WebSocket
//! - Gestione connessioni (split sender/receiver)
//! - Mappe degli utenti online e dei canali broadcast per stanza
//! - Primitive di notifica usate dal deletion engine

pub mod connection;
pub mod roommap;
pub mod usermap;
pub mod utils;

// Re-exports pubblici
pub use connection::handle_socket;
pub use utils::{broadcast_to_room, notify_user};

use crate::{AppState, core::AuthenticatedUser};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Capienza dei canali broadcast per stanza
pub const BROADCAST_CHANNEL_CAPACITY: usize = 128;
/// Chiusura della connessione dopo questo periodo di silenzio del client
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Estrarre l'identità dall'autenticazione JWT
/// 2. Eseguire upgrade HTTP -> WebSocket
/// 3. Passare la connessione ad handle_socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthenticatedUser>, // ottenuto dall'autenticazione JWT
) -> Response {
    let user_id = current_user.user_id;

    // Gestisce automaticamente l'upgrade a WebSocket.
    // Se l'upgrade fallisce, ritorna un errore; altrimenti restituisce la nuova connessione al client.
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}
