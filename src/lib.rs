//! Server library - espone i moduli principali per i test

pub mod broker;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, auth, config};
pub use crate::services::root;

use axum::{Router, middleware, routing::{any, delete, get, post}};
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use crate::core::authentication_middleware;
    use crate::ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/rooms", configure_room_routes(state.clone()))
        .nest("/messages", configure_message_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .with_state(state)
}

/// Configura le routes con scope di stanza (autenticazione + membership middleware)
fn configure_room_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::{authentication_middleware, room_membership_middleware};
    use crate::services::{get_room_messages, mark_messages_read};

    Router::new()
        .route("/{room_id}/messages", get(get_room_messages))
        .route("/{room_id}/messages/read", post(mark_messages_read))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            room_membership_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes sui singoli messaggi (solo autenticazione: la
/// membership va verificata contro la stanza del messaggio, non il path)
fn configure_message_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::delete_message;

    Router::new()
        .route("/{message_id}", delete(delete_message))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
