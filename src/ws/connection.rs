//! WebSocket Connection Management - Gestione connessioni WebSocket

use crate::ws::TIMEOUT_DURATION_SECONDS;
use crate::{
    AppState,
    dtos::WsEventDTO,
    ws::usermap::InternalSignal,
};
use axum::extract::ws::Utf8Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::Duration;
use tokio::time::timeout;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, instrument, warn};

#[instrument(skip(ws, state), fields(user_id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user_id: String) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Canale unbounded per la comunicazione interna verso questo socket
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    // Salviamo nello stato il trasmettitore associato all'utente
    state.users_online.register_online(&user_id, int_tx.clone());
    info!("User registered as online");

    // task in ascolto del websocket lato client
    tokio::spawn(listen_ws(user_id.clone(), ws_rx, int_tx.clone(), state.clone()));

    // task in ascolto sull'insieme dei canali broadcast delle stanze
    tokio::spawn(write_ws(user_id, ws_tx, int_rx, state));
}

#[instrument(skip(websocket_tx, internal_rx, state), fields(user_id))]
pub async fn write_ws(
    user_id: String,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Write task started");

    let room_vec: Vec<String> = match state.room.rooms_of_user(&user_id).await {
        Ok(rooms) => {
            info!(room_count = rooms.len(), "User rooms loaded");
            rooms
        }
        Err(e) => {
            error!("Failed to load user rooms: {:?}", e);
            return; // Termina se DB fallisce
        }
    };

    let mut stream_map = StreamMap::new();

    state
        .rooms_online
        .subscribe_multiple(room_vec.clone())
        .into_iter()
        .zip(room_vec.into_iter())
        .for_each(|(rx, room_id)| {
            stream_map.insert(room_id, BroadcastStream::new(rx));
        });

    'external: loop {
        tokio::select! {
            Some((_, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                if let Ok(event) = result {
                    if send_event(&mut websocket_tx, &event).await.is_err() {
                        warn!("Failed to send event, closing connection");
                        break 'external;
                    }
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    Some(InternalSignal::AddRoom(room_id)) => {
                        info!(%room_id, "Adding room subscription");
                        let rx = state.rooms_online.subscribe(&room_id);
                        stream_map.insert(room_id, BroadcastStream::new(rx));
                    }
                    Some(InternalSignal::RemoveRoom(room_id)) => {
                        info!(%room_id, "Removing room subscription");
                        stream_map.remove(&room_id);
                    }
                    Some(InternalSignal::Error(err_msg)) => {
                        warn!(error_message = err_msg, "Sending error message to client");
                        if let Err(e) = websocket_tx.send(Message::Text(Utf8Bytes::from(err_msg))).await {
                            error!("Failed to send error message: {:?}", e);
                            break 'external;
                        }
                    }
                    Some(InternalSignal::Event(event)) => {
                        // evento diretto solo a questa connessione
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            warn!("Failed to send direct event, closing connection");
                            break 'external;
                        }
                    }
                    None => {
                        info!("Internal channel closed");
                        break 'external; // canale chiuso, quindi listener ws chiuso, quindi stacca tutto
                    }
                }
            }
        }
    }

    info!("Write task terminated");
}

#[instrument(skip(websocket_tx, event))]
async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &Arc<WsEventDTO>,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event.as_ref()).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send event through WebSocket: {:?}", e);
            e
        })
}

#[instrument(skip(websocket_rx, internal_tx, state), fields(user_id))]
pub async fn listen_ws(
    user_id: String,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Listen task started");

    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, StreamExt::next(&mut websocket_rx)).await {
            Ok(Some(msg_result)) => {
                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("WebSocket error: {:?}", e);
                        break;
                    }
                };

                match msg {
                    Message::Text(_) => {
                        // l'invio dei messaggi passa dal servizio di
                        // messaggistica, non da questo socket
                        warn!("Unexpected client frame, ignoring");
                    }
                    Message::Close(_) => {
                        info!("Close message received");
                        break;
                    }
                    _ => {}
                }
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(
                    timeout_secs = TIMEOUT_DURATION_SECONDS,
                    "Connection timeout"
                );
                break;
            }
        }
    }

    // Cleanup
    info!("Cleaning up connection");
    let _ = internal_tx.send(InternalSignal::Shutdown);
    state.users_online.remove_from_online(&user_id);
    info!("Listen task terminated");
}
