use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

use crate::dtos::WsEventDTO;

pub enum InternalSignal {
    Shutdown,
    AddRoom(String),
    RemoveRoom(String),
    Error(&'static str),
    /// Evento diretto alla sola connessione di questo utente
    Event(Arc<WsEventDTO>),
}

pub struct UserMap {
    users_online: DashMap<String, UnboundedSender<InternalSignal>>,
}

impl UserMap {
    pub fn new() -> Self {
        UserMap {
            users_online: DashMap::new(),
        }
    }

    #[instrument(skip(self, tx), fields(user_id))]
    pub fn register_online(&self, user_id: &str, tx: UnboundedSender<InternalSignal>) {
        info!("Registering user {} as online", user_id);
        self.users_online.insert(user_id.to_string(), tx);
        info!("Total online users: {}", self.users_online.len());
    }

    #[instrument(skip(self), fields(user_id))]
    pub fn remove_from_online(&self, user_id: &str) {
        info!("Removing user from online");
        self.users_online.remove(user_id);
    }

    #[instrument(skip(self, message), fields(user_id))]
    pub fn send_server_message_if_online(&self, user_id: &str, message: InternalSignal) {
        let message_type = match &message {
            InternalSignal::Shutdown => "Shutdown",
            InternalSignal::AddRoom(room_id) => {
                info!("Sending AddRoom signal for room_id {}", room_id);
                "AddRoom"
            }
            InternalSignal::RemoveRoom(room_id) => {
                info!("Sending RemoveRoom signal for room_id {}", room_id);
                "RemoveRoom"
            }
            InternalSignal::Error(_) => "Error",
            InternalSignal::Event(_) => "Event",
        };

        if let Some(entry) = self.users_online.get(user_id) {
            let tx = entry.value();
            if tx.send(message).is_err() {
                warn!("Failed to send {} message to user", message_type);
            } else {
                info!("{} message sent to online user", message_type);
            }
        } else {
            info!("User {} not online, {} message not sent", user_id, message_type);
        }
    }

    /// Get the count of online users
    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    /// Check if a specific user is online
    pub fn is_user_online(&self, user_id: &str) -> bool {
        self.users_online.contains_key(user_id)
    }
}
