use crate::dtos::WsEventDTO;
use crate::ws::BROADCAST_CHANNEL_CAPACITY;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::SendError;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{info, instrument, warn};

pub struct RoomMap {
    /// Attribute to retrieve the tx head of a broadcast channel by room_id field
    channels: DashMap<String, Sender<Arc<WsEventDTO>>>,
}

impl RoomMap {
    pub fn new() -> Self {
        RoomMap {
            channels: DashMap::new(),
        }
    }

    #[instrument(skip(self), fields(room_id))]
    pub fn subscribe(&self, room_id: &str) -> Receiver<Arc<WsEventDTO>> {
        match self.channels.get(room_id) {
            // required subscription on non existing room channel
            None => {
                info!("Creating new broadcast channel for room");
                // Arc<event> to share the ref, not the event. Avoid unuseful copies on each rx.
                let (tx, rx) = broadcast::channel::<Arc<WsEventDTO>>(BROADCAST_CHANNEL_CAPACITY);
                self.channels.insert(room_id.to_string(), tx);
                rx
            }
            // subscribe to an existing channel == get a rx head == subscribe to a tx
            Some(c) => {
                info!("Subscribing to existing broadcast channel");
                c.value().subscribe()
            }
        }
    }

    #[instrument(skip(self, room_ids))]
    pub fn subscribe_multiple(&self, room_ids: Vec<String>) -> Vec<Receiver<Arc<WsEventDTO>>> {
        info!(count = room_ids.len(), "Subscribing to multiple rooms");
        room_ids.into_iter().map(|id| self.subscribe(&id)).collect()
    }

    #[instrument(skip(self, event), fields(room_id))]
    pub fn send(
        &self,
        room_id: &str,
        event: Arc<WsEventDTO>,
    ) -> Result<usize, SendError<Arc<WsEventDTO>>> {
        if let Some(room) = self.channels.get(room_id) {
            match room.send(event.clone()) {
                Ok(n) => {
                    info!(receivers = n, "Event broadcast to receivers");
                    Ok(n)
                }
                Err(e) => {
                    warn!("No active receivers, removing channel");
                    // Nessuno sta ascoltando, rimuovi il channel
                    drop(room); // Rilascia il lock
                    self.channels.remove(room_id);
                    Err(e)
                }
            }
        } else {
            warn!("Attempted to send to non-existent room channel");
            Err(SendError(event))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::MessageDeletedDTO;
    use crate::entities::DeleteType;

    fn deleted_event() -> Arc<WsEventDTO> {
        Arc::new(WsEventDTO::MessageDeleted(MessageDeletedDTO {
            message_id: "m1".to_string(),
            deleted_by: "u1".to_string(),
            delete_type: DeleteType::Global,
        }))
    }

    #[tokio::test]
    async fn test_send_reaches_every_subscriber() {
        let map = RoomMap::new();
        let mut rx1 = map.subscribe("room-1");
        let mut rx2 = map.subscribe("room-1");

        let n = map.send("room-1", deleted_event()).unwrap();
        assert_eq!(n, 2);

        assert!(matches!(*rx1.recv().await.unwrap(), WsEventDTO::MessageDeleted(_)));
        assert!(matches!(*rx2.recv().await.unwrap(), WsEventDTO::MessageDeleted(_)));
    }

    #[tokio::test]
    async fn test_send_to_unknown_room_fails() {
        let map = RoomMap::new();
        assert!(map.send("nope", deleted_event()).is_err());
    }

    #[tokio::test]
    async fn test_other_rooms_do_not_receive() {
        let map = RoomMap::new();
        let mut rx_other = map.subscribe("room-2");
        let _rx = map.subscribe("room-1");

        map.send("room-1", deleted_event()).unwrap();
        assert!(rx_other.try_recv().is_err());
    }
}
