//! Read-Status Publisher - accoda eventi di lettura per la consegna asincrona

use crate::broker::BrokerConnection;
use crate::core::AppError;
use crate::dtos::ReadStatusEvent;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use validator::Validate;

/// Hands read-status events to the broker connection for durable delivery.
///
/// The HTTP caller is never blocked beyond the (bounded) connect retry and
/// a single publish round trip. A failed confirmation after hand-off is
/// logged and swallowed; failing to reach the broker at all is propagated,
/// because in that case the event was never handed over.
#[derive(Clone)]
pub struct ReadStatusPublisher {
    broker: Arc<BrokerConnection>,
}

impl ReadStatusPublisher {
    pub fn new(broker: Arc<BrokerConnection>) -> Self {
        Self { broker }
    }

    #[instrument(skip(self, event), fields(room_id = %event.room_id, user_id = %event.user_id, count = event.message_ids.len()))]
    pub async fn publish(&self, event: &ReadStatusEvent) -> Result<(), AppError> {
        event.validate()?;

        // pubblicare senza canale non ha senso: la connessione va attesa
        if !self.broker.is_ready().await {
            self.broker.connect().await?;
        }

        let payload = serde_json::to_string(event)?;

        match self.broker.publish_confirmed(&payload).await {
            Ok(entry_id) => {
                debug!(%entry_id, "Read-status event confirmed by broker");
            }
            Err(e) => {
                // fire-and-log: il read-ack HTTP non deve fallire per un
                // singhiozzo transitorio del broker
                warn!("Read-status publish not confirmed: {:?}", e);
            }
        }

        Ok(())
    }
}
