//! Read-Status Consumer - worker che drena la coda durevole
//!
//! Legge una consegna alla volta dal consumer group, applica l'update
//! idempotente dei read receipt e fa ack esplicito. Non esiste una NACK su
//! Redis Streams: una consegna non confermata resta nella pending list del
//! gruppo e viene riconsegnata dal passaggio di reclaim (XPENDING + XCLAIM),
//! anche se il worker che la teneva è morto.

use crate::broker::BrokerConnection;
use crate::dtos::ReadStatusEvent;
use crate::repositories::MarkRead;
use redis::AsyncCommands;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadOptions, StreamReadReply};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// Esito del processamento di una singola consegna.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Logically complete or permanently invalid: confirm and drop.
    Ack,
    /// Transient failure: leave the delivery pending for redelivery.
    Retry,
}

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Identity of this instance inside the consumer group.
    pub consumer_name: String,
    pub block_ms: usize,
    /// Pending deliveries idle longer than this get reclaimed.
    pub reclaim_min_idle_ms: u64,
    pub reclaim_interval: Duration,
}

impl ConsumerSettings {
    pub fn from_config(config: &crate::core::Config) -> Self {
        Self {
            consumer_name: config.consumer_name.clone(),
            block_ms: config.consumer_block_ms as usize,
            reclaim_min_idle_ms: config.reclaim_min_idle_ms,
            reclaim_interval: Duration::from_millis(config.reclaim_interval_ms),
        }
    }
}

/// Decide the fate of one delivery and apply its effects.
///
/// Malformed payloads can never succeed on a retry, so they are dropped
/// with an ack instead of looping forever in redelivery. Store errors are
/// the opposite: the delivery stays queued until the store recovers.
#[instrument(skip(store, payload))]
pub async fn handle_delivery<S: MarkRead>(store: &S, payload: &str) -> Disposition {
    let event: ReadStatusEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("Invalid read-status payload, dropping: {:?}", e);
            return Disposition::Ack;
        }
    };

    if let Err(e) = event.validate() {
        warn!("Read-status payload failed validation, dropping: {}", e);
        return Disposition::Ack;
    }

    match store
        .mark_read_if_absent(&event.message_ids, &event.user_id, event.read_at)
        .await
    {
        Ok(inserted) => {
            info!(
                user_id = %event.user_id,
                requested = event.message_ids.len(),
                inserted,
                "Read receipts applied"
            );
            Disposition::Ack
        }
        Err(e) => {
            error!("Failed to apply read receipts, delivery will be retried: {:?}", e);
            Disposition::Retry
        }
    }
}

/// Long-running consumer loop. Returns only on a fatal broker failure
/// (connect retries exhausted); the supervisor restarts the process.
pub async fn run<S: MarkRead>(
    broker: Arc<BrokerConnection>,
    store: S,
    settings: ConsumerSettings,
) -> Result<(), redis::RedisError> {
    broker.connect().await?;
    info!(
        queue = %broker.queue(),
        group = %broker.group(),
        consumer = %settings.consumer_name,
        "Read-status consumer started, waiting for deliveries"
    );

    let mut last_reclaim = Instant::now();

    loop {
        let Some(mut conn) = broker.channel().await else {
            // canale invalidato da un errore precedente: riconnessione
            // bounded, se si esaurisce il worker termina
            broker.connect().await?;
            continue;
        };

        let options = StreamReadOptions::default()
            .group(broker.group(), &settings.consumer_name)
            .count(1)
            .block(settings.block_ms);

        let reply: Result<StreamReadReply, redis::RedisError> = conn
            .xread_options(&[broker.queue()], &[">"], &options)
            .await;

        match reply {
            Ok(reply) => {
                for key in reply.keys {
                    for entry in key.ids {
                        process_entry(&broker, &store, &entry).await;
                    }
                }
            }
            Err(e) => {
                warn!("Queue read failed, invalidating channel: {:?}", e);
                broker.invalidate().await;
            }
        }

        if last_reclaim.elapsed() >= settings.reclaim_interval {
            if let Err(e) = reclaim_pending(&broker, &store, &settings).await {
                warn!("Reclaim pass failed: {:?}", e);
            }
            last_reclaim = Instant::now();
        }
    }
}

/// Apply one queue entry and acknowledge it when done.
async fn process_entry<S: MarkRead>(broker: &BrokerConnection, store: &S, entry: &StreamId) {
    let Some(payload) = entry.get::<String>("payload") else {
        warn!(entry_id = %entry.id, "Queue entry without payload field, dropping");
        ack_entry(broker, &entry.id).await;
        return;
    };

    match handle_delivery(store, &payload).await {
        Disposition::Ack => ack_entry(broker, &entry.id).await,
        Disposition::Retry => {
            // nessun ack: la consegna resta pending e verrà riconsegnata
        }
    }
}

async fn ack_entry(broker: &BrokerConnection, entry_id: &str) {
    let Some(mut conn) = broker.channel().await else {
        // senza canale l'ack salta; la riconsegna è innocua perché
        // l'applicazione è idempotente
        warn!(%entry_id, "No channel for ack, delivery will be redelivered");
        return;
    };

    let acked: Result<i64, redis::RedisError> = conn
        .xack(broker.queue(), broker.group(), &[entry_id])
        .await;

    if let Err(e) = acked {
        warn!(%entry_id, "Failed to ack delivery: {:?}", e);
        broker.invalidate().await;
    }
}

/// Redelivery of abandoned work: claim pending entries (ours or those of a
/// crashed instance) that have been idle long enough, and run them through
/// the normal processing path.
#[instrument(skip(broker, store, settings), fields(consumer = %settings.consumer_name))]
async fn reclaim_pending<S: MarkRead>(
    broker: &BrokerConnection,
    store: &S,
    settings: &ConsumerSettings,
) -> Result<usize, redis::RedisError> {
    let Some(mut conn) = broker.channel().await else {
        return Ok(0);
    };

    let pending: StreamPendingCountReply = conn
        .xpending_count(broker.queue(), broker.group(), "-", "+", 32)
        .await?;

    if pending.ids.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = pending.ids.iter().map(|p| p.id.clone()).collect();

    // XCLAIM salta da sola le entry non ancora abbastanza idle
    let claimed: StreamClaimReply = conn
        .xclaim(
            broker.queue(),
            broker.group(),
            &settings.consumer_name,
            settings.reclaim_min_idle_ms,
            &ids,
        )
        .await?;

    let count = claimed.ids.len();
    if count > 0 {
        info!(count, "Reclaimed pending deliveries");
        for entry in &claimed.ids {
            process_entry(broker, store, entry).await;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory double of the message store: same add-if-absent contract
    /// as the SQL implementation.
    struct FakeStore {
        existing: HashSet<String>,
        readers: Mutex<HashMap<(String, String), DateTime<Utc>>>,
        fail: AtomicBool,
    }

    impl FakeStore {
        fn with_messages(ids: &[&str]) -> Self {
            Self {
                existing: ids.iter().map(|s| s.to_string()).collect(),
                readers: Mutex::new(HashMap::new()),
                fail: AtomicBool::new(false),
            }
        }

        fn reader_count(&self) -> usize {
            self.readers.lock().unwrap().len()
        }

        fn read_at_of(&self, message_id: &str, user_id: &str) -> Option<DateTime<Utc>> {
            self.readers
                .lock()
                .unwrap()
                .get(&(message_id.to_string(), user_id.to_string()))
                .copied()
        }
    }

    impl MarkRead for FakeStore {
        async fn mark_read_if_absent(
            &self,
            message_ids: &[String],
            user_id: &str,
            read_at: DateTime<Utc>,
        ) -> Result<u64, sqlx::Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(sqlx::Error::PoolTimedOut);
            }

            let mut readers = self.readers.lock().unwrap();
            let mut inserted = 0;
            for id in message_ids {
                if !self.existing.contains(id) {
                    continue;
                }
                let key = (id.clone(), user_id.to_string());
                if let std::collections::hash_map::Entry::Vacant(slot) = readers.entry(key) {
                    slot.insert(read_at);
                    inserted += 1;
                }
            }
            Ok(inserted)
        }
    }

    fn payload(room: &str, user: &str, ids: &[&str], read_at: &str) -> String {
        serde_json::to_string(&serde_json::json!({
            "roomId": room,
            "userId": user,
            "messageIds": ids,
            "readAt": read_at,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let store = FakeStore::with_messages(&["m1", "m2"]);
        let event = payload("r1", "u1", &["m1", "m2"], "2025-03-01T10:00:00Z");

        assert_eq!(handle_delivery(&store, &event).await, Disposition::Ack);
        assert_eq!(handle_delivery(&store, &event).await, Disposition::Ack);

        assert_eq!(store.reader_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_one_event_yield_single_entry() {
        let store = FakeStore::with_messages(&["m1"]);
        let event = payload("r1", "u1", &["m1", "m1", "m1"], "2025-03-01T10:00:00Z");

        assert_eq!(handle_delivery(&store, &event).await, Disposition::Ack);
        assert_eq!(store.reader_count(), 1);
    }

    #[tokio::test]
    async fn test_first_read_timestamp_never_regresses() {
        let store = FakeStore::with_messages(&["m1"]);
        let first = payload("r1", "u1", &["m1"], "2025-03-01T10:00:00Z");
        let later = payload("r1", "u1", &["m1"], "2025-03-01T11:30:00Z");

        handle_delivery(&store, &first).await;
        handle_delivery(&store, &later).await;

        let kept = store.read_at_of("m1", "u1").unwrap();
        assert_eq!(kept, "2025-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[tokio::test]
    async fn test_empty_message_ids_is_acked_without_mutation() {
        let store = FakeStore::with_messages(&["m1"]);
        let event = payload("r1", "u1", &[], "2025-03-01T10:00:00Z");

        assert_eq!(handle_delivery(&store, &event).await, Disposition::Ack);
        assert_eq!(store.reader_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_user_id_is_acked_without_mutation() {
        let store = FakeStore::with_messages(&["m1"]);
        let event = r#"{"roomId": "r1", "messageIds": ["m1"], "readAt": "2025-03-01T10:00:00Z"}"#;

        assert_eq!(handle_delivery(&store, event).await, Disposition::Ack);
        assert_eq!(store.reader_count(), 0);
    }

    #[tokio::test]
    async fn test_garbage_payload_is_acked() {
        let store = FakeStore::with_messages(&[]);
        assert_eq!(handle_delivery(&store, "not json at all").await, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_store_failure_requests_retry_then_succeeds() {
        let store = FakeStore::with_messages(&["m1"]);
        let event = payload("r1", "u1", &["m1"], "2025-03-01T10:00:00Z");

        store.fail.store(true, Ordering::SeqCst);
        assert_eq!(handle_delivery(&store, &event).await, Disposition::Retry);
        assert_eq!(store.reader_count(), 0);

        // lo store torna raggiungibile: la riconsegna va a buon fine
        store.fail.store(false, Ordering::SeqCst);
        assert_eq!(handle_delivery(&store, &event).await, Disposition::Ack);
        assert_eq!(store.reader_count(), 1);
    }

    #[tokio::test]
    async fn test_vanished_message_is_skipped_silently() {
        let store = FakeStore::with_messages(&["m1"]);
        let event = payload("r1", "u1", &["m1", "deleted-m2"], "2025-03-01T10:00:00Z");

        assert_eq!(handle_delivery(&store, &event).await, Disposition::Ack);
        assert_eq!(store.reader_count(), 1);
        assert!(store.read_at_of("deleted-m2", "u1").is_none());
    }
}
