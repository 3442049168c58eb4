//! Broker Connection Manager - canale condiviso verso il broker dei read-status
//!
//! Il processo possiede un unico canale logico verso il broker (Redis). La
//! coda durevole è uno stream consumato tramite consumer group: la risposta
//! attesa della `XADD` fa da publish confirmation, la `XGROUP CREATE ...
//! MKSTREAM` è la declare idempotente della coda.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, ErrorKind, RedisError};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    /// Stream name of the durable read-status queue.
    pub queue: String,
    /// Consumer group the workers read through.
    pub group: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl BrokerConfig {
    pub fn from_config(config: &crate::core::Config) -> Self {
        Self {
            url: config.redis_url.clone(),
            queue: config.read_status_queue.clone(),
            group: config.consumer_group.clone(),
            max_retries: config.broker_max_retries,
            retry_delay: Duration::from_millis(config.broker_retry_delay_ms),
        }
    }
}

pub struct BrokerConnection {
    client: Client,
    /// Canale correntemente utilizzabile, None finché `connect` non riesce
    /// o dopo un errore d'uso che lo ha invalidato.
    channel: RwLock<Option<MultiplexedConnection>>,
    /// Serializza i tentativi di connessione: un solo connect in volo,
    /// i chiamanti concorrenti aspettano il vincitore.
    connecting: Mutex<()>,
    config: BrokerConfig,
}

impl BrokerConnection {
    pub fn new(config: BrokerConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            channel: RwLock::new(None),
            connecting: Mutex::new(()),
            config,
        })
    }

    pub fn queue(&self) -> &str {
        &self.config.queue
    }

    pub fn group(&self) -> &str {
        &self.config.group
    }

    /// Whether a channel is currently usable. Callers must not cache the
    /// answer: the channel can be invalidated by any failed use.
    pub async fn is_ready(&self) -> bool {
        self.channel.read().await.is_some()
    }

    /// Clone of the current channel, if any.
    pub async fn channel(&self) -> Option<MultiplexedConnection> {
        self.channel.read().await.clone()
    }

    /// Drop the cached channel so the next caller re-triggers `connect`.
    pub async fn invalidate(&self) {
        *self.channel.write().await = None;
    }

    /// Establishes the connection and declares the durable queue, retrying
    /// up to `max_retries` times with a fixed delay. Once retries are
    /// exhausted the error is returned and no further attempts are made:
    /// the supervisor is expected to restart the process.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<(), RedisError> {
        let _guard = self.connecting.lock().await;

        // un altro chiamante può aver già riconnesso mentre aspettavamo il lock
        if self.channel.read().await.is_some() {
            return Ok(());
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_connect().await {
                Ok(conn) => {
                    *self.channel.write().await = Some(conn);
                    info!(queue = %self.config.queue, "Broker connected, durable queue declared");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, "Broker connection failed: {:?}", e);
                    if attempt >= self.config.max_retries {
                        error!(
                            max_retries = self.config.max_retries,
                            "Broker connection retries exhausted. Giving up."
                        );
                        return Err(e);
                    }
                    sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    async fn try_connect(&self) -> Result<MultiplexedConnection, RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.declare_queue(&mut conn).await?;
        Ok(conn)
    }

    /// Idempotent declare: create stream + consumer group if missing,
    /// tolerate the group already existing.
    async fn declare_queue(&self, conn: &mut MultiplexedConnection) -> Result<(), RedisError> {
        let created: Result<(), RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.queue)
            .arg(&self.config.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(conn)
            .await;

        match created {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Publish with confirmation: the awaited reply (the new entry id) is
    /// the broker's acknowledgment that the event hit the durable queue.
    /// Fails fast when no channel is held; a failed publish invalidates
    /// the channel so the next use reconnects.
    #[instrument(skip(self, payload))]
    pub async fn publish_confirmed(&self, payload: &str) -> Result<String, RedisError> {
        let Some(mut conn) = self.channel().await else {
            return Err(RedisError::from((
                ErrorKind::ClientError,
                "broker channel not ready",
            )));
        };

        match conn
            .xadd::<_, _, _, _, String>(&self.config.queue, "*", &[("payload", payload)])
            .await
        {
            Ok(entry_id) => Ok(entry_id),
            Err(e) => {
                self.invalidate().await;
                Err(e)
            }
        }
    }
}
