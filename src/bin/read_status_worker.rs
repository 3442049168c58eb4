//! Read-status worker - processo indipendente che drena la coda durevole
//!
//! Va eseguito accanto al server HTTP; più istanze con CONSUMER_NAME
//! diversi si spartiscono la stessa coda. Il loop termina solo per un
//! fallimento fatale del broker: a quel punto il processo esce e il
//! supervisore lo riavvia.

use chat_server::broker::{BrokerConfig, BrokerConnection, ConsumerSettings, consumer};
use chat_server::core::Config;
use chat_server::repositories::MessageRepository;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Store irraggiungibile al boot: fatale, il supervisore riavvia
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .max_lifetime(Duration::from_secs(config.connection_lifetime_secs))
        .connect(&config.database_url)
        .await?;

    let broker = Arc::new(BrokerConnection::new(BrokerConfig::from_config(&config))?);
    let store = MessageRepository::new(pool);
    let settings = ConsumerSettings::from_config(&config);

    println!(
        "Read-status worker starting (queue: {}, consumer: {})",
        config.read_status_queue, config.consumer_name
    );

    // Ritorna solo su esaurimento dei retry di connessione
    consumer::run(broker, store, settings).await?;

    Ok(())
}
