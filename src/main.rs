use chat_server::broker::{BrokerConfig, BrokerConnection};
use chat_server::core::{AppState, Config};
use chat_server::create_router;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Inizializza la configurazione
    let config = Config::from_env()?;
    config.print_info();

    // Lo store irraggiungibile al boot è fatale: niente modalità degradata
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .max_lifetime(Duration::from_secs(config.connection_lifetime_secs))
        .connect(&config.database_url)
        .await?;

    // Connessione condivisa verso il broker: il tentativo iniziale può
    // fallire, il publisher riproverà on demand alla prima pubblicazione
    let broker = Arc::new(BrokerConnection::new(BrokerConfig::from_config(&config))?);
    if let Err(e) = broker.connect().await {
        error!("Broker unavailable at boot, publisher will retry on demand: {:?}", e);
    }

    let state = Arc::new(AppState::new(
        pool,
        broker,
        config.jwt_secret.clone(),
        config.delete_age_threshold_ms,
    ));

    // Crea il router; i client web arrivano da origini diverse
    let app = create_router(state).layer(CorsLayer::permissive());

    // Definisci l'indirizzo
    let addr = format!("{}:{}", config.server_host, config.server_port);
    println!("Server listening on http://{}", addr);

    // Crea il listener TCP
    let listener = TcpListener::bind(&addr).await?;

    // Avvia il server
    axum::serve(listener, app).await?;

    Ok(())
}
