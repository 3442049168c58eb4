//! Application State - Stato globale dell'applicazione
//!
//! Contiene tutti i repository, configurazioni e stato condiviso
//! necessario per gestire l'applicazione.

use crate::broker::{BrokerConnection, ReadStatusPublisher};
use crate::repositories::{MessageRepository, RoomRepository};
use crate::ws::roommap::RoomMap;
use crate::ws::usermap::UserMap;
use sqlx::MySqlPool;
use std::sync::Arc;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Repository per la gestione dei messaggi
    pub msg: MessageRepository,

    /// Repository (sola lettura) per stanze e partecipanti
    pub room: RoomRepository,

    /// Connessione condivisa verso il broker dei read-status
    pub broker: Arc<BrokerConnection>,

    /// Publisher degli eventi di lettura, usato dal read-ack handler
    pub read_status: ReadStatusPublisher,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Mappa concorrente degli utenti online con i loro canali WebSocket
    /// Key: user_id, Value: Sender per inviare segnali al WebSocket dell'utente
    pub users_online: UserMap,

    /// Canali broadcast delle stanze con almeno un utente online
    pub rooms_online: RoomMap,

    /// Soglia di età oltre la quale una cancellazione diventa solo locale
    pub delete_age_threshold: chrono::Duration,
}

impl AppState {
    /// Crea una nuova istanza di AppState inizializzando tutti i repository
    /// con il pool di connessioni fornito, il broker condiviso e i parametri
    /// del deletion engine.
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni MySQL condiviso
    /// * `broker` - Connection manager del broker (condiviso col worker)
    /// * `jwt_secret` - Chiave segreta per la verifica dei token JWT
    /// * `delete_age_threshold_ms` - Soglia del deletion engine in millisecondi
    pub fn new(
        pool: MySqlPool,
        broker: Arc<BrokerConnection>,
        jwt_secret: String,
        delete_age_threshold_ms: i64,
    ) -> Self {
        Self {
            msg: MessageRepository::new(pool.clone()),
            room: RoomRepository::new(pool),
            read_status: ReadStatusPublisher::new(broker.clone()),
            broker,
            jwt_secret,
            users_online: UserMap::new(),
            rooms_online: RoomMap::new(),
            delete_age_threshold: chrono::Duration::milliseconds(delete_age_threshold_ms),
        }
    }
}
