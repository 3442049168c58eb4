//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Questo modulo organizza i repository in sotto-moduli separati per una migliore manutenibilità.
//! Ogni repository gestisce le operazioni di database per una specifica entità.
//!
//! Le query usano le forme runtime-checked di sqlx (`sqlx::query` /
//! `sqlx::query_as` con `.bind`): la crate compila senza un database
//! raggiungibile e lo schema di riferimento vive in `migrations/`.

pub mod message;
pub mod room;
pub mod traits;

// Re-exports per facilitare l'import
pub use message::MessageRepository;
pub use room::RoomRepository;
pub use traits::{Delete, MarkRead, Read};
