//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod enums;
pub mod message;
pub mod room;

// Re-exports per facilitare l'import
pub use enums::DeleteType;
pub use message::{Message, MessageReader};
pub use room::Room;
