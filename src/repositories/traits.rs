//! Common repository traits
//!
//! This module defines generic interfaces for database operations.

use chrono::{DateTime, Utc};

/// Trait for reading a single entity by primary key
///
/// # Type Parameters
/// * `Entity` - Type of the entity to read
/// * `Id` - Type of the primary key (e.g. `String`, `(String, String)`)
pub trait Read<Entity, Id> {
    /// Reads an entity from the database by its primary key
    ///
    /// # Arguments
    /// * `id` - Primary key of the entity to read
    ///
    /// # Returns
    /// * `Ok(Some(Entity))` - Entity found
    /// * `Ok(None)` - No entity with that ID
    /// * `Err(sqlx::Error)` - Error during reading
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}

/// Trait for deleting entities
///
/// # Type Parameters
/// * `Id` - Type of the primary key
pub trait Delete<Id> {
    /// Deletes an entity from the database
    ///
    /// # Arguments
    /// * `id` - Primary key of the entity to delete
    ///
    /// # Returns
    /// * `Ok(())` - Deletion successful
    /// * `Err(sqlx::Error)` - Error during deletion
    async fn delete(&self, id: &Id) -> Result<(), sqlx::Error>;
}

/// Seam between the read-status consumer and the message store.
///
/// The write must be add-if-absent per (message, user) pair and atomic
/// under concurrent callers: applying the same batch N times, in any
/// order, from any number of consumer instances, leaves exactly one
/// reader entry per pair. Ids that no longer exist are skipped silently.
pub trait MarkRead {
    /// Returns the number of reader entries actually inserted (already
    /// present pairs and vanished messages do not count).
    async fn mark_read_if_absent(
        &self,
        message_ids: &[String],
        user_id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>;
}
