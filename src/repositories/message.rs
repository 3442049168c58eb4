//! MessageRepository - Repository per la gestione dei messaggi

use super::{Delete, MarkRead, Read};
use crate::entities::{Message, MessageReader};
use chrono::{DateTime, Utc};
use sqlx::{Error, MySqlPool};

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: MySqlPool,
}

/// Builds a `?, ?, ...` placeholder list for an `IN` clause.
fn placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 3);
    for i in 0..count {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

impl MessageRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Get paginated messages of a room as seen by `viewer_id`, newest first.
    ///
    /// Messages the viewer has locally deleted are filtered out at the query
    /// level; other participants keep seeing them.
    ///
    /// # Arguments
    /// * `room_id` - The room ID
    /// * `viewer_id` - The requesting user; drives the hidden-message filter
    /// * `before_date` - Optional exclusive upper bound for pagination
    /// * `limit` - Maximum number of messages to return
    pub async fn find_many_paginated(
        &self,
        room_id: &str,
        viewer_id: &str,
        before_date: Option<&DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, Error> {
        let messages = if let Some(before) = before_date {
            sqlx::query_as::<_, Message>(
                r#"
                SELECT m.message_id, m.room_id, m.sender_id, m.content, m.file_id, m.created_at
                FROM messages m
                LEFT JOIN message_hidden h
                    ON h.message_id = m.message_id AND h.user_id = ?
                WHERE m.room_id = ?
                  AND h.user_id IS NULL
                  AND m.created_at < ?
                ORDER BY m.created_at DESC
                LIMIT ?
                "#,
            )
            .bind(viewer_id)
            .bind(room_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?
        } else {
            sqlx::query_as::<_, Message>(
                r#"
                SELECT m.message_id, m.room_id, m.sender_id, m.content, m.file_id, m.created_at
                FROM messages m
                LEFT JOIN message_hidden h
                    ON h.message_id = m.message_id AND h.user_id = ?
                WHERE m.room_id = ?
                  AND h.user_id IS NULL
                ORDER BY m.created_at DESC
                LIMIT ?
                "#,
            )
            .bind(viewer_id)
            .bind(room_id)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await?
        };

        Ok(messages)
    }

    /// Get all reader entries for a set of messages in one query.
    pub async fn find_readers(&self, message_ids: &[String]) -> Result<Vec<MessageReader>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT message_id, user_id, read_at FROM message_readers WHERE message_id IN ({})",
            placeholders(message_ids.len())
        );

        let mut query = sqlx::query_as::<_, MessageReader>(&sql);
        for id in message_ids {
            query = query.bind(id);
        }

        query.fetch_all(&self.connection_pool).await
    }

    /// Append `user_id` to the hidden set of a message. Repeating the call
    /// for the same pair is a no-op, not an error.
    pub async fn hide_for_user(&self, message_id: &str, user_id: &str) -> Result<(), Error> {
        sqlx::query("INSERT IGNORE INTO message_hidden (message_id, user_id) VALUES (?, ?)")
            .bind(message_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;

        Ok(())
    }
}

impl MarkRead for MessageRepository {
    async fn mark_read_if_absent(
        &self,
        message_ids: &[String],
        user_id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<u64, Error> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        // INSERT IGNORE + primary key (message_id, user_id) is the atomic
        // add-if-absent; selecting from messages skips ids that were hard
        // deleted while the event sat in the queue.
        let sql = format!(
            r#"
            INSERT IGNORE INTO message_readers (message_id, user_id, read_at)
            SELECT m.message_id, ?, ? FROM messages m WHERE m.message_id IN ({})
            "#,
            placeholders(message_ids.len())
        );

        let mut query = sqlx::query(&sql).bind(user_id).bind(read_at);
        for id in message_ids {
            query = query.bind(id);
        }

        let result = query.execute(&self.connection_pool).await?;
        Ok(result.rows_affected())
    }
}

impl Read<Message, String> for MessageRepository {
    async fn read(&self, id: &String) -> Result<Option<Message>, Error> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT message_id, room_id, sender_id, content, file_id, created_at
            FROM messages
            WHERE message_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(message)
    }
}

impl Delete<String> for MessageRepository {
    async fn delete(&self, id: &String) -> Result<(), Error> {
        // reader e hidden rows spariscono via ON DELETE CASCADE
        sqlx::query("DELETE FROM messages WHERE message_id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::placeholders;

    #[test]
    fn test_placeholders_shape() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
