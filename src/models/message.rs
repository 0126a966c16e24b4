use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type, utoipa::ToSchema)]
#[sqlx(type_name = "sender_enum", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "lowercase")] // JSON value name
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub sender_role: Option<String>,
    pub message_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Appends a message to a conversation, assigning the next order value.
    ///
    /// The order is computed inside the INSERT so that concurrent appends to
    /// the same conversation are serialized at the storage boundary (the
    /// unique index on `(conversation_id, message_order)` rejects the loser).
    pub async fn append(
        pool: &PgPool,
        conversation_id: Uuid,
        content: &str,
        sender: Sender,
        sender_role: Option<&str>,
    ) -> Result<Self, ApiError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, content, sender, sender_role, message_order, created_at, updated_at)
            SELECT $1, $2, $3, $4, $5, COALESCE(MAX(message_order) + 1, 0), $6, $6
            FROM messages WHERE conversation_id = $2
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(content)
        .bind(sender)
        .bind(sender_role)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(message)
    }

    /// Full history of a conversation, oldest first. Ordering by
    /// `message_order` breaks `created_at` ties, so the AI service always sees
    /// messages in append order.
    pub async fn list_for_conversation(
        pool: &PgPool,
        conversation_id: Uuid,
    ) -> Result<Vec<Self>, ApiError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY message_order ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_serializes_to_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Sender::Ai).unwrap(), r#""ai""#);
    }

    #[test]
    fn sender_deserializes_from_lowercase() {
        assert_eq!(
            serde_json::from_str::<Sender>(r#""ai""#).unwrap(),
            Sender::Ai
        );
    }
}
