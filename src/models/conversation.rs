use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a new conversation owned by `user_id`.
    pub async fn create(pool: &PgPool, user_id: &str, title: &str) -> Result<Self, ApiError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        debug!("Conversation created: {:?}", conversation);
        Ok(conversation)
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, ApiError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    /// All conversations of a user, most recently updated first.
    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, ApiError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(conversations)
    }

    /// Refreshes `updated_at`. Called after every appended message.
    pub async fn touch(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Deletes the conversation; its messages go with it via the
    /// `ON DELETE CASCADE` foreign key.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            DELETE FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        debug!("Conversation deleted with id: {:?}", id);
        Ok(())
    }

    /// Owner check used by every entry point that touches this conversation.
    /// A mismatch is `Unauthorized`, deliberately distinct from `NotFound`.
    pub fn ensure_owner(&self, user_id: &str) -> Result<(), ApiError> {
        if self.user_id != user_id {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_owned_by(user_id: &str) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: "两位数加法".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_passes_ownership_check() {
        let conversation = conversation_owned_by("user_1");
        assert!(conversation.ensure_owner("user_1").is_ok());
    }

    #[test]
    fn mismatched_owner_is_unauthorized() {
        let conversation = conversation_owned_by("user_1");
        assert!(matches!(
            conversation.ensure_owner("user_2"),
            Err(ApiError::Unauthorized)
        ));
    }
}
