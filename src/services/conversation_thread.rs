use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::gateway::{AiGateway, HistoryMessage};
use crate::models::{Conversation, Message, Sender};

/// Owner-scoped operations on one conversation's ordered message thread.
///
/// Appending the user message and requesting the agent reply are separate
/// steps that are not atomic with each other: the user message is committed
/// first and survives even if the AI turn goes badly, and because
/// `AiGateway::chat` never fails, the reply step always produces a persistable
/// message too.
pub struct ConversationThread<'a> {
    pool: &'a PgPool,
    gateway: &'a AiGateway,
}

impl<'a> ConversationThread<'a> {
    pub fn new(pool: &'a PgPool, gateway: &'a AiGateway) -> Self {
        ConversationThread { pool, gateway }
    }

    /// Resolves the conversation and verifies ownership before anything else
    /// happens on its behalf.
    async fn owned_conversation(
        &self,
        owner_id: &str,
        conversation_id: Uuid,
    ) -> Result<Conversation, ApiError> {
        let conversation = Conversation::get_by_id(self.pool, conversation_id)
            .await?
            .ok_or(ApiError::NotFound("对话"))?;
        conversation.ensure_owner(owner_id)?;
        Ok(conversation)
    }

    /// Ordered messages of an owned conversation, oldest first.
    pub async fn messages(
        &self,
        owner_id: &str,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, ApiError> {
        let conversation = self.owned_conversation(owner_id, conversation_id).await?;
        Message::list_for_conversation(self.pool, conversation.id).await
    }

    /// Appends a user message with the next order value and refreshes the
    /// conversation's `updated_at`.
    pub async fn append_user_message(
        &self,
        owner_id: &str,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<Message, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation("消息内容不能为空".to_string()));
        }

        let conversation = self.owned_conversation(owner_id, conversation_id).await?;
        let message =
            Message::append(self.pool, conversation.id, content, Sender::User, None).await?;
        Conversation::touch(self.pool, conversation.id).await?;

        debug!(
            "User message {} appended to conversation {}",
            message.id, conversation.id
        );
        Ok(message)
    }

    /// Sends the full ordered history to the multi-agent service and persists
    /// its reply. Call after `append_user_message` for the same turn.
    ///
    /// The ownership check runs before any network traffic; a mismatched
    /// owner never reaches the AI service.
    pub async fn request_agent_reply(
        &self,
        owner_id: &str,
        conversation_id: Uuid,
    ) -> Result<Message, ApiError> {
        let conversation = self.owned_conversation(owner_id, conversation_id).await?;

        let messages = Message::list_for_conversation(self.pool, conversation.id).await?;
        let latest = messages
            .last()
            .filter(|m| m.sender == Sender::User)
            .ok_or_else(|| ApiError::Validation("对话中没有待回复的用户消息".to_string()))?;
        let prompt = latest.content.clone();
        let history: Vec<HistoryMessage> = messages.iter().map(HistoryMessage::from).collect();

        let reply = self.gateway.chat(history, &prompt).await;

        let message =
            Message::append(self.pool, conversation.id, &reply, Sender::Ai, None).await?;
        Conversation::touch(self.pool, conversation.id).await?;

        debug!(
            "AI reply {} appended to conversation {}",
            message.id, conversation.id
        );
        Ok(message)
    }

    /// Deletes an owned conversation and, through the cascade, its messages.
    pub async fn delete(&self, owner_id: &str, conversation_id: Uuid) -> Result<(), ApiError> {
        let conversation = self.owned_conversation(owner_id, conversation_id).await?;
        Conversation::delete(self.pool, conversation.id).await
    }
}
