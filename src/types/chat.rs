use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Message, Sender};

#[derive(Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
}

/// The AI turn returned from the send-message endpoint.
#[derive(Serialize, ToSchema)]
pub struct ChatReplyResponse {
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for ChatReplyResponse {
    fn from(message: Message) -> Self {
        ChatReplyResponse {
            id: message.id,
            content: message.content,
            sender: message.sender,
            created_at: message.created_at,
        }
    }
}
