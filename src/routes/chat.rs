use actix_web::{delete, get, post, web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::Conversation;
use crate::services::ConversationThread;
use crate::types::{ChatReplyResponse, CreateConversationRequest, SendMessageRequest};
use crate::AppState;

#[get("/conversations")]
async fn list_conversations(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<impl Responder, ApiError> {
    let conversations =
        Conversation::list_for_user(&app_state.pool, &authenticated_user.user_id).await?;
    Ok(web::Json(conversations))
}

#[post("/conversations")]
async fn create_conversation(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    req_body: web::Json<CreateConversationRequest>,
) -> Result<impl Responder, ApiError> {
    if req_body.title.trim().is_empty() {
        return Err(ApiError::Validation("对话标题不能为空".to_string()));
    }
    let conversation =
        Conversation::create(&app_state.pool, &authenticated_user.user_id, &req_body.title)
            .await?;
    Ok(web::Json(conversation))
}

#[get("/conversations/{conversation_id}/messages")]
async fn get_messages(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let thread = ConversationThread::new(&app_state.pool, &app_state.gateway);
    let messages = thread
        .messages(&authenticated_user.user_id, conversation_id.into_inner())
        .await?;
    Ok(web::Json(messages))
}

/// Appends the user message, then asks the multi-agent service for a reply.
/// The user message is committed before the AI call, so it survives even when
/// the AI turn degrades to an apology reply.
#[post("/conversations/{conversation_id}/messages")]
async fn send_message(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
    req_body: web::Json<SendMessageRequest>,
) -> Result<impl Responder, ApiError> {
    let conversation_id = conversation_id.into_inner();
    let thread = ConversationThread::new(&app_state.pool, &app_state.gateway);

    thread
        .append_user_message(
            &authenticated_user.user_id,
            conversation_id,
            &req_body.content,
        )
        .await?;

    let reply = thread
        .request_agent_reply(&authenticated_user.user_id, conversation_id)
        .await?;

    Ok(web::Json(ChatReplyResponse::from(reply)))
}

#[delete("/conversations/{conversation_id}")]
async fn delete_conversation(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let thread = ConversationThread::new(&app_state.pool, &app_state.gateway);
    thread
        .delete(&authenticated_user.user_id, conversation_id.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
