use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failure taxonomy shared by the services and the REST surface.
///
/// `GatewayUnavailable` is only ever produced by the lesson-plan path; the
/// chat path converts upstream exhaustion into a normal reply string instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("无权访问此资源")]
    Unauthorized,

    #[error("{0}不存在")]
    NotFound(&'static str),

    #[error("AI服务暂时不可用: {0}")]
    GatewayUnavailable(String),

    #[error("AI服务返回了无效的响应格式: {0}")]
    MalformedUpstreamResponse(String),

    #[error("{0}")]
    Validation(String),

    #[error("数据库错误")]
    Database(#[from] sqlx::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::GatewayUnavailable(_) | ApiError::MalformedUpstreamResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Database(e) => error!("Database error: {:?}", e),
            ApiError::GatewayUnavailable(e) => error!("AI service unavailable: {}", e),
            other => warn!("Request failed: {}", other),
        }
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("对话").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::GatewayUnavailable("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Validation("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ApiError::NotFound("教案").to_string(), "教案不存在");
    }
}
