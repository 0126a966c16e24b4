//! Client for the two external AI services: the multi-agent tutoring service
//! and the single-agent lesson-plan generator.
//!
//! The two paths deliberately differ: `chat` retries with linear backoff and
//! always yields a reply string so a failed AI turn can still be persisted,
//! while `generate_lesson_plan` makes a single attempt and surfaces
//! `GatewayUnavailable` because plan generation is a discrete foreground
//! action where silent degradation would be wrong.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{Message, Sender};

/// One turn of history as the multi-agent service expects it.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryMessage {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for HistoryMessage {
    fn from(message: &Message) -> Self {
        HistoryMessage {
            sender: message.sender,
            content: message.content.clone(),
            timestamp: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatUpstreamRequest {
    pub history: Vec<HistoryMessage>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanUpstreamRequest {
    pub grade: String,
    pub module: String,
    pub knowledge_point: String,
    pub duration: i32,
    pub preferences: Vec<String>,
    pub custom_requirements: String,
    #[serde(rename = "useRAG")]
    pub use_rag: bool,
}

/// Retry policy: total attempt count plus a per-attempt delay function, so the
/// backoff schedule is testable without sleeping and usable from any executor.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: fn(u32) -> Duration,
}

impl RetryPolicy {
    /// `max_attempts` total attempts with `attempt_index * 1s` waits between
    /// them: attempt 1 fails, wait 1s, attempt 2 fails, wait 2s, attempt 3.
    pub fn linear(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            backoff: |attempt| Duration::from_secs(attempt as u64),
        }
    }

    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            backoff: |_| Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }
}

/// Raw HTTP seam to the AI services. Split out so gateway policy can be tested
/// against a mock transport.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn post_chat(&self, request: ChatUpstreamRequest) -> anyhow::Result<Value>;
    async fn post_lesson_plan(&self, request: LessonPlanUpstreamRequest) -> anyhow::Result<Value>;
}

pub struct HttpAgentTransport {
    client: reqwest::Client,
    multi_agent_base_url: String,
    single_agent_base_url: String,
}

impl HttpAgentTransport {
    pub fn new(config: &AppConfig) -> Self {
        HttpAgentTransport {
            client: reqwest::Client::new(),
            multi_agent_base_url: config.multi_agent_base_url.clone(),
            single_agent_base_url: config.single_agent_base_url.clone(),
        }
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn post_chat(&self, request: ChatUpstreamRequest) -> anyhow::Result<Value> {
        let url = format!("{}/chat", self.multi_agent_base_url);
        debug!("Sending chat request to {}", url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    async fn post_lesson_plan(&self, request: LessonPlanUpstreamRequest) -> anyhow::Result<Value> {
        let url = format!("{}/generate-lesson-plan", self.single_agent_base_url);
        debug!("Sending lesson plan request to {}", url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

#[derive(Clone)]
pub struct AiGateway {
    transport: Arc<dyn AgentTransport>,
    retry: RetryPolicy,
}

impl AiGateway {
    pub fn new(config: &AppConfig) -> Self {
        AiGateway {
            transport: Arc::new(HttpAgentTransport::new(config)),
            retry: RetryPolicy::linear(3),
        }
    }

    pub fn with_transport(transport: Arc<dyn AgentTransport>, retry: RetryPolicy) -> Self {
        AiGateway { transport, retry }
    }

    /// Asks the multi-agent service for a reply to `message`, given the full
    /// ordered history (which already includes the new user message).
    ///
    /// Never fails: transport errors, non-2xx responses and bodies without a
    /// usable `reply` field are retried, and exhaustion yields an apology
    /// string carrying the last error. The caller always gets a reply it can
    /// persist.
    pub async fn chat(&self, history: Vec<HistoryMessage>, message: &str) -> String {
        let request = ChatUpstreamRequest {
            history,
            message: message.to_string(),
        };

        let max_attempts = self.retry.max_attempts();
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            match self.transport.post_chat(request.clone()).await {
                Ok(body) => match body.get("reply").and_then(Value::as_str) {
                    Some(reply) => return reply.to_string(),
                    None => {
                        last_error = format!("AI服务返回了无效的响应格式: {}", body);
                        warn!(
                            "Chat response missing reply field (attempt {}/{}): {}",
                            attempt, max_attempts, body
                        );
                    }
                },
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "Chat request to AI service failed (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }

        format!("抱歉，连接AI服务时出现错误，请稍后再试。错误详情: {}", last_error)
    }

    /// Asks the single-agent service for a lesson plan. Single attempt, no
    /// retry: any failure or empty body is `GatewayUnavailable` for the caller
    /// to report.
    pub async fn generate_lesson_plan(
        &self,
        request: LessonPlanUpstreamRequest,
    ) -> Result<serde_json::Map<String, Value>, ApiError> {
        let body = self
            .transport
            .post_lesson_plan(request)
            .await
            .map_err(|e| ApiError::GatewayUnavailable(e.to_string()))?;

        match body {
            Value::Object(map) => Ok(map),
            other => Err(ApiError::GatewayUnavailable(format!(
                "AI服务返回空响应: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use mockall::mock;

    mock! {
        pub Transport {}

        #[async_trait]
        impl AgentTransport for Transport {
            async fn post_chat(&self, request: ChatUpstreamRequest) -> anyhow::Result<Value>;
            async fn post_lesson_plan(
                &self,
                request: LessonPlanUpstreamRequest,
            ) -> anyhow::Result<Value>;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    fn gateway_with(transport: MockTransport) -> AiGateway {
        AiGateway::with_transport(Arc::new(transport), RetryPolicy::immediate(3))
    }

    fn lesson_plan_request() -> LessonPlanUpstreamRequest {
        LessonPlanUpstreamRequest {
            grade: "三年级".to_string(),
            module: "数与代数".to_string(),
            knowledge_point: "两位数加法".to_string(),
            duration: 40,
            preferences: vec!["互动式".to_string()],
            custom_requirements: String::new(),
            use_rag: true,
        }
    }

    #[tokio::test]
    async fn chat_returns_reply_on_first_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_chat()
            .times(1)
            .returning(|_| Ok(json!({ "reply": "加法就是把两个数合起来。" })));

        let reply = gateway_with(transport).chat(vec![], "什么是加法？").await;
        assert_eq!(reply, "加法就是把两个数合起来。");
    }

    #[tokio::test]
    async fn chat_makes_exactly_three_attempts_then_apologizes() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_chat()
            .times(3)
            .returning(|_| Err(anyhow!("connection refused")));

        let reply = gateway_with(transport).chat(vec![], "你好").await;
        assert!(reply.starts_with("抱歉，连接AI服务时出现错误"));
        assert!(reply.contains("connection refused"));
    }

    #[tokio::test]
    async fn chat_retries_on_missing_reply_field() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_chat()
            .times(3)
            .returning(|_| Ok(json!({ "status": "ok" })));

        let reply = gateway_with(transport).chat(vec![], "你好").await;
        assert!(reply.starts_with("抱歉，连接AI服务时出现错误"));
        assert!(reply.contains("无效的响应格式"));
    }

    #[tokio::test]
    async fn chat_retries_on_non_string_reply() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_chat()
            .times(3)
            .returning(|_| Ok(json!({ "reply": 42 })));

        let reply = gateway_with(transport).chat(vec![], "你好").await;
        assert!(reply.starts_with("抱歉，连接AI服务时出现错误"));
    }

    #[tokio::test]
    async fn chat_recovers_after_transient_failures() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_post_chat().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(anyhow!("timeout"))
            } else {
                Ok(json!({ "reply": "好的" }))
            }
        });

        let reply = gateway_with(transport).chat(vec![], "你好").await;
        assert_eq!(reply, "好的");
    }

    #[tokio::test]
    async fn lesson_plan_generation_makes_exactly_one_attempt() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_lesson_plan()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));

        let result = gateway_with(transport)
            .generate_lesson_plan(lesson_plan_request())
            .await;
        assert!(matches!(result, Err(ApiError::GatewayUnavailable(_))));
    }

    #[tokio::test]
    async fn lesson_plan_generation_rejects_non_object_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_lesson_plan()
            .times(1)
            .returning(|_| Ok(Value::Null));

        let result = gateway_with(transport)
            .generate_lesson_plan(lesson_plan_request())
            .await;
        assert!(matches!(result, Err(ApiError::GatewayUnavailable(_))));
    }

    #[tokio::test]
    async fn lesson_plan_generation_returns_raw_mapping() {
        let mut transport = MockTransport::new();
        transport
            .expect_post_lesson_plan()
            .times(1)
            .returning(|_| Ok(json!({ "title": "两位数加法", "keyPoints": ["进位"] })));

        let map = gateway_with(transport)
            .generate_lesson_plan(lesson_plan_request())
            .await
            .unwrap();
        assert_eq!(map.get("title"), Some(&json!("两位数加法")));
    }

    #[test]
    fn linear_backoff_waits_one_then_two_seconds() {
        let policy = RetryPolicy::linear(3);
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    }

    #[test]
    fn history_entry_serializes_in_wire_format() {
        let entry = HistoryMessage {
            sender: Sender::User,
            content: "你好".to_string(),
            timestamp: "2024-05-01T08:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["sender"], "user");
        assert_eq!(value["content"], "你好");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-05-01"));
    }

    #[test]
    fn lesson_plan_request_serializes_in_camel_case() {
        let value = serde_json::to_value(lesson_plan_request()).unwrap();
        assert_eq!(value["knowledgePoint"], "两位数加法");
        assert_eq!(value["duration"], 40);
        assert_eq!(value["customRequirements"], "");
        assert_eq!(value["useRAG"], true);
    }
}
