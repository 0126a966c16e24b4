use serde_json::Value;
use tracing::warn;

use crate::codec::{FreeFormEntry, LabeledEntry};
use crate::error::ApiError;
use crate::gateway::{AiGateway, LessonPlanUpstreamRequest};
use crate::models::LessonPlan;

/// Parameters for an AI-generated lesson plan.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub grade: String,
    pub module: String,
    pub knowledge_point: String,
    pub duration_minutes: i32,
    pub preferences: Vec<String>,
    pub custom_requirements: String,
    pub use_knowledge_augmentation: bool,
}

/// Maps the single-agent service's raw response onto a typed `LessonPlan`.
///
/// A missing top-level response is fatal (`GatewayUnavailable`, propagated
/// from the gateway). A present-but-wrong-shape field is not: it is logged and
/// left empty so one bad field never sinks the whole plan.
pub struct LessonPlanAssembler<'a> {
    gateway: &'a AiGateway,
}

impl<'a> LessonPlanAssembler<'a> {
    pub fn new(gateway: &'a AiGateway) -> Self {
        LessonPlanAssembler { gateway }
    }

    /// Generates a lesson plan for `owner_id`. The returned plan is not yet
    /// persisted; absent fields come back as empty text / empty sequences.
    pub async fn generate(
        &self,
        owner_id: &str,
        params: GenerateParams,
    ) -> Result<LessonPlan, ApiError> {
        let request = LessonPlanUpstreamRequest {
            grade: params.grade.clone(),
            module: params.module.clone(),
            knowledge_point: params.knowledge_point.clone(),
            duration: params.duration_minutes,
            preferences: params.preferences,
            custom_requirements: params.custom_requirements,
            use_rag: params.use_knowledge_augmentation,
        };

        let mut body = self.gateway.generate_lesson_plan(request).await?;

        let mut plan = LessonPlan {
            user_id: owner_id.to_string(),
            title: take_string(&mut body, "title"),
            grade: params.grade,
            module: params.module,
            knowledge_point: params.knowledge_point,
            duration_minutes: params.duration_minutes,
            evaluation: take_string(&mut body, "evaluation"),
            extension: take_string(&mut body, "extension"),
            ..Default::default()
        };

        plan.set_objectives_list(&take_list::<LabeledEntry>(&mut body, "objectives"));
        plan.set_key_points_list(&take_list::<String>(&mut body, "keyPoints"));
        plan.set_difficult_points_list(&take_list::<String>(&mut body, "difficultPoints"));
        plan.set_resources_list(&take_list::<LabeledEntry>(&mut body, "resources"));
        plan.set_teaching_process_list(&take_list::<FreeFormEntry>(&mut body, "teachingProcess"));

        Ok(plan)
    }
}

fn take_string(body: &mut serde_json::Map<String, Value>, key: &str) -> String {
    match body.remove(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => {
            let e = ApiError::MalformedUpstreamResponse(format!("{} 字段不是字符串: {}", key, other));
            warn!("{}", e);
            String::new()
        }
    }
}

fn take_list<T: serde::de::DeserializeOwned>(
    body: &mut serde_json::Map<String, Value>,
    key: &str,
) -> Vec<T> {
    match body.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value::<Vec<T>>(value).unwrap_or_else(|parse_error| {
            let e = ApiError::MalformedUpstreamResponse(format!("{} 字段: {}", key, parse_error));
            warn!("{}", e);
            Vec::new()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::MockTransport;
    use crate::gateway::RetryPolicy;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Arc;

    fn params() -> GenerateParams {
        GenerateParams {
            grade: "三年级".to_string(),
            module: "数与代数".to_string(),
            knowledge_point: "两位数加法".to_string(),
            duration_minutes: 40,
            preferences: vec!["互动式".to_string()],
            custom_requirements: String::new(),
            use_knowledge_augmentation: false,
        }
    }

    fn gateway_returning(response: anyhow::Result<Value>) -> AiGateway {
        let mut transport = MockTransport::new();
        let mut response = Some(response);
        transport
            .expect_post_lesson_plan()
            .times(1)
            .returning(move |_| response.take().unwrap());
        AiGateway::with_transport(Arc::new(transport), RetryPolicy::immediate(3))
    }

    fn full_response() -> Value {
        json!({
            "title": "两位数加法教学设计",
            "objectives": [{ "label": "知识目标", "value": "掌握两位数加法" }],
            "keyPoints": ["进位的处理"],
            "difficultPoints": ["连续进位"],
            "resources": [{ "label": "教具", "value": "计数棒" }],
            "teachingProcess": [{ "stage": "导入", "duration": 5 }],
            "evaluation": "课堂练习正确率",
            "extension": "三位数加法预习"
        })
    }

    #[tokio::test]
    async fn maps_every_field_of_a_full_response() {
        let gateway = gateway_returning(Ok(full_response()));
        let plan = LessonPlanAssembler::new(&gateway)
            .generate("teacher_1", params())
            .await
            .unwrap();

        assert_eq!(plan.user_id, "teacher_1");
        assert_eq!(plan.title, "两位数加法教学设计");
        assert_eq!(plan.grade, "三年级");
        assert_eq!(plan.knowledge_point, "两位数加法");
        assert_eq!(plan.duration_minutes, 40);
        assert_eq!(plan.objectives_list()[0].label, "知识目标");
        assert_eq!(plan.key_points_list(), vec!["进位的处理"]);
        assert_eq!(plan.difficult_points_list(), vec!["连续进位"]);
        assert_eq!(plan.resources_list()[0].value, "计数棒");
        assert_eq!(plan.teaching_process_list()[0]["stage"], json!("导入"));
        assert_eq!(plan.evaluation, "课堂练习正确率");
        assert_eq!(plan.extension, "三位数加法预习");
    }

    #[tokio::test]
    async fn missing_evaluation_becomes_empty_text() {
        let mut response = full_response();
        response.as_object_mut().unwrap().remove("evaluation");
        let gateway = gateway_returning(Ok(response));

        let plan = LessonPlanAssembler::new(&gateway)
            .generate("teacher_1", params())
            .await
            .unwrap();
        assert_eq!(plan.evaluation, "");
        assert_eq!(plan.title, "两位数加法教学设计");
        assert!(!plan.key_points_list().is_empty());
    }

    #[tokio::test]
    async fn absent_list_fields_become_empty_sequences() {
        let gateway = gateway_returning(Ok(json!({ "title": "最小响应" })));

        let plan = LessonPlanAssembler::new(&gateway)
            .generate("teacher_1", params())
            .await
            .unwrap();
        assert!(plan.objectives_list().is_empty());
        assert!(plan.key_points_list().is_empty());
        assert!(plan.teaching_process_list().is_empty());
        assert_eq!(plan.evaluation, "");
        assert_eq!(plan.extension, "");
    }

    #[tokio::test]
    async fn wrong_shape_field_is_left_empty_not_fatal() {
        let mut response = full_response();
        response["objectives"] = json!("这不是一个列表");
        response["title"] = json!(42);
        let gateway = gateway_returning(Ok(response));

        let plan = LessonPlanAssembler::new(&gateway)
            .generate("teacher_1", params())
            .await
            .unwrap();
        assert!(plan.objectives_list().is_empty());
        assert_eq!(plan.title, "");
        // The rest of the plan still comes through.
        assert_eq!(plan.key_points_list(), vec!["进位的处理"]);
    }

    #[tokio::test]
    async fn transport_failure_propagates_gateway_unavailable() {
        let gateway = gateway_returning(Err(anyhow!("connection refused")));

        let result = LessonPlanAssembler::new(&gateway)
            .generate("teacher_1", params())
            .await;
        assert!(matches!(result, Err(ApiError::GatewayUnavailable(_))));
    }
}
