use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::codec::{FreeFormEntry, LabeledEntry};
use crate::models::LessonPlan;

#[derive(Deserialize, ToSchema)]
pub struct GenerateLessonPlanRequest {
    pub grade: String,
    pub module: String,
    pub knowledge_point: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub custom_requirements: String,
    #[serde(default)]
    pub use_knowledge_augmentation: bool,
}

/// Client-supplied plan content, used by both save and update.
#[derive(Deserialize, ToSchema)]
pub struct LessonPlanPayload {
    pub title: String,
    pub grade: String,
    pub module: String,
    pub knowledge_point: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub objectives: Vec<LabeledEntry>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub difficult_points: Vec<String>,
    #[serde(default)]
    pub resources: Vec<LabeledEntry>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub teaching_process: Vec<FreeFormEntry>,
    #[serde(default)]
    pub evaluation: String,
    #[serde(default)]
    pub extension: String,
}

impl LessonPlanPayload {
    /// Writes the payload onto a plan, encoding the list fields for storage.
    pub fn apply_to(&self, plan: &mut LessonPlan) {
        plan.title = self.title.clone();
        plan.grade = self.grade.clone();
        plan.module = self.module.clone();
        plan.knowledge_point = self.knowledge_point.clone();
        plan.duration_minutes = self.duration_minutes;
        plan.set_objectives_list(&self.objectives);
        plan.set_key_points_list(&self.key_points);
        plan.set_difficult_points_list(&self.difficult_points);
        plan.set_resources_list(&self.resources);
        plan.set_teaching_process_list(&self.teaching_process);
        plan.evaluation = self.evaluation.clone();
        plan.extension = self.extension.clone();
    }
}

/// A lesson plan with its list fields in decoded form. `id` is absent for
/// generated-but-unsaved plans.
#[derive(Serialize, ToSchema)]
pub struct LessonPlanResponse {
    pub id: Option<Uuid>,
    pub title: String,
    pub grade: String,
    pub module: String,
    pub knowledge_point: String,
    pub duration_minutes: i32,
    pub objectives: Vec<LabeledEntry>,
    pub key_points: Vec<String>,
    pub difficult_points: Vec<String>,
    pub resources: Vec<LabeledEntry>,
    #[schema(value_type = Vec<Object>)]
    pub teaching_process: Vec<FreeFormEntry>,
    pub evaluation: String,
    pub extension: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LessonPlanResponse {
    pub fn saved(plan: &LessonPlan) -> Self {
        Self::build(plan, Some(plan.id))
    }

    pub fn unsaved(plan: &LessonPlan) -> Self {
        Self::build(plan, None)
    }

    fn build(plan: &LessonPlan, id: Option<Uuid>) -> Self {
        LessonPlanResponse {
            id,
            title: plan.title.clone(),
            grade: plan.grade.clone(),
            module: plan.module.clone(),
            knowledge_point: plan.knowledge_point.clone(),
            duration_minutes: plan.duration_minutes,
            objectives: plan.objectives_list(),
            key_points: plan.key_points_list(),
            difficult_points: plan.difficult_points_list(),
            resources: plan.resources_list(),
            teaching_process: plan.teaching_process_list(),
            evaluation: plan.evaluation.clone(),
            extension: plan.extension.clone(),
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}
