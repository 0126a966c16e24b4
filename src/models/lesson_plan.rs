use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::{self, FreeFormEntry, LabeledEntry};
use crate::error::ApiError;

/// A lesson plan. The five list-typed fields (`objectives`, `key_points`,
/// `difficult_points`, `resources`, `teaching_process`) are structured data
/// persisted as encoded text; use the `*_list` accessors to work with the
/// typed form.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LessonPlan {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub grade: String,
    pub module: String,
    pub knowledge_point: String,
    pub duration_minutes: i32,
    pub objectives: String,
    pub key_points: String,
    pub difficult_points: String,
    pub resources: String,
    pub teaching_process: String,
    pub evaluation: String,
    pub extension: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for LessonPlan {
    fn default() -> Self {
        LessonPlan {
            id: Uuid::new_v4(),
            user_id: String::new(),
            title: String::new(),
            grade: String::new(),
            module: String::new(),
            knowledge_point: String::new(),
            duration_minutes: 0,
            objectives: String::new(),
            key_points: String::new(),
            difficult_points: String::new(),
            resources: String::new(),
            teaching_process: String::new(),
            evaluation: String::new(),
            extension: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// Decodes a persisted list field, downgrading corrupt text to an empty list
/// with a logged warning so reads stay total.
fn decode_field<T: serde::de::DeserializeOwned>(field: &str, text: &str) -> Vec<T> {
    let decoded = codec::decode::<T>(text);
    if let Some(warning) = decoded.warning {
        warn!("Ignoring corrupt {} field in lesson plan: {}", field, warning);
    }
    decoded.items
}

impl LessonPlan {
    pub fn objectives_list(&self) -> Vec<LabeledEntry> {
        decode_field("objectives", &self.objectives)
    }

    pub fn set_objectives_list(&mut self, objectives: &[LabeledEntry]) {
        self.objectives = codec::encode(objectives);
    }

    pub fn key_points_list(&self) -> Vec<String> {
        decode_field("key_points", &self.key_points)
    }

    pub fn set_key_points_list(&mut self, key_points: &[String]) {
        self.key_points = codec::encode(key_points);
    }

    pub fn difficult_points_list(&self) -> Vec<String> {
        decode_field("difficult_points", &self.difficult_points)
    }

    pub fn set_difficult_points_list(&mut self, difficult_points: &[String]) {
        self.difficult_points = codec::encode(difficult_points);
    }

    pub fn resources_list(&self) -> Vec<LabeledEntry> {
        decode_field("resources", &self.resources)
    }

    pub fn set_resources_list(&mut self, resources: &[LabeledEntry]) {
        self.resources = codec::encode(resources);
    }

    pub fn teaching_process_list(&self) -> Vec<FreeFormEntry> {
        decode_field("teaching_process", &self.teaching_process)
    }

    pub fn set_teaching_process_list(&mut self, teaching_process: &[FreeFormEntry]) {
        self.teaching_process = codec::encode(teaching_process);
    }

    pub fn ensure_owner(&self, user_id: &str) -> Result<(), ApiError> {
        if self.user_id != user_id {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self, ApiError> {
        let plan = sqlx::query_as::<_, LessonPlan>(
            r#"
            INSERT INTO lesson_plans (id, user_id, title, grade, module, knowledge_point,
                duration_minutes, objectives, key_points, difficult_points, resources,
                teaching_process, evaluation, extension, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.user_id)
        .bind(&self.title)
        .bind(&self.grade)
        .bind(&self.module)
        .bind(&self.knowledge_point)
        .bind(self.duration_minutes)
        .bind(&self.objectives)
        .bind(&self.key_points)
        .bind(&self.difficult_points)
        .bind(&self.resources)
        .bind(&self.teaching_process)
        .bind(&self.evaluation)
        .bind(&self.extension)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;

        debug!("Lesson plan created: {}", plan.id);
        Ok(plan)
    }

    pub async fn update(&self, pool: &PgPool) -> Result<Self, ApiError> {
        let plan = sqlx::query_as::<_, LessonPlan>(
            r#"
            UPDATE lesson_plans
            SET title = $2, grade = $3, module = $4, knowledge_point = $5,
                duration_minutes = $6, objectives = $7, key_points = $8,
                difficult_points = $9, resources = $10, teaching_process = $11,
                evaluation = $12, extension = $13, updated_at = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.title)
        .bind(&self.grade)
        .bind(&self.module)
        .bind(&self.knowledge_point)
        .bind(self.duration_minutes)
        .bind(&self.objectives)
        .bind(&self.key_points)
        .bind(&self.difficult_points)
        .bind(&self.resources)
        .bind(&self.teaching_process)
        .bind(&self.evaluation)
        .bind(&self.extension)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(plan)
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, ApiError> {
        let plan = sqlx::query_as::<_, LessonPlan>(
            r#"
            SELECT * FROM lesson_plans
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }

    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Self>, ApiError> {
        let plans = sqlx::query_as::<_, LessonPlan>(
            r#"
            SELECT * FROM lesson_plans
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(plans)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            DELETE FROM lesson_plans
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
