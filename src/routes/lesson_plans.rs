use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::LessonPlan;
use crate::services::{GenerateParams, LessonPlanAssembler};
use crate::types::{GenerateLessonPlanRequest, LessonPlanPayload, LessonPlanResponse};
use crate::AppState;

#[get("")]
async fn list_lesson_plans(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<impl Responder, ApiError> {
    let plans = LessonPlan::list_for_user(&app_state.pool, &authenticated_user.user_id).await?;
    let responses: Vec<LessonPlanResponse> = plans.iter().map(LessonPlanResponse::saved).collect();
    Ok(web::Json(responses))
}

#[get("/{plan_id}")]
async fn get_lesson_plan(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    plan_id: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let plan = LessonPlan::get_by_id(&app_state.pool, plan_id.into_inner())
        .await?
        .ok_or(ApiError::NotFound("教案"))?;
    plan.ensure_owner(&authenticated_user.user_id)?;
    Ok(web::Json(LessonPlanResponse::saved(&plan)))
}

/// Generates a plan via the single-agent service. The result is returned
/// unsaved; the client persists it with a separate save call. Upstream
/// failure surfaces as 502 rather than degrading silently.
#[post("/generate")]
async fn generate_lesson_plan(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    req_body: web::Json<GenerateLessonPlanRequest>,
) -> Result<impl Responder, ApiError> {
    let req_body = req_body.into_inner();
    let params = GenerateParams {
        grade: req_body.grade,
        module: req_body.module,
        knowledge_point: req_body.knowledge_point,
        duration_minutes: req_body.duration_minutes,
        preferences: req_body.preferences,
        custom_requirements: req_body.custom_requirements,
        use_knowledge_augmentation: req_body.use_knowledge_augmentation,
    };

    let assembler = LessonPlanAssembler::new(&app_state.gateway);
    let plan = assembler
        .generate(&authenticated_user.user_id, params)
        .await?;

    Ok(web::Json(LessonPlanResponse::unsaved(&plan)))
}

#[post("")]
async fn save_lesson_plan(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    req_body: web::Json<LessonPlanPayload>,
) -> Result<impl Responder, ApiError> {
    let mut plan = LessonPlan {
        user_id: authenticated_user.user_id.clone(),
        ..Default::default()
    };
    req_body.apply_to(&mut plan);

    let plan = plan.insert(&app_state.pool).await?;
    Ok(web::Json(LessonPlanResponse::saved(&plan)))
}

#[put("/{plan_id}")]
async fn update_lesson_plan(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    plan_id: web::Path<Uuid>,
    req_body: web::Json<LessonPlanPayload>,
) -> Result<impl Responder, ApiError> {
    let mut plan = LessonPlan::get_by_id(&app_state.pool, plan_id.into_inner())
        .await?
        .ok_or(ApiError::NotFound("教案"))?;
    plan.ensure_owner(&authenticated_user.user_id)?;

    req_body.apply_to(&mut plan);
    let plan = plan.update(&app_state.pool).await?;
    Ok(web::Json(LessonPlanResponse::saved(&plan)))
}

#[delete("/{plan_id}")]
async fn delete_lesson_plan(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    plan_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let plan = LessonPlan::get_by_id(&app_state.pool, plan_id.into_inner())
        .await?
        .ok_or(ApiError::NotFound("教案"))?;
    plan.ensure_owner(&authenticated_user.user_id)?;

    LessonPlan::delete(&app_state.pool, plan.id).await?;
    Ok(HttpResponse::NoContent().finish())
}
