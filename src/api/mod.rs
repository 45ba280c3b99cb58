use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::conflict::ConflictResult;
use crate::services::{EnrollmentOutcome, EnrollmentService, ScheduleService};
use crate::state::AppState;

#[derive(Deserialize)]
struct CohortQuery {
    course_code: String,
    year_level: i32,
}

#[derive(Deserialize)]
struct NewBlockRequest {
    course_code: String,
    year_level: i32,
    block_name: String,
}

#[derive(Deserialize)]
struct FinalizeRequest {
    choices: Vec<SectionChoice>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/check", post(check_schedule))
        .route("/schedules/teacher/{teacher_id}", get(teacher_schedules))
        .route("/sections", get(list_blocks).post(add_block))
        .route(
            "/sections/{course_code}/{year_level}/{block_name}",
            delete(remove_block),
        )
        .route("/enrollments", get(list_pending).post(create_pending))
        .route("/enrollments/{student_id}/finalize", post(finalize_enrollment))
        .route("/enrollments/{student_id}/reject", post(reject_enrollment))
        .route("/students/{student_id}/assignments", get(student_assignments))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_schedules(
    State(state): State<AppState>,
    Query(params): Query<CohortQuery>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let entries =
        repository::fetch_cohort_schedules(&state.db, &params.course_code, params.year_level)
            .await?;
    Ok(Json(entries))
}

async fn teacher_schedules(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let entries = repository::fetch_teacher_schedules(&state.db, &teacher_id).await?;
    Ok(Json(entries))
}

/// Advisory pre-check; a conflict comes back as a 200 with the colliding
/// entry so the form can show it before the operator tries to save.
async fn check_schedule(
    State(state): State<AppState>,
    Json(req): Json<NewScheduleRequest>,
) -> Result<Json<ConflictResult>, AppError> {
    let service = ScheduleService::new(state.db.clone());
    let result = service.check(req).await?;
    Ok(Json(result))
}

async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<NewScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleEntry>), AppError> {
    let service = ScheduleService::new(state.db.clone());
    let entry = service.create(req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_blocks(
    State(state): State<AppState>,
    Query(params): Query<CohortQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let blocks =
        repository::list_section_blocks(&state.db, &params.course_code, params.year_level).await?;
    Ok(Json(blocks))
}

async fn add_block(
    State(state): State<AppState>,
    Json(req): Json<NewBlockRequest>,
) -> Result<StatusCode, AppError> {
    if req.block_name.trim().is_empty() {
        return Err(AppError::Validation("block_name must not be empty".to_string()));
    }
    repository::add_section_block(&state.db, &req.course_code, req.year_level, &req.block_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_block(
    State(state): State<AppState>,
    Path((course_code, year_level, block_name)): Path<(String, i32, String)>,
) -> Result<StatusCode, AppError> {
    let ok =
        repository::remove_section_block(&state.db, &course_code, year_level, &block_name).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingEnrollment>>, AppError> {
    let pending = repository::list_pending_enrollments(&state.db).await?;
    Ok(Json(pending))
}

async fn create_pending(
    State(state): State<AppState>,
    Json(req): Json<NewEnrollmentRequest>,
) -> Result<(StatusCode, Json<PendingEnrollment>), AppError> {
    if req.student_id.trim().is_empty() || req.email.trim().is_empty() {
        return Err(AppError::Validation(
            "student_id and email must not be empty".to_string(),
        ));
    }
    if repository::fetch_pending_enrollment(&state.db, &req.student_id)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(format!(
            "student {} already has a pending enrollment",
            req.student_id
        )));
    }

    let pending = PendingEnrollment {
        student_id: req.student_id,
        student_name: req.student_name,
        email: req.email,
        course_code: req.course_code,
        year_level: req.year_level,
        requested_at: chrono::Utc::now().to_rfc3339(),
    };
    repository::insert_pending_enrollment(&state.db, &pending).await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

async fn finalize_enrollment(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> Result<Json<EnrollmentOutcome>, AppError> {
    let service = EnrollmentService::new(state.db.clone());
    let outcome = service.finalize(&student_id, &req.choices).await?;

    // Fire and forget: delivery failure is logged, never surfaced, and
    // rolls nothing back.
    let notifier = state.notifier.clone();
    let email = outcome.email.clone();
    let sid = outcome.student_id.clone();
    tokio::spawn(async move {
        let password = Uuid::new_v4().simple().to_string();
        if let Err(err) = notifier.enrollment_approved(&email, &sid, &password).await {
            warn!("approved notification failed for {sid}: {err}");
        }
    });

    Ok(Json(outcome))
}

async fn reject_enrollment(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let service = EnrollmentService::new(state.db.clone());
    let pending = service.reject(&student_id).await?;

    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        if let Err(err) = notifier.enrollment_rejected(&pending.email).await {
            warn!(
                "rejected notification failed for {}: {err}",
                pending.student_id
            );
        }
    });

    Ok(StatusCode::NO_CONTENT)
}

async fn student_assignments(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<SubjectAssignment>>, AppError> {
    let assignments = repository::fetch_assignments(&state.db, &student_id).await?;
    Ok(Json(assignments))
}
