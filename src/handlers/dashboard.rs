//! Dashboard API handlers

use crate::bot::start_of_day;
use crate::db::StoreError;
use crate::models::*;
use crate::validation::{
    validate_admin_response, validate_create_staff, validate_create_submission,
    validate_create_template,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::broadcast::{self, BroadcastSummary, QuestionResponseError};
use super::AppState;

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListTemplatesQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub staff_id: Option<Uuid>,
    pub limit: Option<i64>,
}

fn store_failure<T>(context: &str, error: StoreError) -> (StatusCode, Json<ApiResponse<T>>) {
    match error {
        StoreError::Conflict(detail) => (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(format!("{}: {}", context, detail))),
        ),
        e => {
            tracing::error!("{}: {}", context, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(context)),
            )
        }
    }
}

fn bad_request<T>(message: impl Into<String>) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

fn not_found<T>(message: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error(message)))
}

// =============================================================================
// Health
// =============================================================================

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

// =============================================================================
// Staff
// =============================================================================

pub async fn list_staff(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_staff().await {
        Ok(staff) => (StatusCode::OK, Json(ApiResponse::success(staff))),
        Err(e) => store_failure("Failed to list staff", e),
    }
}

pub async fn create_staff(
    State(state): State<AppState>,
    Json(input): Json<CreateStaff>,
) -> impl IntoResponse {
    if let Err(e) = validate_create_staff(&input) {
        return bad_request::<Staff>(e.to_string());
    }

    match state.store.create_staff(&input).await {
        Ok(staff) => {
            tracing::info!(staff = %staff.staff_id, "Created staff member");
            (StatusCode::CREATED, Json(ApiResponse::success(staff)))
        }
        Err(e) => store_failure("Failed to create staff", e),
    }
}

pub async fn update_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStaff>,
) -> impl IntoResponse {
    if matches!(input.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return bad_request::<Staff>("Field 'name' is required");
    }

    match state.store.update_staff(id, &input).await {
        Ok(Some(staff)) => (StatusCode::OK, Json(ApiResponse::success(staff))),
        Ok(None) => not_found("Staff not found"),
        Err(e) => store_failure("Failed to update staff", e),
    }
}

// =============================================================================
// Report Templates
// =============================================================================

pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> impl IntoResponse {
    match state.store.list_templates(query.active_only).await {
        Ok(templates) => (StatusCode::OK, Json(ApiResponse::success(templates))),
        Err(e) => store_failure("Failed to list templates", e),
    }
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateReportTemplate>,
) -> impl IntoResponse {
    if let Err(e) = validate_create_template(&input) {
        return bad_request::<ReportTemplate>(e.to_string());
    }

    match state.store.create_template(&input).await {
        Ok(template) => (StatusCode::CREATED, Json(ApiResponse::success(template))),
        Err(e) => store_failure("Failed to create template", e),
    }
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReportTemplate>,
) -> impl IntoResponse {
    if matches!(input.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return bad_request::<ReportTemplate>("Field 'name' is required");
    }

    match state.store.update_template(id, &input).await {
        Ok(Some(template)) => (StatusCode::OK, Json(ApiResponse::success(template))),
        Ok(None) => not_found("Template not found"),
        Err(e) => store_failure("Failed to update template", e),
    }
}

/// Delete a template; past submissions keep pointing at the removed id
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.delete_template(id).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Ok(false) => not_found("Template not found"),
        Err(e) => store_failure("Failed to delete template", e),
    }
}

// =============================================================================
// Submissions
// =============================================================================

pub async fn list_submissions(
    State(state): State<AppState>,
    Query(mut filter): Query<SubmissionFilter>,
) -> impl IntoResponse {
    filter.limit = Some(filter.limit.unwrap_or(50).clamp(1, 200));

    match state.store.list_submissions(&filter).await {
        Ok(rows) => (StatusCode::OK, Json(ApiResponse::success(rows))),
        Err(e) => store_failure("Failed to list submissions", e),
    }
}

/// Dashboard submission form
pub async fn create_submission(
    State(state): State<AppState>,
    Json(input): Json<CreateSubmission>,
) -> impl IntoResponse {
    if let Err(e) = validate_create_submission(&input) {
        return bad_request::<Submission>(e.to_string());
    }

    match state.store.find_staff(input.staff_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found::<Submission>("Staff not found"),
        Err(e) => return store_failure::<Submission>("Failed to create submission", e),
    }

    let submission = NewSubmission {
        staff_id: input.staff_id,
        report_id: input.report_id,
        outcome: input.outcome,
        message: input.message,
        attachment_urls: input.attachment_urls,
        submitted_at: Utc::now(),
        due_date: input.due_date,
    };

    match state.store.insert_submission(&submission).await {
        Ok(submission) => {
            tracing::info!(
                submission = %submission.id,
                status = submission.status.as_str(),
                "Submission created from dashboard"
            );
            (StatusCode::CREATED, Json(ApiResponse::success(submission)))
        }
        Err(e) => store_failure("Failed to create submission", e),
    }
}

/// Answer a submitter's question and forward the answer over LINE
pub async fn respond_to_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AdminResponseRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_admin_response(&input.response) {
        return bad_request::<BroadcastSummary>(e.to_string());
    }

    match broadcast::send_question_response(
        state.store.as_ref(),
        state.notifier.as_ref(),
        id,
        &input.response,
        input.responder_id,
    )
    .await
    {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::success(summary))),
        Err(QuestionResponseError::NotFound) => not_found("Submission not found"),
        Err(QuestionResponseError::Store(e)) => store_failure("Failed to record response", e),
    }
}

// =============================================================================
// Notifications
// =============================================================================

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    match state.store.list_notifications(query.staff_id, limit).await {
        Ok(rows) => (StatusCode::OK, Json(ApiResponse::success(rows))),
        Err(e) => store_failure("Failed to list notifications", e),
    }
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.mark_notification_read(id).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Ok(false) => not_found("Notification not found"),
        Err(e) => store_failure("Failed to update notification", e),
    }
}

// =============================================================================
// Dashboard
// =============================================================================

pub async fn get_dashboard_stats(State(state): State<AppState>) -> impl IntoResponse {
    let since = start_of_day(Utc::now(), state.business_offset);

    let counts = match state.store.count_submissions_since(since).await {
        Ok(counts) => counts,
        Err(e) => return store_failure::<DashboardStats>("Failed to load dashboard", e),
    };
    let open_questions = match state.store.count_open_questions().await {
        Ok(count) => count,
        Err(e) => return store_failure::<DashboardStats>("Failed to load dashboard", e),
    };
    let staff = match state.store.list_staff().await {
        Ok(staff) => staff,
        Err(e) => return store_failure::<DashboardStats>("Failed to load dashboard", e),
    };

    let active: Vec<&Staff> = staff.iter().filter(|s| s.is_active).collect();
    let stats = DashboardStats {
        today_total: counts.iter().map(|(_, count)| count).sum(),
        today_by_status: counts
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect(),
        open_questions,
        active_staff: active.len() as i64,
        linked_staff: active.iter().filter(|s| s.line_user_id.is_some()).count() as i64,
    };

    (StatusCode::OK, Json(ApiResponse::success(stats)))
}
