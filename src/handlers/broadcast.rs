//! Administrative push actions: system broadcasts and question responses

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::reminders::{self, ReminderRequest};
use super::AppState;
use crate::bot::replies;
use crate::db::{Store, StoreError};
use crate::line::Notifier;
use crate::models::*;
use crate::validation::validate_admin_response;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Administrative action posted to the webhook endpoint without a signature
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminAction {
    SendSystemNotification {
        title: String,
        message: String,
    },
    SendReminder(ReminderRequest),
    SendQuestionResponse {
        #[serde(alias = "submissionId")]
        submission_id: Uuid,
        response: String,
        #[serde(default, alias = "responderId")]
        responder_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

/// Per-recipient outcome of a push
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryDetail {
    pub staff_id: Uuid,
    pub staff_code: String,
    pub name: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryDetail {
    pub fn new(staff: &Staff, status: DeliveryStatus, error: Option<String>) -> Self {
        Self {
            staff_id: staff.id,
            staff_code: staff.staff_id.clone(),
            name: staff.name.clone(),
            status,
            error,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastSummary {
    pub sent: usize,
    pub failed: usize,
    pub details: Vec<DeliveryDetail>,
}

impl BroadcastSummary {
    fn record(&mut self, detail: DeliveryDetail) {
        match detail.status {
            DeliveryStatus::Sent => self.sent += 1,
            DeliveryStatus::Failed => self.failed += 1,
            DeliveryStatus::Skipped => {}
        }
        self.details.push(detail);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionResponseError {
    #[error("Submission not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// Actions
// =============================================================================

/// Push one message to every active, linked staff member. A failed push is
/// recorded and the loop moves on.
pub async fn send_system_notification(
    store: &dyn Store,
    notifier: &dyn Notifier,
    title: &str,
    message: &str,
) -> Result<BroadcastSummary, StoreError> {
    let recipients = store.list_reachable_staff().await?;
    let push = replies::system_notification(title, message);
    let mut summary = BroadcastSummary::default();

    for staff in &recipients {
        let Some(line_user_id) = staff.line_user_id.as_deref() else {
            continue;
        };

        match notifier.push(line_user_id, std::slice::from_ref(&push)).await {
            Ok(()) => {
                let notification = NewNotification {
                    staff_id: staff.id,
                    kind: NotificationType::System,
                    title: title.to_string(),
                    message: message.to_string(),
                    channel: NotificationChannel::Line,
                };
                if let Err(e) = store.insert_notification(&notification).await {
                    tracing::error!(
                        staff = %staff.staff_id,
                        "Failed to record notification: {}",
                        e
                    );
                }
                summary.record(DeliveryDetail::new(staff, DeliveryStatus::Sent, None));
            }
            Err(e) => {
                tracing::warn!(staff = %staff.staff_id, "System notification push failed: {}", e);
                summary.record(DeliveryDetail::new(
                    staff,
                    DeliveryStatus::Failed,
                    Some(e.to_string()),
                ));
            }
        }
    }

    tracing::info!(
        sent = summary.sent,
        failed = summary.failed,
        "System notification broadcast finished"
    );
    Ok(summary)
}

/// Record an admin answer on a submission and forward it to the submitter
pub async fn send_question_response(
    store: &dyn Store,
    notifier: &dyn Notifier,
    submission_id: Uuid,
    response: &str,
    responder_id: Option<Uuid>,
) -> Result<BroadcastSummary, QuestionResponseError> {
    let submission = store
        .record_admin_response(submission_id, response, responder_id, Utc::now())
        .await?
        .ok_or(QuestionResponseError::NotFound)?;

    let mut summary = BroadcastSummary::default();
    let Some(staff) = store.find_staff(submission.staff_id).await? else {
        tracing::warn!(submission = %submission.id, "Submitter no longer exists");
        return Ok(summary);
    };

    let report_label = match store.find_template(submission.report_id).await? {
        Some(template) => template.display_name(),
        None => "（削除された報告）".to_string(),
    };
    let title = format!("質問への回答: {}", report_label);

    let mut channel = NotificationChannel::Line;
    match staff.line_user_id.as_deref() {
        Some(line_user_id) => {
            let push = replies::question_response(
                &report_label,
                submission.question.as_deref(),
                response,
            );
            match notifier.push(line_user_id, &[push]).await {
                Ok(()) => summary.record(DeliveryDetail::new(&staff, DeliveryStatus::Sent, None)),
                Err(e) => {
                    tracing::warn!(staff = %staff.staff_id, "Question response push failed: {}", e);
                    summary.record(DeliveryDetail::new(
                        &staff,
                        DeliveryStatus::Failed,
                        Some(e.to_string()),
                    ));
                    return Ok(summary);
                }
            }
        }
        None => {
            // Unlinked submitters still see the answer in the dashboard
            channel = NotificationChannel::InApp;
            summary.record(DeliveryDetail::new(
                &staff,
                DeliveryStatus::Skipped,
                Some("LINE not linked".to_string()),
            ));
        }
    }

    let notification = NewNotification {
        staff_id: staff.id,
        kind: NotificationType::Response,
        title,
        message: response.to_string(),
        channel,
    };
    if let Err(e) = store.insert_notification(&notification).await {
        tracing::error!(staff = %staff.staff_id, "Failed to record notification: {}", e);
    }

    Ok(summary)
}

// =============================================================================
// Dispatch
// =============================================================================

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

/// Run an administrative action from its raw JSON body
pub async fn dispatch_action(
    state: &AppState,
    body: serde_json::Value,
) -> axum::response::Response {
    let action: AdminAction = match serde_json::from_value(body) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("Rejected admin action: {}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid action: {}", e));
        }
    };

    let store = state.store.as_ref();
    let notifier = state.notifier.as_ref();

    match action {
        AdminAction::SendSystemNotification { title, message } => {
            if title.trim().is_empty() || message.trim().is_empty() {
                return error_response(StatusCode::BAD_REQUEST, "title and message are required");
            }
            match send_system_notification(store, notifier, &title, &message).await {
                Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
                Err(e) => {
                    tracing::error!("Broadcast failed: {}", e);
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load recipients")
                }
            }
        }
        AdminAction::SendReminder(request) => {
            match reminders::run_reminder(store, notifier, state.business_offset, &request).await {
                Ok(summary) => (
                    StatusCode::OK,
                    Json(json!({
                        "summary": {
                            "sent": summary.sent,
                            "skipped": summary.skipped,
                            "failed": summary.failed,
                        },
                        "details": summary.details,
                    })),
                )
                    .into_response(),
                Err(e) => reminders::error_response(e),
            }
        }
        AdminAction::SendQuestionResponse {
            submission_id,
            response,
            responder_id,
        } => {
            if let Err(e) = validate_admin_response(&response) {
                return error_response(StatusCode::BAD_REQUEST, e.to_string());
            }
            match send_question_response(store, notifier, submission_id, &response, responder_id)
                .await
            {
                Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
                Err(QuestionResponseError::NotFound) => {
                    error_response(StatusCode::NOT_FOUND, "Submission not found")
                }
                Err(QuestionResponseError::Store(e)) => {
                    tracing::error!("Failed to record admin response: {}", e);
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to record response")
                }
            }
        }
    }
}
