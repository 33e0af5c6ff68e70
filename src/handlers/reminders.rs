//! Reminder fan-out

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::broadcast::{DeliveryDetail, DeliveryStatus};
use super::AppState;
use crate::bot::{replies, start_of_day};
use crate::db::{Store, StoreError};
use crate::line::Notifier;
use crate::models::*;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub report_id: Option<Uuid>,
    pub report_type: Option<String>,
    pub target_staff_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderSummary {
    pub total: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<DeliveryDetail>,
}

impl ReminderSummary {
    fn record(&mut self, detail: DeliveryDetail) {
        self.total += 1;
        match detail.status {
            DeliveryStatus::Sent => self.sent += 1,
            DeliveryStatus::Skipped => self.skipped += 1,
            DeliveryStatus::Failed => self.failed += 1,
        }
        self.details.push(detail);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("reportId or reportType is required")]
    MissingTarget,
    #[error("Unknown report type: {0}")]
    UnknownReportType(String),
    #[error("Report template not found")]
    TemplateNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Template name behind each shorthand report type
pub fn template_name_for(report_type: &str) -> Option<&'static str> {
    match report_type {
        "daily" => Some("日報"),
        "weekly" => Some("週報"),
        "monthly" => Some("月報"),
        "nepal_training" => Some("ネパール研修報告"),
        _ => None,
    }
}

async fn resolve_template(
    store: &dyn Store,
    request: &ReminderRequest,
) -> Result<ReportTemplate, ReminderError> {
    let template = match (request.report_id, request.report_type.as_deref()) {
        (Some(id), _) => store.find_template(id).await?,
        (None, Some(report_type)) => {
            let name = template_name_for(report_type)
                .ok_or_else(|| ReminderError::UnknownReportType(report_type.to_string()))?;
            store.find_template_by_name(name).await?
        }
        (None, None) => return Err(ReminderError::MissingTarget),
    };

    template
        .filter(|t| t.is_active)
        .ok_or(ReminderError::TemplateNotFound)
}

/// Push a reminder for one template to every active, linked staff member who
/// has not already completed it today.
pub async fn run_reminder(
    store: &dyn Store,
    notifier: &dyn Notifier,
    offset: FixedOffset,
    request: &ReminderRequest,
) -> Result<ReminderSummary, ReminderError> {
    let template = resolve_template(store, request).await?;

    let mut recipients = store.list_reachable_staff().await?;
    if let Some(target) = request.target_staff_id {
        recipients.retain(|s| s.id == target);
    }

    let today = start_of_day(Utc::now(), offset);
    let push = replies::reminder(&template);
    let mut summary = ReminderSummary::default();

    for staff in &recipients {
        let Some(line_user_id) = staff.line_user_id.as_deref() else {
            continue;
        };

        match store
            .latest_submission_since(staff.id, template.id, today)
            .await
        {
            Ok(Some(latest)) if latest.status == SubmissionStatus::Completed => {
                summary.record(DeliveryDetail::new(staff, DeliveryStatus::Skipped, None));
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    staff = %staff.staff_id,
                    "Failed to check today's submission: {}",
                    e
                );
                summary.record(DeliveryDetail::new(
                    staff,
                    DeliveryStatus::Failed,
                    Some(e.to_string()),
                ));
                continue;
            }
        }

        match notifier.push(line_user_id, std::slice::from_ref(&push)).await {
            Ok(()) => {
                let notification = NewNotification {
                    staff_id: staff.id,
                    kind: NotificationType::Reminder,
                    title: format!("{}のリマインダー", template.name),
                    message: push.body().to_string(),
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
                tracing::warn!(staff = %staff.staff_id, "Reminder push failed: {}", e);
                summary.record(DeliveryDetail::new(
                    staff,
                    DeliveryStatus::Failed,
                    Some(e.to_string()),
                ));
            }
        }
    }

    tracing::info!(
        template = %template.name,
        total = summary.total,
        sent = summary.sent,
        skipped = summary.skipped,
        failed = summary.failed,
        "Reminder fan-out finished"
    );
    Ok(summary)
}

pub(crate) fn error_response(error: ReminderError) -> Response {
    let status = match &error {
        ReminderError::MissingTarget | ReminderError::UnknownReportType(_) => {
            StatusCode::BAD_REQUEST
        }
        ReminderError::TemplateNotFound => StatusCode::NOT_FOUND,
        ReminderError::Store(e) => {
            tracing::error!("Reminder fan-out failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error("Failed to send reminders")),
            )
                .into_response();
        }
    };

    (status, Json(ApiResponse::<()>::error(error.to_string()))).into_response()
}

/// Send reminders for one template
pub async fn send_reminder(
    State(state): State<AppState>,
    Json(request): Json<ReminderRequest>,
) -> Response {
    match run_reminder(
        state.store.as_ref(),
        state.notifier.as_ref(),
        state.business_offset,
        &request,
    )
    .await
    {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({ "success": true, "summary": summary })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_staff, sample_template, MemoryStore, RecordingNotifier};
    use tokio_test::assert_ok;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn linked(code: &str, name: &str, line_user_id: &str) -> Staff {
        let mut staff = sample_staff(code, name);
        staff.line_user_id = Some(line_user_id.to_string());
        staff
    }

    fn submission(
        staff: &Staff,
        template: &ReportTemplate,
        outcome: SubmissionOutcome,
    ) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            staff_id: staff.id,
            report_id: template.id,
            status: outcome.status(),
            message: None,
            attachment_urls: Vec::new(),
            has_question: outcome.has_question(),
            question: outcome.question().map(str::to_string),
            admin_response: None,
            admin_responded_by: None,
            admin_responded_at: None,
            submitted_at: Utc::now(),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_completed_today_is_skipped() {
        let store = MemoryStore::default();
        let taro = linked("001", "Taro", "U1");
        let hanako = linked("002", "Hanako", "U2");
        let daily = sample_template("日報", true);
        store.add_staff(taro.clone());
        store.add_staff(hanako.clone());
        store.add_template(daily.clone());
        store.add_submission(submission(&taro, &daily, SubmissionOutcome::Completed));
        store.add_submission(submission(&hanako, &daily, SubmissionOutcome::Partial));
        let notifier = RecordingNotifier::default();

        let request = ReminderRequest {
            report_type: Some("daily".to_string()),
            ..ReminderRequest::default()
        };
        let summary = assert_ok!(run_reminder(&store, &notifier, jst(), &request).await);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.sent, 1);
        let taro_detail = summary
            .details
            .iter()
            .find(|d| d.staff_id == taro.id)
            .unwrap();
        assert_eq!(taro_detail.status, DeliveryStatus::Skipped);

        let pushes = notifier.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, "U2");
        assert_eq!(pushes[0].1[0].buttons().len(), 1);

        let notifications = store.notification_rows();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationType::Reminder);
        assert_eq!(notifications[0].staff_id, hanako.id);
    }

    #[tokio::test]
    async fn test_target_staff_filter() {
        let store = MemoryStore::default();
        let taro = linked("001", "Taro", "U1");
        store.add_staff(taro.clone());
        store.add_staff(linked("002", "Hanako", "U2"));
        let weekly = sample_template("週報", true);
        store.add_template(weekly.clone());
        let notifier = RecordingNotifier::default();

        let request = ReminderRequest {
            report_id: Some(weekly.id),
            target_staff_id: Some(taro.id),
            ..ReminderRequest::default()
        };
        let summary = assert_ok!(run_reminder(&store, &notifier, jst(), &request).await);

        assert_eq!(summary.total, 1);
        assert_eq!(notifier.pushes()[0].0, "U1");
    }

    #[tokio::test]
    async fn test_failed_push_is_counted() {
        let store = MemoryStore::default();
        store.add_staff(linked("001", "Taro", "U1"));
        store.add_staff(linked("002", "Hanako", "U2"));
        store.add_template(sample_template("月報", true));
        let notifier = RecordingNotifier::default();
        notifier.fail_push_to("U1");

        let request = ReminderRequest {
            report_type: Some("monthly".to_string()),
            ..ReminderRequest::default()
        };
        let summary = assert_ok!(run_reminder(&store, &notifier, jst(), &request).await);

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.notification_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let missing = run_reminder(&store, &notifier, jst(), &ReminderRequest::default()).await;
        assert!(matches!(missing, Err(ReminderError::MissingTarget)));

        let unknown = ReminderRequest {
            report_type: Some("yearly".to_string()),
            ..ReminderRequest::default()
        };
        let unknown = run_reminder(&store, &notifier, jst(), &unknown).await;
        assert!(matches!(unknown, Err(ReminderError::UnknownReportType(_))));

        let absent = ReminderRequest {
            report_type: Some("nepal_training".to_string()),
            ..ReminderRequest::default()
        };
        let absent = run_reminder(&store, &notifier, jst(), &absent).await;
        assert!(matches!(absent, Err(ReminderError::TemplateNotFound)));
    }

    #[tokio::test]
    async fn test_inactive_template_is_not_reminded() {
        let store = MemoryStore::default();
        store.add_staff(linked("001", "Taro", "U1"));
        let daily = sample_template("日報", false);
        store.add_template(daily.clone());
        let notifier = RecordingNotifier::default();

        let by_type = ReminderRequest {
            report_type: Some("daily".to_string()),
            ..ReminderRequest::default()
        };
        let by_type = run_reminder(&store, &notifier, jst(), &by_type).await;
        assert!(matches!(by_type, Err(ReminderError::TemplateNotFound)));

        let by_id = ReminderRequest {
            report_id: Some(daily.id),
            ..ReminderRequest::default()
        };
        let by_id = run_reminder(&store, &notifier, jst(), &by_id).await;
        assert!(matches!(by_id, Err(ReminderError::TemplateNotFound)));

        assert!(notifier.pushes().is_empty());
        assert!(store.notification_rows().is_empty());
    }

    #[test]
    fn test_report_type_names() {
        assert_eq!(template_name_for("daily"), Some("日報"));
        assert_eq!(template_name_for("nepal_training"), Some("ネパール研修報告"));
        assert_eq!(template_name_for("Daily"), None);
    }
}
