//! Data models for the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "staff_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Manager,
    Admin,
}

impl Role {
    /// Managers and admins may see team-wide summaries
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Staff => "スタッフ",
            Role::Manager => "マネージャー",
            Role::Admin => "管理者",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_frequency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Biweekly,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Completed,
    Partial,
    HasQuestion,
    ExtensionRequested,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 5] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Completed,
        SubmissionStatus::Partial,
        SubmissionStatus::HasQuestion,
        SubmissionStatus::ExtensionRequested,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Partial => "partial",
            SubmissionStatus::HasQuestion => "has_question",
            SubmissionStatus::ExtensionRequested => "extension_requested",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "⏳ 未提出",
            SubmissionStatus::Completed => "✅ 完了",
            SubmissionStatus::Partial => "🔶 一部完了",
            SubmissionStatus::HasQuestion => "❓ 質問あり",
            SubmissionStatus::ExtensionRequested => "⏰ 期限延長希望",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Reminder,
    Response,
    System,
    Achievement,
    Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Line,
    Email,
    Push,
    InApp,
}

// =============================================================================
// Staff
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    /// Short human-entered code used for chat linking
    pub staff_id: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub line_user_id: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaff {
    pub staff_id: String,
    pub name: String,
    pub role: Option<Role>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStaff {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub email: Option<String>,
    /// Clears the chat link so the person can re-link with their code
    #[serde(default)]
    pub unlink_line: bool,
}

// =============================================================================
// Report Template
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub frequency: Frequency,
    /// Free text such as "毎日 18:00まで"; never evaluated
    pub deadline: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportTemplate {
    pub fn display_name(&self) -> String {
        match self.emoji.as_deref() {
            Some(emoji) if !emoji.is_empty() => format!("{} {}", emoji, self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportTemplate {
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub frequency: Frequency,
    pub deadline: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReportTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub frequency: Option<Frequency>,
    pub deadline: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Submission
// =============================================================================

/// What a submitter reports. Writers go through this type so that
/// `status = has_question` always coincides with `has_question = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Completed,
    Partial,
    HasQuestion { question: String },
    ExtensionRequested,
}

impl SubmissionOutcome {
    pub fn status(&self) -> SubmissionStatus {
        match self {
            SubmissionOutcome::Completed => SubmissionStatus::Completed,
            SubmissionOutcome::Partial => SubmissionStatus::Partial,
            SubmissionOutcome::HasQuestion { .. } => SubmissionStatus::HasQuestion,
            SubmissionOutcome::ExtensionRequested => SubmissionStatus::ExtensionRequested,
        }
    }

    pub fn has_question(&self) -> bool {
        matches!(self, SubmissionOutcome::HasQuestion { .. })
    }

    pub fn question(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::HasQuestion { question } => Some(question),
            _ => None,
        }
    }

    /// Build an outcome from a bare status; `pending` has no outcome.
    pub fn from_status(status: SubmissionStatus, question: Option<String>) -> Option<Self> {
        match status {
            SubmissionStatus::Pending => None,
            SubmissionStatus::Completed => Some(SubmissionOutcome::Completed),
            SubmissionStatus::Partial => Some(SubmissionOutcome::Partial),
            SubmissionStatus::HasQuestion => Some(SubmissionOutcome::HasQuestion {
                question: question.unwrap_or_default(),
            }),
            SubmissionStatus::ExtensionRequested => Some(SubmissionOutcome::ExtensionRequested),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub report_id: Uuid,
    pub status: SubmissionStatus,
    pub message: Option<String>,
    pub attachment_urls: Vec<String>,
    pub has_question: bool,
    pub question: Option<String>,
    pub admin_response: Option<String>,
    pub admin_responded_by: Option<Uuid>,
    pub admin_responded_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn outcome(&self) -> Option<SubmissionOutcome> {
        SubmissionOutcome::from_status(self.status, self.question.clone())
    }
}

/// Everything needed to insert one submission row
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub staff_id: Uuid,
    pub report_id: Uuid,
    pub outcome: SubmissionOutcome,
    pub message: Option<String>,
    pub attachment_urls: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Dashboard submission form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubmission {
    pub staff_id: Uuid,
    pub report_id: Uuid,
    pub outcome: SubmissionOutcome,
    pub message: Option<String>,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Submission joined with its template name; the template may be gone
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubmissionWithReport {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub submission: Submission,
    pub report_name: Option<String>,
    pub report_emoji: Option<String>,
}

impl SubmissionWithReport {
    pub fn report_label(&self) -> String {
        match (self.report_emoji.as_deref(), self.report_name.as_deref()) {
            (Some(emoji), Some(name)) if !emoji.is_empty() => format!("{} {}", emoji, name),
            (_, Some(name)) => name.to_string(),
            (_, None) => "（削除された報告）".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionFilter {
    pub staff_id: Option<Uuid>,
    pub report_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminResponseRequest {
    pub response: String,
    pub responder_id: Option<Uuid>,
}

// =============================================================================
// Notification
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub staff_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub channel: NotificationChannel,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub staff_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub channel: NotificationChannel,
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub today_by_status: std::collections::HashMap<String, i64>,
    pub today_total: i64,
    pub open_questions: i64,
    pub active_staff: i64,
    pub linked_staff: i64,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
