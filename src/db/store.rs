//! Persistent store port
//!
//! The bot router, the broadcast handlers and the dashboard API only talk to
//! the database through [`Store`]. Production wires in [`super::PgStore`];
//! tests use an in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CreateReportTemplate, CreateStaff, NewNotification, NewSubmission, Notification,
    ReportTemplate, Staff, Submission, SubmissionFilter, SubmissionStatus, SubmissionWithReport,
    UpdateReportTemplate, UpdateStaff,
};

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record conflicts with an existing row: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // -------------------------------------------------------------------------
    // Staff
    // -------------------------------------------------------------------------

    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError>;

    async fn find_staff_by_line_user(&self, line_user_id: &str)
        -> Result<Option<Staff>, StoreError>;

    /// Look up an active staff member by their short code
    async fn find_active_staff_by_code(&self, staff_code: &str)
        -> Result<Option<Staff>, StoreError>;

    /// Attach a chat account to a staff row that has none yet.
    ///
    /// Returns `None` when the row is already linked. A chat account that is
    /// attached to another row surfaces as [`StoreError::Conflict`].
    async fn link_line_user(
        &self,
        staff_id: Uuid,
        line_user_id: &str,
    ) -> Result<Option<Staff>, StoreError>;

    async fn list_staff(&self) -> Result<Vec<Staff>, StoreError>;

    /// Active staff with a chat account, ordered by staff code
    async fn list_reachable_staff(&self) -> Result<Vec<Staff>, StoreError>;

    async fn create_staff(&self, input: &CreateStaff) -> Result<Staff, StoreError>;

    async fn update_staff(&self, id: Uuid, input: &UpdateStaff)
        -> Result<Option<Staff>, StoreError>;

    // -------------------------------------------------------------------------
    // Report templates
    // -------------------------------------------------------------------------

    async fn list_templates(&self, active_only: bool) -> Result<Vec<ReportTemplate>, StoreError>;

    async fn find_template(&self, id: Uuid) -> Result<Option<ReportTemplate>, StoreError>;

    async fn find_template_by_name(&self, name: &str)
        -> Result<Option<ReportTemplate>, StoreError>;

    async fn create_template(
        &self,
        input: &CreateReportTemplate,
    ) -> Result<ReportTemplate, StoreError>;

    async fn update_template(
        &self,
        id: Uuid,
        input: &UpdateReportTemplate,
    ) -> Result<Option<ReportTemplate>, StoreError>;

    /// Hard delete; submissions keep their dangling `report_id`
    async fn delete_template(&self, id: Uuid) -> Result<bool, StoreError>;

    // -------------------------------------------------------------------------
    // Submissions
    // -------------------------------------------------------------------------

    async fn insert_submission(&self, input: &NewSubmission) -> Result<Submission, StoreError>;

    async fn find_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    /// Newest first, joined with the template name when it still exists
    async fn recent_submissions(
        &self,
        staff_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubmissionWithReport>, StoreError>;

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionWithReport>, StoreError>;

    /// Most recent submission by `staff_id` for `report_id` at or after `since`
    async fn latest_submission_since(
        &self,
        staff_id: Uuid,
        report_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<Submission>, StoreError>;

    /// Attach an admin response; the status is left untouched
    async fn record_admin_response(
        &self,
        submission_id: Uuid,
        response: &str,
        responder_id: Option<Uuid>,
        responded_at: DateTime<Utc>,
    ) -> Result<Option<Submission>, StoreError>;

    async fn count_submissions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(SubmissionStatus, i64)>, StoreError>;

    /// Questions without an admin response yet
    async fn count_open_questions(&self) -> Result<i64, StoreError>;

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, StoreError>;

    async fn list_notifications(
        &self,
        staff_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool, StoreError>;
}
