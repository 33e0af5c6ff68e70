//! Postgres-backed [`Store`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{Store, StoreError};
use crate::models::*;

/// Shared SELECT for submissions joined with their (possibly deleted) template
const SUBMISSION_WITH_REPORT: &str = r#"
    SELECT s.*, t.name AS report_name, t.emoji AS report_emoji
    FROM submissions s
    LEFT JOIN report_templates t ON t.id = s.report_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn find_staff_by_line_user(
        &self,
        line_user_id: &str,
    ) -> Result<Option<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE line_user_id = $1")
            .bind(line_user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn find_active_staff_by_code(
        &self,
        staff_code: &str,
    ) -> Result<Option<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT * FROM staff WHERE staff_id = $1 AND is_active = true",
        )
        .bind(staff_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn link_line_user(
        &self,
        staff_id: Uuid,
        line_user_id: &str,
    ) -> Result<Option<Staff>, StoreError> {
        // Conditional update so a concurrent link cannot overwrite another account
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            UPDATE staff
            SET line_user_id = $1, updated_at = NOW()
            WHERE id = $2 AND line_user_id IS NULL
            RETURNING *
            "#,
        )
        .bind(line_user_id)
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn list_staff(&self) -> Result<Vec<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff ORDER BY staff_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn list_reachable_staff(&self) -> Result<Vec<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT * FROM staff
            WHERE is_active = true AND line_user_id IS NOT NULL
            ORDER BY staff_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn create_staff(&self, input: &CreateStaff) -> Result<Staff, StoreError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (staff_id, name, role, email)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.staff_id)
        .bind(input.name.trim())
        .bind(input.role.unwrap_or(Role::Staff))
        .bind(&input.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn update_staff(
        &self,
        id: Uuid,
        input: &UpdateStaff,
    ) -> Result<Option<Staff>, StoreError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            UPDATE staff SET
                name = COALESCE($1, name),
                role = COALESCE($2, role),
                is_active = COALESCE($3, is_active),
                email = COALESCE($4, email),
                line_user_id = CASE WHEN $5 THEN NULL ELSE line_user_id END,
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(input.role)
        .bind(input.is_active)
        .bind(&input.email)
        .bind(input.unlink_line)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<ReportTemplate>, StoreError> {
        let templates = sqlx::query_as::<_, ReportTemplate>(
            r#"
            SELECT * FROM report_templates
            WHERE ($1 = false OR is_active = true)
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    async fn find_template(&self, id: Uuid) -> Result<Option<ReportTemplate>, StoreError> {
        let template =
            sqlx::query_as::<_, ReportTemplate>("SELECT * FROM report_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(template)
    }

    async fn find_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ReportTemplate>, StoreError> {
        let template = sqlx::query_as::<_, ReportTemplate>(
            r#"
            SELECT * FROM report_templates
            WHERE name = $1
            ORDER BY is_active DESC, created_at
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }

    async fn create_template(
        &self,
        input: &CreateReportTemplate,
    ) -> Result<ReportTemplate, StoreError> {
        let template = sqlx::query_as::<_, ReportTemplate>(
            r#"
            INSERT INTO report_templates (name, description, emoji, frequency, deadline, category, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.emoji)
        .bind(input.frequency)
        .bind(&input.deadline)
        .bind(&input.category)
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;
        Ok(template)
    }

    async fn update_template(
        &self,
        id: Uuid,
        input: &UpdateReportTemplate,
    ) -> Result<Option<ReportTemplate>, StoreError> {
        let template = sqlx::query_as::<_, ReportTemplate>(
            r#"
            UPDATE report_templates SET
                name = COALESCE($1, name),
                description = COALESCE($2, description),
                emoji = COALESCE($3, emoji),
                frequency = COALESCE($4, frequency),
                deadline = COALESCE($5, deadline),
                category = COALESCE($6, category),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.emoji)
        .bind(input.frequency)
        .bind(&input.deadline)
        .bind(&input.category)
        .bind(input.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM report_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_submission(&self, input: &NewSubmission) -> Result<Submission, StoreError> {
        let outcome = &input.outcome;
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions
                (staff_id, report_id, status, has_question, question, message, attachment_urls, submitted_at, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(input.staff_id)
        .bind(input.report_id)
        .bind(outcome.status())
        .bind(outcome.has_question())
        .bind(outcome.question())
        .bind(&input.message)
        .bind(&input.attachment_urls)
        .bind(input.submitted_at)
        .bind(input.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn find_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let submission = sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(submission)
    }

    async fn recent_submissions(
        &self,
        staff_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubmissionWithReport>, StoreError> {
        let query = format!(
            "{} WHERE s.staff_id = $1 ORDER BY s.submitted_at DESC LIMIT $2",
            SUBMISSION_WITH_REPORT
        );
        let rows = sqlx::query_as::<_, SubmissionWithReport>(&query)
            .bind(staff_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionWithReport>, StoreError> {
        let query = format!(
            r#"{}
            WHERE ($1::uuid IS NULL OR s.staff_id = $1)
              AND ($2::uuid IS NULL OR s.report_id = $2)
              AND ($3::submission_status IS NULL OR s.status = $3)
            ORDER BY s.submitted_at DESC
            LIMIT $4
            "#,
            SUBMISSION_WITH_REPORT
        );
        let rows = sqlx::query_as::<_, SubmissionWithReport>(&query)
            .bind(filter.staff_id)
            .bind(filter.report_id)
            .bind(filter.status)
            .bind(filter.limit.unwrap_or(50).clamp(1, 500))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn latest_submission_since(
        &self,
        staff_id: Uuid,
        report_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<Submission>, StoreError> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE staff_id = $1 AND report_id = $2 AND submitted_at >= $3
            ORDER BY submitted_at DESC
            LIMIT 1
            "#,
        )
        .bind(staff_id)
        .bind(report_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn record_admin_response(
        &self,
        submission_id: Uuid,
        response: &str,
        responder_id: Option<Uuid>,
        responded_at: DateTime<Utc>,
    ) -> Result<Option<Submission>, StoreError> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET admin_response = $1, admin_responded_by = $2, admin_responded_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(response)
        .bind(responder_id)
        .bind(responded_at)
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn count_submissions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(SubmissionStatus, i64)>, StoreError> {
        let counts = sqlx::query_as::<_, (SubmissionStatus, i64)>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM submissions
            WHERE submitted_at >= $1
            GROUP BY status
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn count_open_questions(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM submissions WHERE has_question = true AND admin_response IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, StoreError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (staff_id, type, title, message, channel)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.staff_id)
        .bind(input.kind)
        .bind(&input.title)
        .bind(&input.message)
        .bind(input.channel)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        staff_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE ($1::uuid IS NULL OR staff_id = $1)
            ORDER BY sent_at DESC
            LIMIT $2
            "#,
        )
        .bind(staff_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
