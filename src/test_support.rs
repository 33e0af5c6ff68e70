//! In-memory doubles for the store and the chat platform

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use crate::db::{Store, StoreError};
use crate::line::{Message, NotifyError, Notifier};
use crate::models::*;

pub fn sample_staff(code: &str, name: &str) -> Staff {
    let now = Utc::now();
    Staff {
        id: Uuid::new_v4(),
        staff_id: code.to_string(),
        name: name.to_string(),
        role: Role::Staff,
        is_active: true,
        line_user_id: None,
        email: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_template(name: &str, is_active: bool) -> ReportTemplate {
    let now = Utc::now();
    ReportTemplate {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        emoji: Some("📝".to_string()),
        frequency: Frequency::Daily,
        deadline: Some("毎日 18:00まで".to_string()),
        category: None,
        is_active,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Default)]
struct Tables {
    staff: Vec<Staff>,
    templates: Vec<ReportTemplate>,
    submissions: Vec<Submission>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: Mutex<bool>,
    fail_submission_inserts: Mutex<bool>,
}

impl MemoryStore {
    pub fn add_staff(&self, staff: Staff) {
        self.tables.lock().unwrap().staff.push(staff);
    }

    pub fn add_template(&self, template: ReportTemplate) {
        self.tables.lock().unwrap().templates.push(template);
    }

    pub fn add_submission(&self, submission: Submission) {
        self.tables.lock().unwrap().submissions.push(submission);
    }

    pub fn staff_rows(&self) -> Vec<Staff> {
        self.tables.lock().unwrap().staff.clone()
    }

    pub fn template_rows(&self) -> Vec<ReportTemplate> {
        self.tables.lock().unwrap().templates.clone()
    }

    pub fn submission_rows(&self) -> Vec<Submission> {
        self.tables.lock().unwrap().submissions.clone()
    }

    pub fn notification_rows(&self) -> Vec<Notification> {
        self.tables.lock().unwrap().notifications.clone()
    }

    pub fn deactivate_all_templates(&self) {
        for template in self.tables.lock().unwrap().templates.iter_mut() {
            template.is_active = false;
        }
    }

    /// Every call fails as if the database were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn fail_submission_inserts(&self, fail: bool) {
        *self.fail_submission_inserts.lock().unwrap() = fail;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *self.unavailable.lock().unwrap() {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn with_report(tables: &Tables, submission: &Submission) -> SubmissionWithReport {
        let template = tables.templates.iter().find(|t| t.id == submission.report_id);
        SubmissionWithReport {
            submission: submission.clone(),
            report_name: template.map(|t| t.name.clone()),
            report_emoji: template.and_then(|t| t.emoji.clone()),
        }
    }
}

fn newest_first(rows: &mut [Submission]) {
    rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_staff(&self, id: Uuid) -> Result<Option<Staff>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.staff.iter().find(|s| s.id == id).cloned())
    }

    async fn find_staff_by_line_user(
        &self,
        line_user_id: &str,
    ) -> Result<Option<Staff>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .staff
            .iter()
            .find(|s| s.line_user_id.as_deref() == Some(line_user_id))
            .cloned())
    }

    async fn find_active_staff_by_code(
        &self,
        staff_code: &str,
    ) -> Result<Option<Staff>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .staff
            .iter()
            .find(|s| s.staff_id == staff_code && s.is_active)
            .cloned())
    }

    async fn link_line_user(
        &self,
        staff_id: Uuid,
        line_user_id: &str,
    ) -> Result<Option<Staff>, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if tables
            .staff
            .iter()
            .any(|s| s.line_user_id.as_deref() == Some(line_user_id))
        {
            return Err(StoreError::Conflict("line_user_id".to_string()));
        }
        let Some(staff) = tables
            .staff
            .iter_mut()
            .find(|s| s.id == staff_id && s.line_user_id.is_none())
        else {
            return Ok(None);
        };
        staff.line_user_id = Some(line_user_id.to_string());
        staff.updated_at = Utc::now();
        Ok(Some(staff.clone()))
    }

    async fn list_staff(&self) -> Result<Vec<Staff>, StoreError> {
        self.check()?;
        let mut staff = self.tables.lock().unwrap().staff.clone();
        staff.sort_by(|a, b| a.staff_id.cmp(&b.staff_id));
        Ok(staff)
    }

    async fn list_reachable_staff(&self) -> Result<Vec<Staff>, StoreError> {
        let mut staff = self.list_staff().await?;
        staff.retain(|s| s.is_active && s.line_user_id.is_some());
        Ok(staff)
    }

    async fn create_staff(&self, input: &CreateStaff) -> Result<Staff, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.staff.iter().any(|s| s.staff_id == input.staff_id) {
            return Err(StoreError::Conflict("staff_id".to_string()));
        }
        let mut staff = sample_staff(&input.staff_id, input.name.trim());
        staff.role = input.role.unwrap_or(Role::Staff);
        staff.email = input.email.clone();
        tables.staff.push(staff.clone());
        Ok(staff)
    }

    async fn update_staff(
        &self,
        id: Uuid,
        input: &UpdateStaff,
    ) -> Result<Option<Staff>, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(staff) = tables.staff.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            staff.name = name.clone();
        }
        if let Some(role) = input.role {
            staff.role = role;
        }
        if let Some(is_active) = input.is_active {
            staff.is_active = is_active;
        }
        if let Some(email) = &input.email {
            staff.email = Some(email.clone());
        }
        if input.unlink_line {
            staff.line_user_id = None;
        }
        staff.updated_at = Utc::now();
        Ok(Some(staff.clone()))
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<ReportTemplate>, StoreError> {
        self.check()?;
        let mut templates: Vec<ReportTemplate> = self
            .tables
            .lock()
            .unwrap()
            .templates
            .iter()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn find_template(&self, id: Uuid) -> Result<Option<ReportTemplate>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.templates.iter().find(|t| t.id == id).cloned())
    }

    async fn find_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ReportTemplate>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut matches: Vec<&ReportTemplate> =
            tables.templates.iter().filter(|t| t.name == name).collect();
        matches.sort_by_key(|t| !t.is_active);
        Ok(matches.first().map(|t| (*t).clone()))
    }

    async fn create_template(
        &self,
        input: &CreateReportTemplate,
    ) -> Result<ReportTemplate, StoreError> {
        self.check()?;
        let mut template = sample_template(input.name.trim(), input.is_active.unwrap_or(true));
        template.description = input.description.clone();
        template.emoji = input.emoji.clone();
        template.frequency = input.frequency;
        template.deadline = input.deadline.clone();
        template.category = input.category.clone();
        self.tables.lock().unwrap().templates.push(template.clone());
        Ok(template)
    }

    async fn update_template(
        &self,
        id: Uuid,
        input: &UpdateReportTemplate,
    ) -> Result<Option<ReportTemplate>, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(template) = tables.templates.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            template.name = name.clone();
        }
        if let Some(description) = &input.description {
            template.description = Some(description.clone());
        }
        if let Some(emoji) = &input.emoji {
            template.emoji = Some(emoji.clone());
        }
        if let Some(frequency) = input.frequency {
            template.frequency = frequency;
        }
        if let Some(deadline) = &input.deadline {
            template.deadline = Some(deadline.clone());
        }
        if let Some(category) = &input.category {
            template.category = Some(category.clone());
        }
        if let Some(is_active) = input.is_active {
            template.is_active = is_active;
        }
        template.updated_at = Utc::now();
        Ok(Some(template.clone()))
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let before = tables.templates.len();
        tables.templates.retain(|t| t.id != id);
        Ok(tables.templates.len() < before)
    }

    async fn insert_submission(&self, input: &NewSubmission) -> Result<Submission, StoreError> {
        self.check()?;
        if *self.fail_submission_inserts.lock().unwrap() {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }
        let submission = Submission {
            id: Uuid::new_v4(),
            staff_id: input.staff_id,
            report_id: input.report_id,
            status: input.outcome.status(),
            message: input.message.clone(),
            attachment_urls: input.attachment_urls.clone(),
            has_question: input.outcome.has_question(),
            question: input.outcome.question().map(str::to_string),
            admin_response: None,
            admin_responded_by: None,
            admin_responded_at: None,
            submitted_at: input.submitted_at,
            due_date: input.due_date,
        };
        self.tables
            .lock()
            .unwrap()
            .submissions
            .push(submission.clone());
        Ok(submission)
    }

    async fn find_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn recent_submissions(
        &self,
        staff_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubmissionWithReport>, StoreError> {
        self.list_submissions(&SubmissionFilter {
            staff_id: Some(staff_id),
            limit: Some(limit),
            ..SubmissionFilter::default()
        })
        .await
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionWithReport>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Submission> = tables
            .submissions
            .iter()
            .filter(|s| filter.staff_id.map_or(true, |id| s.staff_id == id))
            .filter(|s| filter.report_id.map_or(true, |id| s.report_id == id))
            .filter(|s| filter.status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        newest_first(&mut rows);
        let limit = usize::try_from(filter.limit.unwrap_or(50).max(1)).unwrap_or(50);
        Ok(rows
            .iter()
            .take(limit)
            .map(|s| Self::with_report(&tables, s))
            .collect())
    }

    async fn latest_submission_since(
        &self,
        staff_id: Uuid,
        report_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<Submission>, StoreError> {
        self.check()?;
        let mut rows: Vec<Submission> = self
            .tables
            .lock()
            .unwrap()
            .submissions
            .iter()
            .filter(|s| s.staff_id == staff_id && s.report_id == report_id)
            .filter(|s| s.submitted_at >= since)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows.into_iter().next())
    }

    async fn record_admin_response(
        &self,
        submission_id: Uuid,
        response: &str,
        responder_id: Option<Uuid>,
        responded_at: DateTime<Utc>,
    ) -> Result<Option<Submission>, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(submission) = tables.submissions.iter_mut().find(|s| s.id == submission_id)
        else {
            return Ok(None);
        };
        submission.admin_response = Some(response.to_string());
        submission.admin_responded_by = responder_id;
        submission.admin_responded_at = Some(responded_at);
        Ok(Some(submission.clone()))
    }

    async fn count_submissions_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(SubmissionStatus, i64)>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(SubmissionStatus::ALL
            .into_iter()
            .map(|status| {
                let count = tables
                    .submissions
                    .iter()
                    .filter(|s| s.submitted_at >= since && s.status == status)
                    .count() as i64;
                (status, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn count_open_questions(&self) -> Result<i64, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .submissions
            .iter()
            .filter(|s| s.has_question && s.admin_response.is_none())
            .count() as i64)
    }

    async fn insert_notification(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, StoreError> {
        self.check()?;
        let notification = Notification {
            id: Uuid::new_v4(),
            staff_id: input.staff_id,
            kind: input.kind,
            title: input.title.clone(),
            message: input.message.clone(),
            channel: input.channel,
            sent_at: Utc::now(),
            is_read: false,
        };
        self.tables
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        staff_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| staff_id.map_or(true, |id| n.staff_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        match tables.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// RecordingNotifier
// =============================================================================

/// Records every send attempt, including the ones it is told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    replies: Mutex<Vec<(String, Vec<Message>)>>,
    pushes: Mutex<Vec<(String, Vec<Message>)>>,
    failing_tokens: Mutex<HashSet<String>>,
    failing_users: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn fail_reply_token(&self, token: &str) {
        self.failing_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn fail_push_to(&self, line_user_id: &str) {
        self.failing_users
            .lock()
            .unwrap()
            .insert(line_user_id.to_string());
    }

    pub fn replies(&self) -> Vec<(String, Vec<Message>)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<(String, Vec<Message>)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn reply_messages(&self, token: &str) -> Vec<Message> {
        self.replies()
            .into_iter()
            .filter(|(t, _)| t == token)
            .flat_map(|(_, messages)| messages)
            .collect()
    }

    /// All reply bodies for `token`, joined by newlines
    pub fn reply_text(&self, token: &str) -> String {
        self.reply_messages(token)
            .iter()
            .map(|m| m.body().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn reply(&self, reply_token: &str, messages: &[Message]) -> Result<(), NotifyError> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages.to_vec()));
        if self.failing_tokens.lock().unwrap().contains(reply_token) {
            return Err(NotifyError::Status {
                status: 400,
                body: "Invalid reply token".to_string(),
            });
        }
        Ok(())
    }

    async fn push(&self, line_user_id: &str, messages: &[Message]) -> Result<(), NotifyError> {
        self.pushes
            .lock()
            .unwrap()
            .push((line_user_id.to_string(), messages.to_vec()));
        if self.failing_users.lock().unwrap().contains(line_user_id) {
            return Err(NotifyError::Status {
                status: 500,
                body: "upstream error".to_string(),
            });
        }
        Ok(())
    }
}
