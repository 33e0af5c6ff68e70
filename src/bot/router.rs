//! Submission intake router
//!
//! One inbound event produces at most one reply call. Store failures inside an
//! intent degrade to an apology; reply delivery failures are logged and
//! dropped.

use chrono::{FixedOffset, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;

use super::identity::IdentityResolver;
use super::intent::Intent;
use super::{replies, start_of_day};
use crate::db::{Store, StoreError};
use crate::line::{Event, EventPayload, Message, Notifier};
use crate::models::{NewSubmission, Staff, SubmissionOutcome};

/// How many submissions the status intent shows
pub const RECENT_SUBMISSIONS_LIMIT: i64 = 5;

pub struct IntakeRouter {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    identity: IdentityResolver,
    business_offset: FixedOffset,
}

impl IntakeRouter {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        business_offset: FixedOffset,
    ) -> Self {
        Self {
            identity: IdentityResolver::new(store.clone()),
            store,
            notifier,
            business_offset,
        }
    }

    /// Process a webhook batch; events run concurrently and independently
    pub async fn handle_batch(self: Arc<Self>, events: Vec<Event>) {
        let mut tasks = JoinSet::new();
        for event in events {
            let router = Arc::clone(&self);
            tasks.spawn(async move { router.handle_event(&event).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Event handler task failed: {}", e);
            }
        }
    }

    pub async fn handle_event(&self, event: &Event) {
        let (Some(reply_token), Some(user_id)) = (event.reply_token.as_deref(), event.user_id())
        else {
            tracing::debug!(kind = %event.kind, "Ignoring event without reply token or user");
            return;
        };

        let Some(messages) = self.respond(user_id, event.payload()).await else {
            return;
        };

        if let Err(e) = self.notifier.reply(reply_token, &messages).await {
            tracing::warn!(line_user_id = %user_id, "Failed to deliver reply: {}", e);
        }
    }

    /// Decide the reply for one event, or `None` when nothing should be sent
    pub async fn respond(&self, line_user_id: &str, payload: EventPayload) -> Option<Vec<Message>> {
        if payload == EventPayload::Other {
            tracing::debug!(line_user_id = %line_user_id, "Ignoring unsupported event");
            return None;
        }

        let staff = match self.identity.resolve(line_user_id).await {
            Ok(staff) => staff,
            Err(e) => {
                tracing::error!(line_user_id = %line_user_id, "Failed to resolve staff: {}", e);
                return None;
            }
        };

        let Some(staff) = staff else {
            return self.respond_unlinked(line_user_id, payload).await;
        };

        if !staff.is_active {
            tracing::info!(staff = %staff.staff_id, "Rejected event from deactivated staff");
            return Some(vec![replies::account_disabled()]);
        }

        let intent = match payload {
            EventPayload::Text(text) => Intent::from_text(&text),
            EventPayload::Postback(data) => Intent::from_postback(&data),
            EventPayload::Follow => Intent::MainMenu,
            EventPayload::Other => return None,
        };

        Some(vec![self.dispatch(&staff, intent).await])
    }

    async fn respond_unlinked(
        &self,
        line_user_id: &str,
        payload: EventPayload,
    ) -> Option<Vec<Message>> {
        match payload {
            EventPayload::Text(text) => match self.identity.link(line_user_id, &text).await {
                Ok(outcome) => Some(vec![outcome.reply()]),
                Err(e) => {
                    tracing::error!(line_user_id = %line_user_id, "Linking failed: {}", e);
                    None
                }
            },
            EventPayload::Postback(_) | EventPayload::Follow => {
                Some(vec![replies::onboarding_prompt()])
            }
            EventPayload::Other => None,
        }
    }

    pub async fn dispatch(&self, staff: &Staff, intent: Intent) -> Message {
        tracing::debug!(staff_id = %staff.id, intent = intent.name(), "Dispatching intent");

        let result = match intent {
            Intent::MainMenu => Ok(replies::main_menu(staff)),
            Intent::Help => Ok(replies::help()),
            Intent::Settings => Ok(replies::settings(staff)),
            Intent::Acknowledge => Ok(replies::acknowledge()),
            Intent::PickReport => self.pick_report().await,
            Intent::SelectReport { report_id } => self.select_report(report_id).await,
            Intent::Submit { report_id, outcome } => self.submit(staff, report_id, outcome).await,
            Intent::CheckStatus => self.check_status(staff).await,
            Intent::AdminSummary => self.admin_summary(staff).await,
        };

        result.unwrap_or_else(|e| {
            tracing::error!(staff_id = %staff.id, "Intent handling failed: {}", e);
            replies::apology()
        })
    }

    async fn pick_report(&self) -> Result<Message, StoreError> {
        let templates = self.store.list_templates(true).await?;
        Ok(replies::report_picker(&templates))
    }

    async fn select_report(&self, report_id: uuid::Uuid) -> Result<Message, StoreError> {
        match self.store.find_template(report_id).await? {
            Some(template) if template.is_active => Ok(replies::status_form(&template)),
            _ => Ok(replies::report_not_found()),
        }
    }

    async fn submit(
        &self,
        staff: &Staff,
        report_id: uuid::Uuid,
        outcome: SubmissionOutcome,
    ) -> Result<Message, StoreError> {
        let template = match self.store.find_template(report_id).await? {
            Some(template) if template.is_active => template,
            _ => return Ok(replies::report_not_found()),
        };

        let submission = NewSubmission {
            staff_id: staff.id,
            report_id,
            outcome,
            message: None,
            attachment_urls: Vec::new(),
            submitted_at: Utc::now(),
            due_date: None,
        };

        match self.store.insert_submission(&submission).await {
            Ok(created) => {
                tracing::info!(
                    submission_id = %created.id,
                    staff_id = %staff.id,
                    report_id = %report_id,
                    status = created.status.as_str(),
                    "Submission received via LINE"
                );
                Ok(replies::submission_received(
                    Some(&template),
                    &submission.outcome,
                ))
            }
            Err(e) => {
                tracing::error!(
                    staff_id = %staff.id,
                    report_id = %report_id,
                    "Failed to insert submission: {}",
                    e
                );
                Ok(replies::submission_failed())
            }
        }
    }

    async fn check_status(&self, staff: &Staff) -> Result<Message, StoreError> {
        let rows = self
            .store
            .recent_submissions(staff.id, RECENT_SUBMISSIONS_LIMIT)
            .await?;
        Ok(replies::recent_submissions(&rows, self.business_offset))
    }

    async fn admin_summary(&self, staff: &Staff) -> Result<Message, StoreError> {
        if !staff.role.can_manage() {
            return Ok(replies::no_permission());
        }

        let since = start_of_day(Utc::now(), self.business_offset);
        let counts = self.store.count_submissions_since(since).await?;
        let open_questions = self.store.count_open_questions().await?;
        Ok(replies::admin_summary(&counts, open_questions))
    }
}
