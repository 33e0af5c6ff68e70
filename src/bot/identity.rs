//! Mapping chat accounts to staff records
//!
//! A chat account starts out unlinked. Sending a staff code (ASCII digits)
//! that matches an active staff row links it, once. There is no way back from
//! the chat side; only an administrator can clear the link.

use std::sync::Arc;

use super::replies;
use crate::db::{Store, StoreError};
use crate::line::Message;
use crate::models::Staff;
use crate::validation::is_staff_code;

#[derive(Debug, Clone)]
pub enum LinkOutcome {
    Linked(Staff),
    UnknownCode(String),
    /// The staff row is already attached to some other chat account
    AlreadyLinked,
    /// The text was not a staff code; ask for one
    Prompt,
}

impl LinkOutcome {
    pub fn reply(&self) -> Message {
        match self {
            LinkOutcome::Linked(staff) => replies::link_success(staff),
            LinkOutcome::UnknownCode(code) => replies::unknown_staff_code(code),
            LinkOutcome::AlreadyLinked => replies::already_linked(),
            LinkOutcome::Prompt => replies::onboarding_prompt(),
        }
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, line_user_id: &str) -> Result<Option<Staff>, StoreError> {
        self.store.find_staff_by_line_user(line_user_id).await
    }

    /// Run the linking step for an unlinked chat account that sent `text`
    pub async fn link(&self, line_user_id: &str, text: &str) -> Result<LinkOutcome, StoreError> {
        let code = text.trim();
        if !is_staff_code(code) {
            return Ok(LinkOutcome::Prompt);
        }

        let staff = match self.store.find_active_staff_by_code(code).await? {
            Some(staff) => staff,
            None => {
                tracing::info!(staff_code = %code, "Unknown staff code sent for linking");
                return Ok(LinkOutcome::UnknownCode(code.to_string()));
            }
        };

        match self.store.link_line_user(staff.id, line_user_id).await {
            Ok(Some(linked)) => {
                tracing::info!(
                    staff_id = %linked.id,
                    staff_code = %linked.staff_id,
                    "Linked LINE account to staff"
                );
                Ok(LinkOutcome::Linked(linked))
            }
            Ok(None) | Err(StoreError::Conflict(_)) => {
                tracing::warn!(
                    staff_id = %staff.id,
                    "Staff already linked to another LINE account"
                );
                Ok(LinkOutcome::AlreadyLinked)
            }
            Err(e) => Err(e),
        }
    }
}
