//! HTTP request handlers

pub mod broadcast;
pub mod dashboard;
pub mod middleware;
pub mod reminders;
pub mod webhook;

pub use dashboard::*;
pub use reminders::send_reminder;
pub use webhook::line_webhook;

use chrono::FixedOffset;
use std::sync::Arc;

use crate::bot::IntakeRouter;
use crate::config::Config;
use crate::db::Store;
use crate::line::Notifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub router: Arc<IntakeRouter>,
    /// LINE channel secret for signature checks
    pub channel_secret: Option<String>,
    /// SHA-256 hex of the admin bearer token
    pub admin_token_hash: Option<String>,
    pub business_offset: FixedOffset,
    pub is_production: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        let router = Arc::new(IntakeRouter::new(
            store.clone(),
            notifier.clone(),
            config.business_offset,
        ));

        Self {
            store,
            notifier,
            router,
            channel_secret: config.line_channel_secret.clone(),
            admin_token_hash: config
                .admin_api_token
                .as_deref()
                .map(middleware::hash_token),
            business_offset: config.business_offset,
            is_production: config.is_production(),
        }
    }

    #[cfg(test)]
    pub fn with_admin_token(mut self, token: Option<&str>) -> Self {
        self.admin_token_hash = token.map(middleware::hash_token);
        self
    }
}
