//! Classification of inbound chat events into intents

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{SubmissionOutcome, SubmissionStatus};

/// Stored as the question when a chat postback reports a question without text
pub const CHAT_QUESTION_PLACEHOLDER: &str = "LINEから質問ありで提出されました（詳細は本人に確認してください）";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    MainMenu,
    PickReport,
    SelectReport { report_id: Uuid },
    Submit {
        report_id: Uuid,
        outcome: SubmissionOutcome,
    },
    CheckStatus,
    Settings,
    Help,
    AdminSummary,
    /// Free text that matched nothing
    Acknowledge,
}

impl Intent {
    /// Exact, case-sensitive keyword match after trimming surrounding whitespace
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            "メニュー" | "menu" => Intent::MainMenu,
            "報告" | "report" => Intent::PickReport,
            "状況" | "status" => Intent::CheckStatus,
            "ヘルプ" | "help" => Intent::Help,
            "管理" | "admin" => Intent::AdminSummary,
            _ => Intent::Acknowledge,
        }
    }

    /// Decode a query-string postback; anything unrecognized falls back to the main menu
    pub fn from_postback(data: &str) -> Self {
        let params: HashMap<String, String> = url::form_urlencoded::parse(data.as_bytes())
            .into_owned()
            .collect();

        let report_id = || params.get("report_id").and_then(|v| Uuid::parse_str(v).ok());

        match params.get("action").map(String::as_str) {
            Some("submit_report") => Intent::PickReport,
            Some("select_report") => match report_id() {
                Some(report_id) => Intent::SelectReport { report_id },
                None => Intent::MainMenu,
            },
            Some("submit") => {
                let status = params
                    .get("status")
                    .and_then(|s| SubmissionStatus::parse(s));
                let question = params
                    .get("question")
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .or_else(|| Some(CHAT_QUESTION_PLACEHOLDER.to_string()));
                let outcome =
                    status.and_then(|status| SubmissionOutcome::from_status(status, question));

                match (report_id(), outcome) {
                    (Some(report_id), Some(outcome)) => Intent::Submit { report_id, outcome },
                    _ => Intent::MainMenu,
                }
            }
            Some("check_status") => Intent::CheckStatus,
            Some("settings") => Intent::Settings,
            _ => Intent::MainMenu,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Intent::MainMenu => "main_menu",
            Intent::PickReport => "pick_report",
            Intent::SelectReport { .. } => "select_report",
            Intent::Submit { .. } => "submit",
            Intent::CheckStatus => "check_status",
            Intent::Settings => "settings",
            Intent::Help => "help",
            Intent::AdminSummary => "admin_summary",
            Intent::Acknowledge => "acknowledge",
        }
    }
}

/// Postback payloads the bot itself emits on buttons
pub mod postback {
    use crate::models::SubmissionStatus;
    use uuid::Uuid;

    pub fn submit_report() -> String {
        "action=submit_report".to_string()
    }

    pub fn select_report(report_id: Uuid) -> String {
        format!("action=select_report&report_id={}", report_id)
    }

    pub fn submit(report_id: Uuid, status: SubmissionStatus) -> String {
        format!(
            "action=submit&report_id={}&status={}",
            report_id,
            status.as_str()
        )
    }

    pub fn check_status() -> String {
        "action=check_status".to_string()
    }

    pub fn settings() -> String {
        "action=settings".to_string()
    }
}
