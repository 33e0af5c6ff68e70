//! Localized reply texts and button layouts

use chrono::FixedOffset;

use super::intent::postback;
use crate::line::messages::MAX_QUICK_REPLY_ITEMS;
use crate::line::{Message, PostbackAction};
use crate::models::{
    ReportTemplate, Staff, SubmissionOutcome, SubmissionStatus, SubmissionWithReport,
};

pub const NO_REPORTS_AVAILABLE: &str = "現在提出可能な報告はありません。";

/// Statuses offered on the status form, in display order
const FORM_STATUSES: [SubmissionStatus; 4] = [
    SubmissionStatus::Completed,
    SubmissionStatus::Partial,
    SubmissionStatus::HasQuestion,
    SubmissionStatus::ExtensionRequested,
];

fn menu_buttons() -> Vec<PostbackAction> {
    vec![
        PostbackAction::new("📝 報告する", postback::submit_report()),
        PostbackAction::new("📊 提出状況", postback::check_status()),
        PostbackAction::new("⚙️ 設定", postback::settings()),
    ]
}

// =============================================================================
// Linking
// =============================================================================

pub fn onboarding_prompt() -> Message {
    Message::text(
        "RepoTomoへようこそ！👋\n\nはじめにスタッフIDを数字で送信してください。\n（例: 001）",
    )
}

pub fn link_success(staff: &Staff) -> Message {
    Message::with_buttons(
        format!(
            "✅ 登録完了！\n\n{}さん、RepoTomoへようこそ。\nこれからLINEで報告の提出やリマインダーの受信ができます。",
            staff.name
        ),
        menu_buttons(),
    )
}

pub fn unknown_staff_code(code: &str) -> Message {
    Message::text(format!(
        "スタッフID「{}」が見つかりませんでした。\n番号を確認してもう一度送信するか、管理者に問い合わせてください。",
        code
    ))
}

pub fn already_linked() -> Message {
    Message::text(
        "このスタッフIDは既に別のLINEアカウントと連携されています。\n変更が必要な場合は管理者に連絡してください。",
    )
}

// =============================================================================
// Menus
// =============================================================================

pub fn main_menu(staff: &Staff) -> Message {
    Message::with_buttons(
        format!("📋 メニュー\n\n{}さん、操作を選んでください。", staff.name),
        menu_buttons(),
    )
}

pub fn help() -> Message {
    Message::with_buttons(
        "❓ ヘルプ\n\n\
         ・「報告」/ report … 報告を提出\n\
         ・「状況」/ status … 最近の提出状況\n\
         ・「メニュー」/ menu … メニューを表示\n\
         ・「ヘルプ」/ help … この説明",
        menu_buttons(),
    )
}

pub fn acknowledge() -> Message {
    Message::text("メッセージを受け取りました。\n「メニュー」と送信すると操作を選べます。")
}

pub fn apology() -> Message {
    Message::text("申し訳ありません。エラーが発生しました。\nしばらくしてからもう一度お試しください。")
}

pub fn settings(staff: &Staff) -> Message {
    Message::with_buttons(
        format!(
            "⚙️ 設定\n\n名前: {}\nスタッフID: {}\n権限: {}\nLINE連携: 済み\n\n登録内容の変更は管理者に依頼してください。",
            staff.name,
            staff.staff_id,
            staff.role.label()
        ),
        menu_buttons(),
    )
}

pub fn account_disabled() -> Message {
    Message::text("このアカウントは現在無効になっています。\n管理者にお問い合わせください。")
}

pub fn no_permission() -> Message {
    Message::text("この操作は管理者・マネージャーのみ利用できます。")
}

// =============================================================================
// Reports
// =============================================================================

/// Picker over active templates; plain text when there is nothing to offer.
/// Only as many templates as fit in the quick-reply bar are listed.
pub fn report_picker(templates: &[ReportTemplate]) -> Message {
    if templates.is_empty() {
        return Message::text(NO_REPORTS_AVAILABLE);
    }
    if templates.len() > MAX_QUICK_REPLY_ITEMS {
        tracing::warn!(
            active = templates.len(),
            shown = MAX_QUICK_REPLY_ITEMS,
            "Too many active templates for the report picker"
        );
    }
    let templates = &templates[..templates.len().min(MAX_QUICK_REPLY_ITEMS)];

    let mut text = String::from("📝 提出する報告を選んでください\n");
    for template in templates {
        text.push_str(&format!("\n・{}", template.display_name()));
        if let Some(deadline) = template.deadline.as_deref().filter(|d| !d.is_empty()) {
            text.push_str(&format!("（{}）", deadline));
        }
    }

    let buttons = templates
        .iter()
        .map(|t| PostbackAction::new(t.display_name(), postback::select_report(t.id)))
        .collect();

    Message::with_buttons(text, buttons)
}

pub fn status_form(template: &ReportTemplate) -> Message {
    let mut text = format!("{}\n", template.display_name());
    if let Some(description) = template.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("{}\n", description));
    }
    if let Some(deadline) = template.deadline.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("期限: {}\n", deadline));
    }
    text.push_str("\n状況を選んでください。");

    let buttons = FORM_STATUSES
        .iter()
        .map(|&status| PostbackAction::new(status.label(), postback::submit(template.id, status)))
        .collect();

    Message::with_buttons(text, buttons)
}

pub fn report_not_found() -> Message {
    Message::text("指定された報告が見つかりません。\n「報告」と送信して選び直してください。")
}

pub fn submission_received(
    template: Option<&ReportTemplate>,
    outcome: &SubmissionOutcome,
) -> Message {
    let name = template
        .map(ReportTemplate::display_name)
        .unwrap_or_else(|| "報告".to_string());

    let mut text = format!(
        "✅ 「{}」を受け付けました。\n状況: {}",
        name,
        outcome.status().label()
    );
    match outcome {
        SubmissionOutcome::HasQuestion { .. } => {
            text.push_str("\n\n質問は管理者に共有されました。回答はLINEでお知らせします。")
        }
        SubmissionOutcome::ExtensionRequested => {
            text.push_str("\n\n期限延長の希望を管理者に伝えました。")
        }
        SubmissionOutcome::Partial => text.push_str("\n\n残りの分も完了したら改めて報告してください。"),
        SubmissionOutcome::Completed => text.push_str("\n\nお疲れさまでした！"),
    }

    Message::with_buttons(text, menu_buttons())
}

pub fn submission_failed() -> Message {
    Message::text("❌ 送信に失敗しました。\n時間をおいてもう一度お試しください。")
}

pub fn recent_submissions(rows: &[SubmissionWithReport], offset: FixedOffset) -> Message {
    if rows.is_empty() {
        return Message::with_buttons("📊 まだ提出履歴がありません。", menu_buttons());
    }

    let mut text = String::from("📊 最近の提出状況\n");
    for (i, row) in rows.iter().enumerate() {
        let submitted = row
            .submission
            .submitted_at
            .with_timezone(&offset)
            .format("%m/%d %H:%M");
        text.push_str(&format!(
            "\n{}. {}\n   {} ／ {}",
            i + 1,
            row.report_label(),
            row.submission.status.label(),
            submitted
        ));
        if let Some(SubmissionOutcome::HasQuestion { question }) = row.submission.outcome() {
            text.push_str(&format!("\n   ❓ 質問: {}", question));
        }
        if let Some(response) = row.submission.admin_response.as_deref() {
            text.push_str(&format!("\n   💬 回答: {}", response));
        }
    }

    Message::with_buttons(text, menu_buttons())
}

pub fn admin_summary(counts: &[(SubmissionStatus, i64)], open_questions: i64) -> Message {
    let count_of = |status: SubmissionStatus| {
        counts
            .iter()
            .filter(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .sum::<i64>()
    };
    let total: i64 = counts.iter().map(|(_, n)| *n).sum();

    let mut text = format!("🛠 本日の提出状況\n\n合計: {}件", total);
    for status in FORM_STATUSES {
        text.push_str(&format!("\n{}: {}件", status.label(), count_of(status)));
    }
    text.push_str(&format!("\n\n未回答の質問: {}件", open_questions));

    Message::text(text)
}

// =============================================================================
// Pushes
// =============================================================================

pub fn reminder(template: &ReportTemplate) -> Message {
    let mut text = format!("⏰ リマインダー\n\n「{}」の提出をお願いします。", template.display_name());
    if let Some(deadline) = template.deadline.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("\n期限: {}", deadline));
    }

    Message::with_buttons(
        text,
        vec![PostbackAction::new(
            "📝 今すぐ報告",
            postback::select_report(template.id),
        )],
    )
}

pub fn system_notification(title: &str, message: &str) -> Message {
    Message::text(format!("📢 {}\n\n{}", title, message))
}

pub fn question_response(report_label: &str, question: Option<&str>, response: &str) -> Message {
    let mut text = format!("💬 質問への回答が届きました\n\n報告: {}", report_label);
    if let Some(question) = question {
        text.push_str(&format!("\n質問: {}", question));
    }
    text.push_str(&format!("\n\n回答: {}", response));
    Message::text(text)
}
