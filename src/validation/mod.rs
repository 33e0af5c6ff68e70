//! Input validation module

use crate::models::{CreateReportTemplate, CreateStaff, CreateSubmission, SubmissionOutcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid URL format")]
    InvalidUrl,

    #[error("Staff ID must consist of ASCII digits only")]
    InvalidStaffCode,
}

/// Maximum length of free-text fields coming from chat or the dashboard
const MAX_TEXT_LEN: usize = 2000;

/// Check whether a chat message looks like a staff code (one or more ASCII digits)
pub fn is_staff_code(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Validate a staff code entered by an administrator
pub fn validate_staff_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "staff_id".to_string(),
        });
    }
    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "staff_id".to_string(),
            max: 32,
        });
    }
    if !is_staff_code(code) {
        return Err(ValidationError::InvalidStaffCode);
    }
    Ok(())
}

/// Validate a staff creation request
pub fn validate_create_staff(input: &CreateStaff) -> Result<(), ValidationError> {
    validate_staff_code(&input.staff_id)?;
    required_text("name", &input.name, 255)?;

    if let Some(ref email) = input.email {
        if !email.is_empty() && !is_valid_email(email) {
            return Err(ValidationError::InvalidEmail);
        }
    }

    Ok(())
}

/// Validate a report template creation request
pub fn validate_create_template(input: &CreateReportTemplate) -> Result<(), ValidationError> {
    required_text("name", &input.name, 255)?;
    optional_text("description", input.description.as_deref(), MAX_TEXT_LEN)?;
    optional_text("emoji", input.emoji.as_deref(), 16)?;
    optional_text("deadline", input.deadline.as_deref(), 255)?;
    optional_text("category", input.category.as_deref(), 100)?;
    Ok(())
}

/// Validate the outcome part of a submission
pub fn validate_outcome(outcome: &SubmissionOutcome) -> Result<(), ValidationError> {
    if let SubmissionOutcome::HasQuestion { question } = outcome {
        required_text("question", question, MAX_TEXT_LEN)?;
    }
    Ok(())
}

/// Validate a dashboard submission form
pub fn validate_create_submission(input: &CreateSubmission) -> Result<(), ValidationError> {
    validate_outcome(&input.outcome)?;
    optional_text("message", input.message.as_deref(), MAX_TEXT_LEN)?;

    for url in &input.attachment_urls {
        validate_attachment_url(url)?;
    }

    Ok(())
}

/// Validate an admin response to a question
pub fn validate_admin_response(response: &str) -> Result<(), ValidationError> {
    required_text("response", response, MAX_TEXT_LEN)
}

/// Validate an attachment URL produced by the storage service
pub fn validate_attachment_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "attachment_urls".to_string(),
        });
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(ValidationError::InvalidUrl);
    }
    if url.len() > 2048 {
        return Err(ValidationError::TooLong {
            field: "attachment_urls".to_string(),
            max: 2048,
        });
    }
    Ok(())
}

fn required_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    optional_text(field, Some(value), max)
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Simple email validation
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);

    !local.is_empty() && !domain.is_empty() && domain.contains('.') && domain.len() > 2
}
