//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use crate::domain::IssueId;

/// Maximum title length accepted on the command line.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Parse an issue id (`segment[.segment...]`).
pub fn validate_issue_id(s: &str) -> Result<IssueId, String> {
    IssueId::parse(s.trim()).map_err(|e| e.to_string())
}

/// Validate title length.
///
/// Titles are single-line, non-empty and at most [`MAX_TITLE_LENGTH`] characters.
pub fn validate_title(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Title cannot be empty".to_string());
    }

    let length = s.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title cannot exceed {MAX_TITLE_LENGTH} characters, got {length} characters"
        ));
    }

    if s.contains('\n') || s.contains('\r') {
        return Err("Title cannot contain newline characters".to_string());
    }

    if let Some(pos) = s.chars().position(|c| c.is_control() && c != '\t') {
        return Err(format!(
            "Title contains invalid control character at position {pos}"
        ));
    }

    Ok(s.to_string())
}

/// Validate a description.
///
/// Allows newlines but rejects other control characters.
pub fn validate_description(s: &str) -> Result<String, String> {
    if let Some(pos) = s
        .chars()
        .position(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(format!(
            "Description contains invalid control character at position {pos}"
        ));
    }
    Ok(s.to_string())
}

/// Validate an agent name: non-empty, no whitespace.
pub fn validate_agent_name(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Agent name cannot be empty".to_string());
    }
    if s.chars().any(char::is_whitespace) {
        return Err("Agent name cannot contain whitespace".to_string());
    }
    Ok(s.to_string())
}
