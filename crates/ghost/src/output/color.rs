//! Terminal styling for text output.
//!
//! Status colors: plan dimmed, backlog white, in_progress yellow, done green,
//! cancelled red. Ids are cyan; labels and tree connectors are dimmed. With
//! colors disabled every helper returns its input unchanged.

use crate::domain::IssueStatus;
use colored::{ColoredString, Colorize};

use super::OutputConfig;

fn paint(text: &str, config: &OutputConfig, style: fn(&str) -> ColoredString) -> String {
    if config.use_colors {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn status_style(status: IssueStatus) -> fn(&str) -> ColoredString {
    match status {
        IssueStatus::Plan => |s| s.dimmed(),
        IssueStatus::Backlog => |s| s.white(),
        IssueStatus::InProgress => |s| s.yellow(),
        IssueStatus::Done => |s| s.green(),
        IssueStatus::Cancelled => |s| s.red(),
    }
}

/// Green, for completed actions.
pub fn success(text: &str, config: &OutputConfig) -> String {
    paint(text, config, |s| s.green())
}

/// Yellow, for non-fatal problems.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    paint(text, config, |s| s.yellow())
}

/// Status name in its status color.
pub(crate) fn colorize_status(status: IssueStatus, config: &OutputConfig) -> String {
    paint(status.as_str(), config, status_style(status))
}

pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    paint(id, config, |s| s.cyan())
}

/// One-character status marker; ASCII when `use_ascii` is set.
pub(crate) fn colored_status_icon(status: IssueStatus, config: &OutputConfig) -> String {
    let icon = match (status, config.use_ascii) {
        (IssueStatus::Plan, true) => "?",
        (IssueStatus::Plan, false) => "◌",
        (IssueStatus::Backlog, true) => "o",
        (IssueStatus::Backlog, false) => "○",
        (IssueStatus::InProgress, true) => ">",
        (IssueStatus::InProgress, false) => "▶",
        (IssueStatus::Done, true) => "+",
        (IssueStatus::Done, false) => "✓",
        (IssueStatus::Cancelled, true) => "x",
        (IssueStatus::Cancelled, false) => "✗",
    };
    paint(icon, config, status_style(status))
}

/// Labels, connectors and other secondary text.
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    paint(text, config, |s| s.dimmed())
}

pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    paint(text, config, |s| s.bold())
}
