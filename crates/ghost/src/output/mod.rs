//! Rendering of issues, trees and agents for the `ghost` CLI.
//!
//! Every printer takes an [`OutputMode`]: text for people, pretty JSON for
//! scripts. Text styling is controlled by [`OutputConfig`]; see [`color`] for
//! the palette and [`tree`] for hierarchy connectors.

pub mod color;
pub mod tree;

use crate::domain::{AgentRegistry, AgentStatus, Issue, IssueProgress};
use crate::service::ProgressCalculator;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{success, warning};
pub use tree::print_issue_trees;

use color::{bold, colored_status_icon, colorize_id, colorize_status, dimmed};

/// Styling switches for text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Styling from the environment.
    ///
    /// `GHOST_ASCII=1` swaps Unicode icons for ASCII ones. Colors are on
    /// unless `NO_COLOR` is set (to anything) or `GHOST_COLOR` is false.
    pub fn from_env() -> Self {
        let use_ascii = env_flag("GHOST_ASCII").unwrap_or(false);
        // https://no-color.org/
        let use_colors =
            env::var_os("NO_COLOR").is_none() && env_flag("GHOST_COLOR").unwrap_or(true);

        Self {
            use_ascii,
            use_colors,
        }
    }
}

/// Parse a boolean switch; unset or empty means "not specified".
fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "" => None,
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(env_var = name, %value, "Ignoring unrecognized boolean value");
            None
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Print a list of issues in the specified format
pub fn print_issues(issues: &[Issue], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => print_issues_text(&mut handle, issues, &config),
        OutputMode::Json => write_json(&mut handle, &issues),
    }
}

/// Print an issue with full details (for the show command)
pub fn print_issue_details(
    issue: &Issue,
    progress: Option<&IssueProgress>,
    mode: OutputMode,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => print_issue_details_text(&mut handle, issue, progress, &config),
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({ "issue": issue, "progress": progress }),
        ),
    }
}

/// Print the agent registry
pub fn print_agents(registry: &AgentRegistry, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => print_agents_text(&mut handle, registry, &config),
        OutputMode::Json => write_json(&mut handle, registry),
    }
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(w, "{json}")
}

fn print_issues_text<W: Write>(
    w: &mut W,
    issues: &[Issue],
    config: &OutputConfig,
) -> io::Result<()> {
    if issues.is_empty() {
        writeln!(w, "No issues found.")?;
        return Ok(());
    }

    writeln!(w, "Found {} issue(s):", issues.len())?;
    writeln!(w)?;

    for issue in issues {
        writeln!(
            w,
            "{} {}  {}",
            colored_status_icon(issue.status, config),
            colorize_id(&issue.id.to_string(), config),
            issue.title
        )?;
    }

    Ok(())
}

fn print_issue_details_text<W: Write>(
    w: &mut W,
    issue: &Issue,
    progress: Option<&IssueProgress>,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} {}: {}",
        colored_status_icon(issue.status, config),
        colorize_id(&issue.id.to_string(), config),
        issue.title
    )?;
    writeln!(
        w,
        "{} {}",
        dimmed("Status:", config),
        colorize_status(issue.status, config)
    )?;

    if let Some(parent) = &issue.parent_id {
        writeln!(
            w,
            "{} {}",
            dimmed("Parent:", config),
            colorize_id(&parent.to_string(), config)
        )?;
    }
    if let Some(agent) = &issue.agent_name {
        writeln!(w, "{} {}", dimmed("Agent:", config), agent)?;
    }
    if let Some(path) = &issue.work_tree_path {
        writeln!(w, "{} {}", dimmed("Worktree:", config), path.display())?;
    }
    if let Some(progress) = progress {
        writeln!(
            w,
            "{} {} ({}%)",
            dimmed("Progress:", config),
            ProgressCalculator::format_progress(progress),
            progress.percentage
        )?;
    }

    writeln!(
        w,
        "{} {}    {} {}",
        dimmed("Created:", config),
        issue.created_at.format("%Y-%m-%d %H:%M"),
        dimmed("Updated:", config),
        issue.updated_at.format("%Y-%m-%d %H:%M")
    )?;
    for (label, stamp) in [
        ("Started:", issue.started_at),
        ("Completed:", issue.completed_at),
        ("Cancelled:", issue.cancelled_at),
        ("Archived:", issue.archived_at),
    ] {
        if let Some(stamp) = stamp {
            writeln!(w, "{} {}", dimmed(label, config), stamp.format("%Y-%m-%d %H:%M"))?;
        }
    }

    if let Some(description) = issue.description.as_deref().filter(|d| !d.is_empty()) {
        writeln!(w)?;
        writeln!(w, "{}:", bold("Description", config))?;
        for line in description.lines() {
            writeln!(w, "  {line}")?;
        }
    }

    for (title, ids) in [
        ("Depends on", &issue.depends_on),
        ("Depended on by", &issue.depended_by),
    ] {
        if ids.is_empty() {
            continue;
        }
        writeln!(w)?;
        writeln!(w, "{} ({}):", bold(title, config), ids.len())?;
        for id in ids {
            writeln!(w, "  {}", colorize_id(&id.to_string(), config))?;
        }
    }

    Ok(())
}

fn print_agents_text<W: Write>(
    w: &mut W,
    registry: &AgentRegistry,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "Agents: {} working (limit {})",
        registry.working_count(),
        registry.max_agents
    )?;
    for agent in registry.agents.values() {
        match (&agent.status, &agent.current_issue_id) {
            (AgentStatus::Working, Some(issue_id)) => writeln!(
                w,
                "  {} {}",
                agent.name,
                colorize_id(&issue_id.to_string(), config)
            )?,
            _ => writeln!(w, "  {} {}", agent.name, dimmed("idle", config))?,
        }
    }
    Ok(())
}
