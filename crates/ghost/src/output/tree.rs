//! Hierarchy rendering for `ghost tree` output.

use std::io::{self, Write};

use super::color::{colored_status_icon, colorize_id, dimmed};
use super::{OutputConfig, OutputMode};
use crate::domain::{IssueProgress, IssueTree};
use crate::service::ProgressCalculator;

/// Print issue trees with ASCII/Unicode connectors.
///
/// Renders a forest like:
/// ```text
/// ▶ lq3k9z-a7f Ship the parser [1/2]
/// ├── ✓ lq3k9z-a7f.lq3ka1-0k2 Tokenizer
/// └── ○ lq3k9z-a7f.lq3ka4-1xz Grammar
/// ```
pub fn print_issue_trees(
    trees: &[IssueTree],
    progress: &ProgressCalculator<'_>,
    mode: OutputMode,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => print_trees_text(&mut handle, trees, progress, &config),
        OutputMode::Json => {
            let output = serde_json::to_string_pretty(trees).map_err(io::Error::other)?;
            writeln!(handle, "{output}")
        }
    }
}

fn print_trees_text<W: Write>(
    w: &mut W,
    trees: &[IssueTree],
    progress: &ProgressCalculator<'_>,
    config: &OutputConfig,
) -> io::Result<()> {
    if trees.is_empty() {
        return writeln!(w, "No issues found.");
    }
    for tree in trees {
        writeln!(w, "{}", node_line(tree, progress, config))?;
        print_children(w, &tree.children, &[], progress, config)?;
    }
    Ok(())
}

/// Recursively render children with connector lines.
///
/// `prefix_segments` tracks which ancestor levels still have siblings below,
/// used to draw the vertical continuation lines (`│`).
fn print_children<W: Write>(
    w: &mut W,
    children: &[IssueTree],
    prefix_segments: &[bool],
    progress: &ProgressCalculator<'_>,
    config: &OutputConfig,
) -> io::Result<()> {
    let (branch, corner, pipe, space) = if config.use_ascii {
        ("|-- ", "`-- ", "|   ", "    ")
    } else {
        ("├── ", "└── ", "│   ", "    ")
    };

    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();

        let mut prefix = String::new();
        for &has_more in prefix_segments {
            prefix.push_str(&dimmed(if has_more { pipe } else { space }, config));
        }
        let connector = dimmed(if is_last { corner } else { branch }, config);

        writeln!(w, "{prefix}{connector}{}", node_line(child, progress, config))?;

        let mut segments = prefix_segments.to_vec();
        segments.push(!is_last);
        print_children(w, &child.children, &segments, progress, config)?;
    }
    Ok(())
}

fn node_line(tree: &IssueTree, progress: &ProgressCalculator<'_>, config: &OutputConfig) -> String {
    let issue = &tree.issue;
    let mut line = format!(
        "{} {} {}",
        colored_status_icon(issue.status, config),
        colorize_id(&issue.id.to_string(), config),
        issue.title
    );
    if !tree.children.is_empty() {
        let summary: IssueProgress = progress.calculate_progress(&issue.id);
        line.push_str(&format!(" [{}]", ProgressCalculator::format_progress(&summary)));
    }
    if issue.is_archived() {
        line.push_str(&format!(" {}", dimmed("(archived)", config)));
    }
    line
}
