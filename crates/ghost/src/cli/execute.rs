//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;

use super::args::{
    AgentAction, AgentArgs, ChildrenArgs, CreateArgs, DepAction, DepArgs, InitArgs, IssueArgs,
    ListArgs, StatusArgs, TakeArgs, TreeArgs, UpdateArgs,
};
use crate::app::App;
use crate::domain::{IssueFilter, IssueUpdate, NewIssue, ParentFilter};
use crate::output::{self, OutputConfig, OutputMode};
use crate::service::ProgressCalculator;
use crate::worktree::GitWorktreeManager;

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;
    use crate::config::GhostConfig;

    let current_dir = std::env::current_dir()?;

    let mut config = GhostConfig::default();
    if let Some(max_depth) = args.max_depth {
        config.max_depth = usize::from(max_depth);
    }
    if let Some(max_agents) = args.max_agents {
        config.max_agents = usize::from(max_agents);
    }

    if !args.quiet {
        println!("Initializing ghost repository...");
    }

    let result = init::init(&current_dir, &config).await?;

    if !args.quiet {
        println!("Initialized ghost in {}", result.ghost_dir.display());
        println!("  Config: {}", result.config_file.display());
        println!("  Issues: {}", result.issues_dir.display());
        println!("  Agents: {}", result.agents_file.display());
    }

    Ok(())
}

/// Execute the create command
pub async fn execute_create(app: &mut App, args: &CreateArgs, output_mode: OutputMode) -> Result<()> {
    let new_issue = NewIssue {
        title: args.title.clone(),
        description: args.description.clone(),
        parent_id: args.parent.clone(),
    };

    let issue = app.issues().create_issue(new_issue).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&issue)?,
        OutputMode::Text => println!("Created issue: {}", issue.id),
    }
    Ok(())
}

/// Execute the list command
pub async fn execute_list(app: &mut App, args: &ListArgs, output_mode: OutputMode) -> Result<()> {
    let parent = match (&args.parent, args.roots) {
        (Some(parent), _) => ParentFilter::Of(parent.clone()),
        (None, true) => ParentFilter::Root,
        (None, false) => ParentFilter::Any,
    };
    let filter = IssueFilter {
        status: (!args.status.is_empty())
            .then(|| args.status.iter().map(|s| (*s).into()).collect()),
        parent,
    };

    let mut issues = app.issues().get_issues(&filter).await?;
    if !args.all {
        issues.retain(|issue| !issue.is_archived());
    }

    output::print_issues(&issues, output_mode)?;
    Ok(())
}

/// Execute the show command
pub async fn execute_show(app: &mut App, args: &IssueArgs, output_mode: OutputMode) -> Result<()> {
    let service = app.issues();
    let issue = service
        .get_issue(&args.issue_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Issue not found: {}", args.issue_id))?;

    let has_children = !service.get_children(&issue.id).await?.is_empty();
    let progress = if has_children {
        Some(service.calculate_progress(&issue.id).await?)
    } else {
        None
    };

    output::print_issue_details(&issue, progress.as_ref(), output_mode)?;
    Ok(())
}

/// Execute the status command
pub async fn execute_status(app: &mut App, args: &StatusArgs, output_mode: OutputMode) -> Result<()> {
    let issue = app
        .issues()
        .update_issue_status(&args.issue_id, args.status.into())
        .await?;

    match output_mode {
        OutputMode::Json => output::print_json(&issue)?,
        OutputMode::Text => println!("{}: {}", issue.id, issue.status),
    }
    Ok(())
}

/// Execute the approve command
pub async fn execute_approve(app: &mut App, args: &IssueArgs, output_mode: OutputMode) -> Result<()> {
    let issue = app.issues().approve_issue(&args.issue_id).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&issue)?,
        OutputMode::Text => println!("Approved issue: {}", issue.id),
    }
    Ok(())
}

/// Execute the update command
pub async fn execute_update(app: &mut App, args: &UpdateArgs, output_mode: OutputMode) -> Result<()> {
    let parent_id = match (&args.parent, args.root) {
        (Some(parent), _) => Some(Some(parent.clone())),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let update = IssueUpdate {
        title: args.title.clone(),
        description: args
            .description
            .clone()
            .map(|d| (!d.is_empty()).then_some(d)),
        parent_id,
        ..Default::default()
    };

    let issue = app.issues().update_issue(&args.issue_id, update).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&issue)?,
        OutputMode::Text => println!("Updated issue: {}", issue.id),
    }
    Ok(())
}

/// Execute the children command
pub async fn execute_children(
    app: &mut App,
    args: &ChildrenArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let mut service = app.issues();
    if let Some(children) = &args.set {
        service.set_children(&args.parent_id, children).await?;
    }

    let children = service.get_children(&args.parent_id).await?;
    output::print_issues(&children, output_mode)?;
    Ok(())
}

/// Execute the dep command
pub async fn execute_dep(app: &mut App, args: &DepArgs, output_mode: OutputMode) -> Result<()> {
    let mut service = app.issues();

    match &args.action {
        DepAction::Add { from, to } => {
            service.add_dependency(from, to).await?;

            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "action": "add",
                    "from": from,
                    "to": to,
                    "status": "success"
                }))?,
                OutputMode::Text => println!("Added dependency: {from} --> {to}"),
            }
        }
        DepAction::Remove { from, to } => {
            service.remove_dependency(from, to).await?;

            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "action": "remove",
                    "from": from,
                    "to": to,
                    "status": "success"
                }))?,
                OutputMode::Text => println!("Removed dependency: {from} --> {to}"),
            }
        }
    }
    Ok(())
}

/// Execute the available command
pub async fn execute_available(app: &mut App, output_mode: OutputMode) -> Result<()> {
    let issues = app.issues().get_available_issues().await?;
    output::print_issues(&issues, output_mode)?;
    Ok(())
}

/// Execute the archive command
pub async fn execute_archive(app: &mut App, args: &IssueArgs, output_mode: OutputMode) -> Result<()> {
    let archived = app.issues().archive_issue(&args.issue_id).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&archived)?,
        OutputMode::Text => println!("Archived {} issue(s)", archived.len()),
    }
    Ok(())
}

/// Execute the delete command
pub async fn execute_delete(app: &mut App, args: &IssueArgs, output_mode: OutputMode) -> Result<()> {
    app.issues().delete_issue(&args.issue_id).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "deleted": args.issue_id,
        }))?,
        OutputMode::Text => println!("Deleted issue: {}", args.issue_id),
    }
    Ok(())
}

/// Execute the tree command
pub async fn execute_tree(app: &mut App, args: &TreeArgs, output_mode: OutputMode) -> Result<()> {
    let service = app.issues();
    let trees = match &args.issue_id {
        Some(id) => vec![service.get_issue_tree(id).await?],
        None => service.get_issue_forest().await?,
    };
    let issues = service.get_issues(&IssueFilter::default()).await?;

    output::print_issue_trees(&trees, &ProgressCalculator::new(&issues), output_mode)?;
    Ok(())
}

/// Execute the progress command
pub async fn execute_progress(app: &mut App, args: &IssueArgs, output_mode: OutputMode) -> Result<()> {
    let progress = app.issues().calculate_progress(&args.issue_id).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&progress)?,
        OutputMode::Text => println!(
            "{}: {} ({}%)",
            args.issue_id,
            ProgressCalculator::format_progress(&progress),
            progress.percentage
        ),
    }
    Ok(())
}

/// Execute the take command
pub async fn execute_take(app: &mut App, args: &TakeArgs, output_mode: OutputMode) -> Result<()> {
    let worktrees = args.worktree.then(|| GitWorktreeManager::new(app.root()));
    let issue = app
        .issues()
        .take_issue(
            &args.issue_id,
            &args.agent,
            worktrees
                .as_ref()
                .map(|manager| manager as &dyn crate::worktree::WorktreeManager),
        )
        .await?;

    match output_mode {
        OutputMode::Json => output::print_json(&issue)?,
        OutputMode::Text => {
            println!("{} is now working on {}", args.agent, issue.id);
            if let Some(path) = &issue.work_tree_path {
                println!("  Worktree: {}", path.display());
            }
        }
    }
    Ok(())
}

/// Execute the agent command
pub async fn execute_agent(app: &mut App, args: &AgentArgs, output_mode: OutputMode) -> Result<()> {
    let mut service = app.issues();

    match &args.action {
        AgentAction::List => {
            let registry = service.agent_registry().await?;
            output::print_agents(&registry, output_mode)?;
        }
        AgentAction::Release { name } => {
            let released = service.release_agent(name).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "agent": name,
                    "released": released,
                }))?,
                OutputMode::Text if released => println!("Released agent: {name}"),
                OutputMode::Text => println!(
                    "{}",
                    output::warning(&format!("Unknown agent: {name}"), &OutputConfig::from_env())
                ),
            }
        }
    }
    Ok(())
}

/// Execute the migrate command
///
/// The migration itself runs when the repository is opened; this reports
/// what it did.
pub fn execute_migrate(app: &App, output_mode: OutputMode) -> Result<()> {
    let report = app.migration_report();

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "ran": report.ran(),
            "migrated": report.migrated,
            "skipped": report.skipped.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "detached": report.detached,
            "failed": report.failed,
            "backup": report.backup_path,
        }))?,
        OutputMode::Text if !report.ran() => println!("Nothing to migrate"),
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!(
                "{}",
                output::success(&format!("Migrated {} issue(s)", report.migrated), &config)
            );
            for warning in &report.skipped {
                println!("  {}", output::warning(&format!("skipped: {warning}"), &config));
            }
            for id in &report.detached {
                println!("  {}", output::warning(&format!("moved to root: {id}"), &config));
            }
            for id in &report.failed {
                println!("  {}", output::warning(&format!("failed: {id}"), &config));
            }
            if let Some(backup) = &report.backup_path {
                println!("  Backup: {}", backup.display());
            }
        }
    }
    Ok(())
}
