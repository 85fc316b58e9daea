//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for ghost using clap's derive API.
//! Each command has its own argument struct with validation and helpful error messages.
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! ghost create "Ship the parser"
//! ghost create "Tokenizer" --parent lq3k9z-a7f
//! ghost approve lq3k9z-a7f.lq3ka1-0k2
//! ghost dep add lq3k9z-a7f.lq3ka4-1xz lq3k9z-a7f.lq3ka1-0k2
//! ghost take lq3k9z-a7f.lq3ka1-0k2 --agent alice --worktree
//! ghost tree
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    AgentAction, AgentArgs, ChildrenArgs, CreateArgs, DepAction, DepArgs, InitArgs, IssueArgs,
    ListArgs, StatusArgs, TakeArgs, TreeArgs, UpdateArgs,
};
pub use types::IssueStatusArg;
pub use validators::{
    MAX_TITLE_LENGTH, validate_agent_name, validate_description, validate_issue_id,
    validate_title,
};

/// Ghost - hierarchical issue tracking for humans and agents
///
/// Issues live in `.ghost/issues/`, one directory per issue, nested under
/// their parent so the tree can be browsed and versioned like source code.
#[derive(Parser, Debug)]
#[command(name = "ghost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new ghost repository
    ///
    /// Creates the `.ghost/` directory with configuration, the issue tree
    /// root and an empty agent registry.
    Init(InitArgs),

    /// Create a new issue in `plan` status
    Create(CreateArgs),

    /// List issues with optional filters
    List(ListArgs),

    /// Show detailed information about an issue
    Show(IssueArgs),

    /// Change the status of an issue
    ///
    /// Allowed: plan -> backlog | cancelled, backlog -> in_progress | cancelled,
    /// in_progress -> done | cancelled.
    Status(StatusArgs),

    /// Approve a planned issue (plan -> backlog)
    Approve(IssueArgs),

    /// Update title, description or parent of an issue
    Update(UpdateArgs),

    /// List or replace the children of an issue
    Children(ChildrenArgs),

    /// Add or remove dependencies between issues
    Dep(DepArgs),

    /// Show backlog issues whose dependencies are all done
    Available,

    /// Archive an issue and all of its descendants
    Archive(IssueArgs),

    /// Delete an issue without children
    Delete(IssueArgs),

    /// Show the issue hierarchy
    Tree(TreeArgs),

    /// Show completion progress of an issue subtree
    Progress(IssueArgs),

    /// Assign a backlog issue to an agent and start it
    Take(TakeArgs),

    /// Inspect or release agents
    Agent(AgentArgs),

    /// Report the migration of a legacy `data/issues.json` store
    ///
    /// The migration runs automatically whenever the repository is opened.
    Migrate,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns any error raised while opening the repository or running the command.
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Ghost issue tracking system");
            println!("Use --help for more information");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args).await;
        }

        let mut app = crate::app::App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Create(args) => execute::execute_create(&mut app, args, output_mode).await,
            Commands::List(args) => execute::execute_list(&mut app, args, output_mode).await,
            Commands::Show(args) => execute::execute_show(&mut app, args, output_mode).await,
            Commands::Status(args) => execute::execute_status(&mut app, args, output_mode).await,
            Commands::Approve(args) => execute::execute_approve(&mut app, args, output_mode).await,
            Commands::Update(args) => execute::execute_update(&mut app, args, output_mode).await,
            Commands::Children(args) => {
                execute::execute_children(&mut app, args, output_mode).await
            }
            Commands::Dep(args) => execute::execute_dep(&mut app, args, output_mode).await,
            Commands::Available => execute::execute_available(&mut app, output_mode).await,
            Commands::Archive(args) => execute::execute_archive(&mut app, args, output_mode).await,
            Commands::Delete(args) => execute::execute_delete(&mut app, args, output_mode).await,
            Commands::Tree(args) => execute::execute_tree(&mut app, args, output_mode).await,
            Commands::Progress(args) => {
                execute::execute_progress(&mut app, args, output_mode).await
            }
            Commands::Take(args) => execute::execute_take(&mut app, args, output_mode).await,
            Commands::Agent(args) => execute::execute_agent(&mut app, args, output_mode).await,
            Commands::Migrate => execute::execute_migrate(&app, output_mode),
        }
    }
}
