//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use chrono::Utc;
use ghost::domain::{Issue, IssueId, IssueStatus};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Output};

/// Run the ghost binary in the specified directory with colors disabled
pub fn run_ghost_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ghost"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("GHOST_ASCII", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute ghost binary")
}

/// Create an issue through the CLI and return its id
pub fn create_issue(dir: &Path, title: &str, parent: Option<&str>) -> String {
    let mut args = vec!["create", title];
    if let Some(parent) = parent {
        args.extend(["--parent", parent]);
    }
    let output = run_ghost_in_dir(dir, &args);
    assert!(
        output.status.success(),
        "Failed to create issue: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .strip_prefix("Created issue: ")
        .expect("Unexpected create output")
        .to_string()
}

/// Parse an id, panicking on invalid input
pub fn id(s: &str) -> IssueId {
    IssueId::parse(s).unwrap()
}

/// A bare issue record for storage-level tests
pub fn issue(name: &str, parent: Option<&str>) -> Issue {
    let now = Utc::now();
    Issue {
        id: id(name),
        title: format!("Issue {name}"),
        description: None,
        status: IssueStatus::Plan,
        parent_id: parent.map(id),
        depends_on: BTreeSet::new(),
        depended_by: BTreeSet::new(),
        created_at: now,
        updated_at: now,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        archived_at: None,
        agent_name: None,
        work_tree_path: None,
    }
}
