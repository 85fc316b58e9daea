//! Integration tests for migrating the legacy flat store.

use ghost::app::App;
use ghost::domain::IssueStatus;
use ghost::storage::IssueStorage;
use ghost::storage::file::FileStorage;
use ghost::storage::legacy::LegacyWarning;
use ghost::storage::migration::Migration;
use std::path::Path;
use tempfile::TempDir;

mod common;
use common::id;

const LEGACY_ISSUES: &str = r#"[
  {
    "id": "child",
    "title": "Child",
    "status": "in_review",
    "parentId": "parent",
    "dependsOn": ["sibling", "missing"],
    "createdAt": "2024-01-02T00:00:00Z",
    "updatedAt": "2024-01-03T00:00:00Z"
  },
  {
    "id": "parent",
    "title": "Parent",
    "status": "ready",
    "childIds": ["child"],
    "createdAt": "2024-01-01T00:00:00Z"
  },
  {
    "id": "sibling",
    "title": "Sibling",
    "status": "archived",
    "createdAt": "2024-01-01T12:00:00Z"
  },
  {
    "id": "orphan",
    "title": "Orphan",
    "status": "plan",
    "parentId": "gone",
    "createdAt": "2024-01-04T00:00:00Z"
  },
  {
    "id": "odd",
    "title": "Odd",
    "status": "blocked",
    "createdAt": "2024-01-05T00:00:00Z"
  }
]"#;

fn write_legacy_store(root: &Path) {
    write_legacy_issues(root, LEGACY_ISSUES);
    let data_dir = root.join(".ghost").join("data");
    std::fs::write(
        data_dir.join("agents.json"),
        r#"{"agents": {}, "maxAgents": 3}"#,
    )
    .unwrap();
}

fn write_legacy_issues(root: &Path, issues: &str) {
    let data_dir = root.join(".ghost").join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("issues.json"), issues).unwrap();
}

/// Legacy records `l1` to `l5`, each nested under the one before it.
fn legacy_chain() -> String {
    let records: Vec<String> = (1..=5)
        .map(|level| {
            let parent = if level == 1 {
                "null".to_string()
            } else {
                format!("\"l{}\"", level - 1)
            };
            format!(
                r#"{{"id": "l{level}", "title": "Level {level}", "status": "plan",
                    "parentId": {parent}, "createdAt": "2024-01-0{level}T00:00:00Z"}}"#
            )
        })
        .collect();
    format!("[{}]", records.join(","))
}

#[tokio::test]
async fn test_migrate_nests_children_and_backs_up() {
    let temp_dir = TempDir::new().unwrap();
    write_legacy_store(temp_dir.path());

    let migration = Migration::new(temp_dir.path());
    let mut storage = FileStorage::open(temp_dir.path(), 200);
    assert!(migration.needs_migration().await.unwrap());

    let report = migration.migrate(&mut storage).await.unwrap();

    assert!(report.ran());
    assert_eq!(report.migrated, 4);
    assert_eq!(report.skipped.len(), 2, "unknown status and missing dependency");
    assert_eq!(report.detached, vec![id("orphan")]);
    assert!(report.failed.is_empty());

    let ghost_dir = temp_dir.path().join(".ghost");
    assert!(ghost_dir.join("issues/parent/child/issue.json").is_file());
    assert!(ghost_dir.join("issues/orphan/issue.json").is_file());
    assert!(!ghost_dir.join("data/issues.json").exists());

    let backup = report.backup_path.unwrap();
    assert!(backup.is_file());
    assert_eq!(backup.parent().unwrap(), ghost_dir.join("backup"));
    let name = backup.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("issues-") && name.ends_with(".json"));
    assert!(!name.contains(':'));

    let child = storage.get_issue(&id("child")).await.unwrap().unwrap();
    assert_eq!(child.status, IssueStatus::InProgress);
    assert_eq!(child.parent_id, Some(id("parent")));
    assert_eq!(child.depends_on.into_iter().collect::<Vec<_>>(), vec![id("sibling")]);

    let sibling = storage.get_issue(&id("sibling")).await.unwrap().unwrap();
    assert_eq!(sibling.status, IssueStatus::Done);
    assert!(sibling.is_archived());
    assert!(sibling.depended_by.contains(&id("child")));

    let parent = storage.get_issue(&id("parent")).await.unwrap().unwrap();
    assert_eq!(parent.status, IssueStatus::Backlog);

    let registry = storage.get_agent_registry().await.unwrap();
    assert_eq!(registry.max_agents, 3);
}

#[tokio::test]
async fn test_second_migration_is_a_no_op() {
    let temp_dir = TempDir::new().unwrap();
    write_legacy_store(temp_dir.path());
    let migration = Migration::new(temp_dir.path());
    let mut storage = FileStorage::open(temp_dir.path(), 200);
    migration.migrate(&mut storage).await.unwrap();

    assert!(!migration.needs_migration().await.unwrap());
    let report = migration.migrate(&mut storage).await.unwrap();

    assert!(!report.ran());
    assert_eq!(report.migrated, 0);
    assert_eq!(storage.get_issues().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_app_migrates_on_open() {
    let temp_dir = TempDir::new().unwrap();
    write_legacy_store(temp_dir.path());

    let mut app = App::from_directory(temp_dir.path()).await.unwrap();

    assert!(app.migration_report().ran());
    let available = app.issues().get_available_issues().await.unwrap();
    assert_eq!(
        available.into_iter().map(|issue| issue.id).collect::<Vec<_>>(),
        vec![id("parent")]
    );
    let registry = app.storage().get_agent_registry().await.unwrap();
    assert_eq!(registry.max_agents, 3);
}

#[tokio::test]
async fn test_non_array_legacy_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join(".ghost/data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("issues.json"), r#"{"issues": []}"#).unwrap();

    let mut storage = FileStorage::open(temp_dir.path(), 200);
    let err = Migration::new(temp_dir.path())
        .migrate(&mut storage)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "storage_error");
    assert!(data_dir.join("issues.json").exists());
}

#[tokio::test]
async fn test_migrate_drops_dependency_closing_a_cycle() {
    let temp_dir = TempDir::new().unwrap();
    write_legacy_issues(
        temp_dir.path(),
        r#"[
          {"id": "a", "title": "A", "status": "plan", "dependsOn": ["b"],
           "createdAt": "2024-01-01T00:00:00Z"},
          {"id": "b", "title": "B", "status": "plan", "dependsOn": ["a"],
           "createdAt": "2024-01-02T00:00:00Z"}
        ]"#,
    );

    let mut storage = FileStorage::open(temp_dir.path(), 200);
    let report = Migration::new(temp_dir.path())
        .migrate(&mut storage)
        .await
        .unwrap();

    assert_eq!(report.migrated, 2);
    assert_eq!(
        report.skipped,
        vec![LegacyWarning::CyclicDependency {
            id: id("b"),
            dependency: id("a"),
        }]
    );

    let a = storage.get_issue(&id("a")).await.unwrap().unwrap();
    let b = storage.get_issue(&id("b")).await.unwrap().unwrap();
    assert_eq!(a.depends_on.iter().collect::<Vec<_>>(), vec![&id("b")]);
    assert!(a.depended_by.is_empty());
    assert!(b.depends_on.is_empty());
    assert_eq!(b.depended_by.iter().collect::<Vec<_>>(), vec![&id("a")]);
}

#[tokio::test]
async fn test_migrate_detaches_records_below_depth_limit() {
    let temp_dir = TempDir::new().unwrap();
    write_legacy_issues(temp_dir.path(), &legacy_chain());

    let mut storage = FileStorage::open(temp_dir.path(), 200);
    let report = Migration::new(temp_dir.path())
        .migrate(&mut storage)
        .await
        .unwrap();

    assert_eq!(report.migrated, 5);
    assert_eq!(report.detached, vec![id("l5")]);

    let issues_dir = temp_dir.path().join(".ghost").join("issues");
    assert!(issues_dir.join("l1/l2/l3/l4/issue.json").is_file());
    assert!(!issues_dir.join("l1/l2/l3/l4/l5").exists());
    assert!(issues_dir.join("l5/issue.json").is_file());
    let l5 = storage.get_issue(&id("l5")).await.unwrap().unwrap();
    assert_eq!(l5.parent_id, None);
}

#[tokio::test]
async fn test_migrate_honors_configured_depth() {
    let temp_dir = TempDir::new().unwrap();
    write_legacy_issues(temp_dir.path(), &legacy_chain());

    let mut storage = FileStorage::open(temp_dir.path(), 200);
    let report = Migration::new(temp_dir.path())
        .with_max_depth(2)
        .migrate(&mut storage)
        .await
        .unwrap();

    // l3 starts a new tree, so l4 and l5 fit beneath it again.
    assert_eq!(report.detached, vec![id("l3"), id("l5")]);
    let issues_dir = temp_dir.path().join(".ghost").join("issues");
    assert!(issues_dir.join("l1/l2/issue.json").is_file());
    assert!(issues_dir.join("l3/l4/issue.json").is_file());
    assert!(issues_dir.join("l5/issue.json").is_file());
}
