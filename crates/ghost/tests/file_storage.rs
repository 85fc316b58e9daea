//! Integration tests for the directory-mirrored file store.

use ghost::domain::{IssueStatus, IssueUpdate};
use ghost::error::{Error, StorageError};
use ghost::storage::IssueStorage;
use ghost::storage::file::FileStorage;
use rstest::{fixture, rstest};
use tempfile::TempDir;

mod common;
use common::{id, issue};

struct Store {
    dir: TempDir,
    storage: FileStorage,
}

impl Store {
    fn issues_dir(&self) -> std::path::PathBuf {
        self.dir.path().join(".ghost").join("issues")
    }
}

#[fixture]
async fn store() -> Store {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path(), 4);
    storage.init().await.unwrap();
    Store { dir, storage }
}

#[rstest]
#[tokio::test]
async fn test_save_then_get_round_trips_record(#[future] store: Store) {
    let mut store = store.await;
    let mut record = issue("a", None);
    record.description = Some("Details".to_string());
    record.depends_on.insert(id("b"));

    store.storage.save_issue(&record).await.unwrap();

    let loaded = store.storage.get_issue(&id("a")).await.unwrap().unwrap();
    assert_eq!(loaded, record);
    assert!(store.issues_dir().join("a").join("issue.json").is_file());
}

#[rstest]
#[tokio::test]
async fn test_record_is_pretty_printed_camel_case_json(#[future] store: Store) {
    let mut store = store.await;
    store.storage.save_issue(&issue("p", None)).await.unwrap();
    store.storage.save_issue(&issue("p.c", Some("p"))).await.unwrap();

    let raw = std::fs::read_to_string(store.issues_dir().join("p/p.c/issue.json")).unwrap();
    assert!(raw.contains("\n  \"parentId\": \"p\""));
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["status"], "plan");
}

#[rstest]
#[tokio::test]
async fn test_reparenting_moves_the_whole_subtree(#[future] store: Store) {
    let mut store = store.await;
    for (name, parent) in [("a", None), ("b", None), ("a.c", Some("a")), ("a.c.d", Some("a.c"))] {
        store.storage.save_issue(&issue(name, parent)).await.unwrap();
    }

    let moved = store
        .storage
        .update_issue(
            &id("a.c"),
            IssueUpdate {
                parent_id: Some(Some(id("b"))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.parent_id, Some(id("b")));
    let issues = store.issues_dir();
    assert!(!issues.join("a").join("a.c").exists());
    assert!(issues.join("b/a.c/issue.json").is_file());
    assert!(issues.join("b/a.c/a.c.d/issue.json").is_file());

    let grandchild = store.storage.get_issue(&id("a.c.d")).await.unwrap().unwrap();
    assert_eq!(grandchild.parent_id, Some(id("a.c")));
    assert_eq!(
        store.storage.record_path(&id("a.c.d")).await.unwrap(),
        Some(issues.join("b/a.c/a.c.d/issue.json"))
    );
}

#[rstest]
#[tokio::test]
async fn test_move_to_root(#[future] store: Store) {
    let mut store = store.await;
    store.storage.save_issue(&issue("a", None)).await.unwrap();
    store.storage.save_issue(&issue("a.b", Some("a"))).await.unwrap();

    store
        .storage
        .update_issue(
            &id("a.b"),
            IssueUpdate {
                parent_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(store.issues_dir().join("a.b/issue.json").is_file());
    assert!(!store.issues_dir().join("a/a.b").exists());
}

#[rstest]
#[tokio::test]
async fn test_delete_with_children_fails(#[future] store: Store) {
    let mut store = store.await;
    store.storage.save_issue(&issue("a", None)).await.unwrap();
    store.storage.save_issue(&issue("a.b", Some("a"))).await.unwrap();

    let result = store.storage.delete_issue(&id("a")).await;
    assert!(matches!(
        result,
        Err(Error::Storage(StorageError::HasChildren(_)))
    ));

    store.storage.delete_issue(&id("a.b")).await.unwrap();
    store.storage.delete_issue(&id("a")).await.unwrap();
    assert!(store.storage.get_issues().await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_missing_targets_are_not_found(#[future] store: Store) {
    let mut store = store.await;

    assert!(store.storage.get_issue(&id("ghost")).await.unwrap().is_none());
    assert!(matches!(
        store.storage.delete_issue(&id("ghost")).await,
        Err(Error::Storage(StorageError::NotFound(_)))
    ));
    assert!(matches!(
        store
            .storage
            .update_issue(&id("ghost"), IssueUpdate::default())
            .await,
        Err(Error::Storage(StorageError::NotFound(_)))
    ));
}

#[rstest]
#[tokio::test]
async fn test_more_records_than_cache_capacity(#[future] store: Store) {
    let mut store = store.await;
    let names: Vec<String> = (0..10).map(|i| format!("issue{i}")).collect();
    for name in &names {
        store.storage.save_issue(&issue(name, None)).await.unwrap();
    }

    for name in &names {
        let loaded = store.storage.get_issue(&id(name)).await.unwrap().unwrap();
        assert_eq!(loaded.status, IssueStatus::Plan);
    }
    assert_eq!(store.storage.get_issues().await.unwrap().len(), names.len());
}

#[rstest]
#[tokio::test]
async fn test_second_handle_sees_writes(#[future] store: Store) {
    let mut store = store.await;
    store.storage.save_issue(&issue("a", None)).await.unwrap();

    let other = FileStorage::open(store.dir.path(), 4);
    let loaded = other.get_issue(&id("a")).await.unwrap();
    assert!(loaded.is_some());
}
