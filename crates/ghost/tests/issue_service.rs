//! Integration tests for the issue service over the file store.

use ghost::domain::{IssueFilter, IssueId, IssueStatus, NewIssue};
use ghost::error::Error;
use ghost::service::IssueService;
use ghost::storage::IssueStorage;
use ghost::storage::file::FileStorage;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
    storage: FileStorage,
}

#[fixture]
async fn project() -> Project {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path(), 200);
    storage.init().await.unwrap();
    Project { dir, storage }
}

async fn create(service: &mut IssueService<'_>, title: &str, parent: Option<&IssueId>) -> IssueId {
    let mut new_issue = NewIssue::titled(title);
    new_issue.parent_id = parent.cloned();
    service.create_issue(new_issue).await.unwrap().id
}

async fn advance(service: &mut IssueService<'_>, id: &IssueId, statuses: &[IssueStatus]) {
    for status in statuses {
        service.update_issue_status(id, *status).await.unwrap();
    }
}

fn ids(issues: &[ghost::domain::Issue]) -> Vec<IssueId> {
    issues.iter().map(|issue| issue.id.clone()).collect()
}

#[rstest]
#[tokio::test]
async fn test_available_issues_follow_dependencies(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);

    let dependency = create(&mut service, "Dependency", None).await;
    let dependent = create(&mut service, "Dependent", None).await;
    advance(&mut service, &dependency, &[IssueStatus::Backlog]).await;
    advance(&mut service, &dependent, &[IssueStatus::Backlog]).await;
    service.add_dependency(&dependent, &dependency).await.unwrap();

    let available = service.get_available_issues().await.unwrap();
    assert_eq!(ids(&available), vec![dependency.clone()]);

    advance(
        &mut service,
        &dependency,
        &[IssueStatus::InProgress, IssueStatus::Done],
    )
    .await;

    let available = service.get_available_issues().await.unwrap();
    assert_eq!(ids(&available), vec![dependent]);
}

#[rstest]
#[tokio::test]
async fn test_four_level_chain_and_depth_limit(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);

    let l1 = create(&mut service, "L1", None).await;
    let l2 = create(&mut service, "L2", Some(&l1)).await;
    let l3 = create(&mut service, "L3", Some(&l2)).await;
    let l4 = create(&mut service, "L4", Some(&l3)).await;

    let result = service
        .create_issue(NewIssue::titled("L5").under(l4.clone()))
        .await;
    assert!(matches!(
        result,
        Err(Error::MaxDepthExceeded {
            depth: 5,
            max_depth: 4,
            ..
        })
    ));

    let record = project.dir.path().join(format!(
        ".ghost/issues/{l1}/{l2}/{l3}/{l4}/issue.json"
    ));
    assert!(record.is_file());
}

#[rstest]
#[tokio::test]
async fn test_reverse_dependency_is_rejected_without_changes(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);

    let a = create(&mut service, "A", None).await;
    let b = create(&mut service, "B", None).await;
    service.add_dependency(&a, &b).await.unwrap();
    let before = service.get_issues(&IssueFilter::default()).await.unwrap();

    let result = service.add_dependency(&b, &a).await;
    match result {
        Err(Error::CircularDependency { cycle, .. }) => {
            assert_eq!(cycle, vec![b.clone(), a.clone(), b.clone()]);
        }
        other => panic!("Expected a cycle error, got {other:?}"),
    }

    let after = service.get_issues(&IssueFilter::default()).await.unwrap();
    assert_eq!(before, after);
}

#[rstest]
#[tokio::test]
async fn test_self_dependency_fails(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let a = create(&mut service, "A", None).await;

    let err = service.add_dependency(&a, &a).await.unwrap_err();
    assert_eq!(err.code(), "circular_dependency");
}

#[rstest]
#[tokio::test]
async fn test_transitive_cycle_is_reported_with_path(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let a = create(&mut service, "A", None).await;
    let b = create(&mut service, "B", None).await;
    let c = create(&mut service, "C", None).await;
    service.add_dependency(&a, &b).await.unwrap();
    service.add_dependency(&b, &c).await.unwrap();

    match service.add_dependency(&c, &a).await {
        Err(Error::CircularDependency { cycle, .. }) => {
            assert_eq!(cycle, vec![c.clone(), a.clone(), b.clone(), c.clone()]);
        }
        other => panic!("Expected a cycle error, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn test_invalid_transitions_are_rejected(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let a = create(&mut service, "A", None).await;

    let result = service.update_issue_status(&a, IssueStatus::Done).await;
    assert!(matches!(
        result,
        Err(Error::InvalidStateTransition {
            from: IssueStatus::Plan,
            to: IssueStatus::Done,
            ..
        })
    ));

    advance(&mut service, &a, &[IssueStatus::Cancelled]).await;
    let result = service.approve_issue(&a).await;
    assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
}

#[rstest]
#[tokio::test]
async fn test_set_children_moves_records(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let parent = create(&mut service, "Parent", None).await;
    let old_child = create(&mut service, "Old child", Some(&parent)).await;
    let new_child = create(&mut service, "New child", None).await;

    service
        .set_children(&parent, &[new_child.clone()])
        .await
        .unwrap();

    let children = service.get_children(&parent).await.unwrap();
    assert_eq!(ids(&children), vec![new_child.clone()]);
    let old = service.get_issue(&old_child).await.unwrap().unwrap();
    assert_eq!(old.parent_id, None);

    let issues_dir = project.dir.path().join(".ghost/issues");
    assert!(issues_dir.join(format!("{parent}/{new_child}/issue.json")).is_file());
    assert!(issues_dir.join(format!("{old_child}/issue.json")).is_file());
}

#[rstest]
#[tokio::test]
async fn test_set_children_rejects_ancestor(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let root = create(&mut service, "Root", None).await;
    let child = create(&mut service, "Child", Some(&root)).await;
    let sibling = create(&mut service, "Sibling", None).await;

    let result = service
        .set_children(&child, &[sibling.clone(), root.clone()])
        .await;
    assert!(matches!(result, Err(Error::CircularHierarchy { .. })));

    // Nothing moved.
    let sibling = service.get_issue(&sibling).await.unwrap().unwrap();
    assert_eq!(sibling.parent_id, None);
}

#[rstest]
#[tokio::test]
async fn test_set_children_checks_subtree_depth(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let a1 = create(&mut service, "A1", None).await;
    let a2 = create(&mut service, "A2", Some(&a1)).await;
    let a3 = create(&mut service, "A3", Some(&a2)).await;
    let b1 = create(&mut service, "B1", None).await;
    create(&mut service, "B2", Some(&b1)).await;

    let result = service.set_children(&a3, &[b1.clone()]).await;
    assert!(matches!(
        result,
        Err(Error::MaxDepthExceeded { depth: 5, .. })
    ));

    service.set_children(&a2, &[a3.clone(), b1.clone()]).await.unwrap();
    assert_eq!(service.get_children(&a2).await.unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_archive_descendants_first(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let root = create(&mut service, "Root", None).await;
    let child = create(&mut service, "Child", Some(&root)).await;
    let grandchild = create(&mut service, "Grandchild", Some(&child)).await;

    let archived = service.archive_issue(&root).await.unwrap();
    assert_eq!(archived, vec![grandchild.clone(), child, root.clone()]);

    for issue in service.get_issues(&IssueFilter::default()).await.unwrap() {
        assert!(issue.is_archived());
    }
    assert!(service.archive_issue(&root).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_archived_issues_are_not_available(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let a = create(&mut service, "A", None).await;
    advance(&mut service, &a, &[IssueStatus::Backlog]).await;
    service.archive_issue(&a).await.unwrap();

    assert!(service.get_available_issues().await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_progress_rolls_up_leaves(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let root = create(&mut service, "Root", None).await;
    let done = create(&mut service, "Done", Some(&root)).await;
    create(&mut service, "Open", Some(&root)).await;
    create(&mut service, "Also open", Some(&root)).await;
    advance(
        &mut service,
        &done,
        &[IssueStatus::Backlog, IssueStatus::InProgress, IssueStatus::Done],
    )
    .await;

    let progress = service.calculate_progress(&root).await.unwrap();
    assert_eq!((progress.completed, progress.total, progress.percentage), (1, 3, 33));

    let missing = IssueId::parse("missing").unwrap();
    assert!(matches!(
        service.calculate_progress(&missing).await,
        Err(Error::IssueNotFound(_))
    ));
}

#[rstest]
#[tokio::test]
async fn test_delete_after_children_removed(#[future] project: Project) {
    let mut project = project.await;
    let mut service = IssueService::new(&mut project.storage);
    let parent = create(&mut service, "Parent", None).await;
    let child = create(&mut service, "Child", Some(&parent)).await;

    assert_eq!(
        service.delete_issue(&parent).await.unwrap_err().code(),
        "storage_error"
    );
    service.delete_issue(&child).await.unwrap();
    service.delete_issue(&parent).await.unwrap();

    assert!(project.storage.get_issues().await.unwrap().is_empty());
}
