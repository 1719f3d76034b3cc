//! Integration tests for the init command

use crate::common::{assertions, CliTestRunner, TestFixture};
use datalineage::{LineageError, LineageWorkspace, RepoStore};
use std::fs;

#[test]
fn test_init_command_success() {
    let runner = CliTestRunner::new_uninitialized().unwrap();

    runner.expect_success(&["init"]);

    let fixture = runner.fixture();
    assertions::assert_dir_exists(&fixture.workspace.repo_dir);
    assertions::assert_dir_exists(&fixture.workspace.versions_dir);
    assertions::assert_file_exists_and_not_empty(&fixture.workspace.log_path);
    assertions::assert_json_contains_keys(
        &fixture.workspace.meta_path,
        &["format_version", "created", "tool_version"],
    )
    .unwrap();

    assert_eq!(fs::read_to_string(&fixture.workspace.head_path).unwrap(), "");
    assert_eq!(fs::read_to_string(&fixture.workspace.log_path).unwrap().trim(), "[]");
    assert!(fixture.workspace.is_initialized());
}

#[test]
fn test_init_is_idempotent() {
    let runner = CliTestRunner::new_uninitialized().unwrap();

    runner.expect_success(&["init"]);
    runner.expect_success(&["init"]);

    let fixture = runner.fixture();
    assert!(fixture.store().read_log().is_empty());
    assert!(fixture.head().is_none());
}

#[test]
fn test_init_preserves_head_and_log() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture
        .create_csv_raw("data.csv", "text,label\nhello,1\n")
        .unwrap();
    let outcome = fixture.commit_default(&data, "first").unwrap();

    LineageWorkspace::init(fixture.root().to_path_buf(), true).unwrap();

    assert_eq!(fixture.head(), Some(outcome.version_id));
    assert_eq!(fixture.store().read_log().len(), 1);
}

#[test]
fn test_init_with_force_rewrites_meta() {
    let runner = CliTestRunner::new().unwrap();
    let meta_path = runner.fixture().workspace.meta_path.clone();
    fs::write(&meta_path, r#"{"modified": true}"#).unwrap();

    runner.expect_success(&["init"]);
    assert!(fs::read_to_string(&meta_path).unwrap().contains("modified"));

    runner.expect_success(&["init", "--force"]);
    assertions::assert_json_contains_keys(&meta_path, &["format_version", "created"]).unwrap();
}

#[test]
fn test_init_with_custom_workspace() {
    let runner = CliTestRunner::new_uninitialized().unwrap();
    let target = runner.fixture().root().join("project");
    fs::create_dir_all(&target).unwrap();

    runner.expect_success(&["--workspace", target.to_str().unwrap(), "init"]);

    assertions::assert_dir_exists(&target.join(".datalineage").join("versions"));
    assert!(!runner.fixture().workspace.is_initialized());
}

#[test]
fn test_commands_require_initialized_repository() {
    let runner = CliTestRunner::new_uninitialized().unwrap();

    for args in [
        vec!["status"],
        vec!["log"],
        vec!["show"],
        vec!["checkout", "HEAD"],
        vec!["diff", "HEAD~1", "HEAD"],
    ] {
        let err = runner.expect_failure(&args);
        assert!(
            matches!(err, LineageError::NotInitialized { .. }),
            "{:?} should report an uninitialized repository, got {}",
            args,
            err
        );
    }
}

#[test]
fn test_open_rejects_partial_layout() {
    let fixture = TestFixture::new().unwrap();
    fs::remove_file(&fixture.workspace.head_path).unwrap();

    assert!(matches!(
        RepoStore::open(fixture.workspace.clone()),
        Err(LineageError::NotInitialized { .. })
    ));
}

#[test]
fn test_locate_walks_up_to_repository() {
    let fixture = TestFixture::new().unwrap();
    let nested = fixture.root().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let located = LineageWorkspace::locate(Some(&nested)).unwrap();
    assert_eq!(located.root, fixture.root());
}

#[test]
fn test_status_reports_empty_repository() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["status"]);
    runner.expect_success(&["status", "--format", "json"]);

    let status = runner.fixture().store().status().unwrap();
    assert!(status.head.is_none());
    assert_eq!(status.log_entries, 0);
    assert_eq!(status.stats.version_count, 0);
}
