//! Complete command-line workflows

use crate::common::{sample_data, CliTestRunner};
use datalineage::LineageError;
use serde_json::json;

#[test]
fn test_complete_workflow() {
    let runner = CliTestRunner::new_uninitialized().unwrap();
    runner.expect_success(&["init"]);

    let fixture = runner.fixture();
    let base = fixture
        .create_csv("reviews.csv", &sample_data::reviews_csv_data())
        .unwrap();
    let extended = fixture
        .create_csv("reviews_v2.csv", &sample_data::reviews_extended_csv_data())
        .unwrap();

    runner.expect_success(&["commit", base.to_str().unwrap(), "-m", "base"]);
    let v1 = fixture.head().unwrap();
    runner.expect_success(&["commit", extended.to_str().unwrap(), "-m", "extended"]);
    let v2 = fixture.head().unwrap();
    assert_ne!(v1, v2);

    runner.expect_success(&["status"]);
    runner.expect_success(&["log"]);
    runner.expect_success(&["log", "--all", "--format", "json"]);
    runner.expect_success(&["show"]);
    runner.expect_success(&["show", &v1[..10], "--format", "json"]);
    runner.expect_success(&["diff", &v1, &v2]);

    let status = fixture.store().status().unwrap();
    assert_eq!(status.head.as_deref(), Some(v2.as_str()));
    assert_eq!(status.stats.version_count, 2);
    assert_eq!(status.stats.report_count, 1);
    assert_eq!(status.log_entries, 2);
    fixture.assert_head_valid();
}

#[test]
fn test_checkout_moves_head_and_parents_follow() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let base = fixture
        .create_csv("reviews.csv", &sample_data::reviews_csv_data())
        .unwrap();
    let extended = fixture
        .create_csv("reviews_v2.csv", &sample_data::reviews_extended_csv_data())
        .unwrap();
    let names = fixture
        .create_csv_raw("names.csv", sample_data::scenario_csv())
        .unwrap();

    runner.expect_success(&["commit", base.to_str().unwrap(), "-m", "base"]);
    let v1 = fixture.head().unwrap();
    runner.expect_success(&["commit", extended.to_str().unwrap(), "-m", "extended"]);

    runner.expect_success(&["checkout", "HEAD~1"]);
    assert_eq!(fixture.head(), Some(v1.clone()));

    runner.expect_success(&["commit", names.to_str().unwrap(), "-m", "branch"]);
    let v3 = fixture.head().unwrap();
    let record = fixture.store().find_record(&v3).unwrap();
    assert_eq!(record.record.parent_id, Some(v1));

    // Checkout does not log anything
    assert_eq!(fixture.store().read_log().len(), 3);
}

#[test]
fn test_recommit_chain_via_cli() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let data = fixture
        .create_csv_raw("greeting.csv", "text,label\n\"Hello, World!\",1\n\"Good Bye\",0\n")
        .unwrap();
    let keep_all = fixture
        .create_config(
            "keep_all.json",
            &json!({"lowercase_text": false, "remove_punctuation": false}),
        )
        .unwrap();
    let lower = fixture
        .create_config("lower.json", &json!({"remove_punctuation": false}))
        .unwrap();
    let defaults = fixture.create_config("defaults.json", &json!({})).unwrap();

    let steps = [
        vec!["commit", data.to_str().unwrap(), "-c", keep_all.to_str().unwrap(), "-m", "raw"],
        vec!["commit", "--from-head", "-c", lower.to_str().unwrap(), "-m", "lowercase"],
        vec!["commit", "--from-head", "-c", defaults.to_str().unwrap(), "-m", "strip punctuation"],
    ];

    let mut heads = Vec::new();
    for args in &steps {
        runner.expect_success(args);
        heads.push(fixture.head().unwrap());
    }

    let store = fixture.store();
    assert_eq!(store.list_version_ids().unwrap().len(), 3);
    for window in heads.windows(2) {
        let child = store.find_record(&window[1]).unwrap();
        assert_eq!(child.record.parent_id.as_deref(), Some(window[0].as_str()));
    }

    runner.expect_success(&["diff", "HEAD~2", "HEAD"]);
}

#[test]
fn test_show_without_head_fails() {
    let runner = CliTestRunner::new().unwrap();
    let err = runner.expect_failure(&["show"]);
    assert!(matches!(err, LineageError::Validation { .. }));
}

#[test]
fn test_invalid_format_is_rejected() {
    let runner = CliTestRunner::new().unwrap();
    let err = runner.expect_failure(&["status", "--format", "yaml"]);
    assert!(matches!(err, LineageError::Validation { .. }));
}
