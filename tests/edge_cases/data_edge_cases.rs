//! Edge case tests for data-related scenarios

use crate::common::{sample_data, CliTestRunner, TestFixture};
use datalineage::version::{VersionLoader, PROCESSED_FILE};
use datalineage::LineageError;
use serde_json::json;
use std::fs;

#[test]
fn test_header_only_csv_is_rejected() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture.create_csv_raw("header.csv", "id,text,label\n").unwrap();

    let err = fixture.commit_default(&data, "header only").unwrap_err();
    assert!(matches!(err, LineageError::Validation { .. }), "got {}", err);
    assert!(fixture.head().is_none());
    assert!(fixture.store().list_version_ids().unwrap().is_empty());
}

#[test]
fn test_empty_file_is_rejected() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture.create_csv_raw("empty.csv", "").unwrap();

    assert!(fixture.commit_default(&data, "empty").is_err());
    assert!(fixture.head().is_none());
}

#[test]
fn test_json_dataset() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture
        .create_json("reviews.json", &sample_data::reviews_json_data())
        .unwrap();

    let outcome = fixture.commit_default(&data, "from json").unwrap();
    assert!(outcome.is_created());
    assert_eq!(outcome.rows_after, 3);

    let version_dir = fixture.workspace.version_dir(&outcome.version_id);
    let info = VersionLoader::load_processed_info(&version_dir).unwrap();
    assert_eq!(info.column_names(), vec!["id", "text", "label"]);
}

#[test]
fn test_same_content_in_csv_and_json_dedupes() {
    let fixture = TestFixture::new().unwrap();
    let csv = fixture
        .create_csv_raw("reviews.csv", "id,text,label\n1,Great,1\n2,Bad,0\n")
        .unwrap();
    let json_data = fixture
        .create_json(
            "reviews.json",
            &json!([
                {"id": 2, "text": "Bad", "label": 0},
                {"id": 1, "text": "Great", "label": 1}
            ]),
        )
        .unwrap();

    let first = fixture.commit_default(&csv, "csv").unwrap();
    let second = fixture.commit_default(&json_data, "json").unwrap();
    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(first.version_id, second.version_id);
}

#[test]
fn test_rows_that_clean_to_nothing_give_empty_version() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture
        .create_csv_raw("sentinels.csv", "a,b\nN/A,none\n?,-\n")
        .unwrap();

    let outcome = fixture.commit_default(&data, "all sentinels").unwrap();
    assert!(outcome.is_created());
    assert_eq!(outcome.rows_before, 2);
    assert_eq!(outcome.rows_after, 0);

    let processed = fs::read_to_string(
        fixture
            .workspace
            .version_dir(&outcome.version_id)
            .join(PROCESSED_FILE),
    )
    .unwrap();
    assert_eq!(processed, "a,b\n");
}

#[test]
fn test_csv_with_unicode_bom_and_crlf() {
    let fixture = TestFixture::new().unwrap();
    let plain = fixture
        .create_csv_raw("plain.csv", "text,label\nhello,1\nworld,0\n")
        .unwrap();
    let windows = fixture
        .create_csv_raw("windows.csv", "\u{FEFF}text,label\r\nhello,1\r\nworld,0\r\n")
        .unwrap();

    let first = fixture.commit_default(&plain, "plain").unwrap();
    let second = fixture.commit_default(&windows, "windows").unwrap();
    assert_eq!(first.version_id, second.version_id);
    // Raw bytes differ even though the processed output does not
    let log = fixture.store().read_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].event_type(), "dedupe_hit");
}

#[test]
fn test_csv_with_quoted_commas() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture
        .create_csv_raw(
            "quoted.csv",
            "text,label\n\"Hello, World!\",1\n\"a \"\"quoted\"\" word\",0\n",
        )
        .unwrap();
    let config = fixture
        .create_config("config.json", &json!({"remove_punctuation": false}))
        .unwrap();

    let outcome = fixture.commit_with_config(&data, &config, "quoted").unwrap();
    let processed = fs::read_to_string(
        fixture
            .workspace
            .version_dir(&outcome.version_id)
            .join(PROCESSED_FILE),
    )
    .unwrap();
    assert_eq!(
        processed,
        "text,label\n\"a \"\"quoted\"\" word\",0\n\"hello, world!\",1\n"
    );
}

#[test]
fn test_csv_with_duplicate_headers() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture
        .create_csv_raw("dupes.csv", "Text,text,label\na,b,1\n")
        .unwrap();

    let outcome = fixture.commit_default(&data, "dupes").unwrap();
    let metadata = fixture.store().find_record(&outcome.version_id).unwrap();
    let columns = &metadata.preprocess_stats.columns_after;
    let mut unique = columns.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), columns.len(), "columns: {:?}", columns);
}

#[test]
fn test_dataset_without_label_column() {
    let fixture = TestFixture::new().unwrap();
    let data = fixture
        .create_csv_raw("nolabel.csv", "id,text\n1,hello\n")
        .unwrap();

    let outcome = fixture.commit_default(&data, "no label").unwrap();
    let metadata = fixture.store().find_record(&outcome.version_id).unwrap();
    assert!(metadata.record.label_distribution.is_empty());
}

#[test]
fn test_unsupported_format_is_rejected() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner.fixture().root().join("data.xlsx");
    fs::write(&path, "not really a spreadsheet").unwrap();

    let err = runner.expect_failure(&["commit", path.to_str().unwrap(), "-m", "xlsx"]);
    assert!(matches!(err, LineageError::Validation { .. }));
}
