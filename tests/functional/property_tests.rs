//! Repository-wide properties that must hold after any sequence of commits

use crate::common::{sample_data, TestFixture};
use datalineage::hash::digest;
use datalineage::version::{VersionLoader, PROCESSED_FILE};
use serde_json::json;
use std::collections::HashSet;
use std::fs;

/// Commit a handful of datasets and configs, some of them repeated
fn busy_repository() -> TestFixture {
    let fixture = TestFixture::new().unwrap();
    let base = fixture
        .create_csv("reviews.csv", &sample_data::reviews_csv_data())
        .unwrap();
    let extended = fixture
        .create_csv("reviews_v2.csv", &sample_data::reviews_extended_csv_data())
        .unwrap();
    let names = fixture
        .create_csv_raw("names.csv", sample_data::scenario_csv())
        .unwrap();
    let keep_case = fixture
        .create_config("keep_case.json", &json!({"lowercase_text": false}))
        .unwrap();

    fixture.commit_default(&base, "base").unwrap();
    fixture.commit_default(&extended, "extended").unwrap();
    fixture.commit_default(&base, "base again").unwrap();
    fixture.commit_with_config(&names, &keep_case, "names").unwrap();
    fixture.commit_from_head(&keep_case, "recommit").unwrap();
    fixture.commit_default(&names, "names default").unwrap();
    fixture.assert_head_valid();
    fixture
}

#[test]
fn test_every_version_id_matches_its_processed_bytes() {
    let fixture = busy_repository();
    let store = fixture.store();

    for id in store.list_version_ids().unwrap() {
        let version_dir = store.version_dir(&id);
        let bytes = fs::read(version_dir.join(PROCESSED_FILE)).unwrap();
        assert_eq!(digest(&bytes), id);

        let metadata = VersionLoader::load_metadata(&version_dir).unwrap();
        assert_eq!(metadata.record.version_id, id);
        assert_eq!(metadata.record.version_hash, id);
    }
}

#[test]
fn test_parents_are_published_versions() {
    let fixture = busy_repository();
    let store = fixture.store();

    for record in store.commit_records() {
        if let Some(parent) = &record.record.parent_id {
            assert!(store.version_exists(parent), "parent {} is missing", parent);
            assert_ne!(parent, &record.record.version_id);
        }
    }
}

#[test]
fn test_commit_events_are_unique_per_version() {
    let fixture = busy_repository();
    let store = fixture.store();

    let records = store.commit_records();
    let ids: HashSet<&str> = records
        .iter()
        .map(|m| m.record.version_id.as_str())
        .collect();
    assert_eq!(ids.len(), records.len());
    assert_eq!(ids.len(), store.list_version_ids().unwrap().len());
}

#[test]
fn test_log_timestamps_are_ordered() {
    let fixture = busy_repository();
    let log = fixture.store().read_log();

    assert!(log.len() >= 6);
    for pair in log.windows(2) {
        assert!(pair[0].timestamp() <= pair[1].timestamp());
    }
}

#[test]
fn test_versions_are_never_rewritten() {
    let fixture = TestFixture::new().unwrap();
    let base = fixture
        .create_csv("reviews.csv", &sample_data::reviews_csv_data())
        .unwrap();
    let outcome = fixture.commit_default(&base, "base").unwrap();

    let metadata_path = outcome.metadata_path.clone();
    let before = fs::read(&metadata_path).unwrap();
    fixture.commit_default(&base, "same again").unwrap();
    fixture.commit_default(&base, "and again").unwrap();
    assert_eq!(fs::read(&metadata_path).unwrap(), before);
}

#[test]
fn test_determinism_across_repositories() {
    let first = TestFixture::new().unwrap();
    let second = TestFixture::new().unwrap();

    let a = first
        .create_csv("reviews.csv", &sample_data::reviews_csv_data())
        .unwrap();
    let b = second
        .create_csv("other_name.csv", &sample_data::reviews_csv_data())
        .unwrap();

    let outcome_a = first.commit_default(&a, "one").unwrap();
    let outcome_b = second.commit_default(&b, "two").unwrap();
    assert_eq!(outcome_a.version_id, outcome_b.version_id);

    let record_a = first.store().find_record(&outcome_a.version_id).unwrap().record;
    let record_b = second.store().find_record(&outcome_b.version_id).unwrap().record;
    assert_eq!(record_a.config_hash, record_b.config_hash);
    assert_eq!(record_a.input_hash, record_b.input_hash);
}
