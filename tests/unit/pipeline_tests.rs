//! Unit tests for the preprocessing pipeline and canonical hashing

use datalineage::config::{NullStrategy, PreprocessConfig};
use datalineage::hash::{canonicalize_config, canonicalize_table, digest, is_version_id};
use datalineage::preprocess::{clean_text, process};
use datalineage::table::{Column, ColumnKind, Table, Value};
use serde_json::json;

fn text(s: &str) -> Option<Value> {
    Some(Value::text(s))
}

fn names_table() -> Table {
    Table::from_rows(
        vec![
            Column::new("Name", ColumnKind::Text),
            Column::new("Label", ColumnKind::Number),
        ],
        vec![
            vec![text("Bob"), Some(Value::Int(1))],
            vec![text("bob "), Some(Value::Int(1))],
            vec![text("Amy"), Some(Value::Int(0))],
        ],
    )
    .unwrap()
}

#[test]
fn test_default_pipeline_collapses_and_sorts() {
    let processed = process(&names_table(), &PreprocessConfig::default());

    assert_eq!(processed.column_names(), vec!["name", "label"]);
    assert_eq!(processed.row_count(), 2);
    assert_eq!(
        String::from_utf8(canonicalize_table(&processed)).unwrap(),
        "name,label\namy,0\nbob,1\n"
    );
}

#[test]
fn test_pipeline_is_deterministic() {
    let config = PreprocessConfig::default();
    let first = canonicalize_table(&process(&names_table(), &config));
    let second = canonicalize_table(&process(&names_table(), &config));
    assert_eq!(digest(&first), digest(&second));
}

#[test]
fn test_pipeline_is_idempotent_under_defaults() {
    let config = PreprocessConfig::default();
    let once = process(&names_table(), &config);
    let twice = process(&once, &config);
    assert_eq!(canonicalize_table(&once), canonicalize_table(&twice));
}

#[test]
fn test_clean_text_steps() {
    let config = PreprocessConfig::default();
    assert_eq!(clean_text("  Hello,   World!  ", &config), "hello world");

    let keep_punct = PreprocessConfig {
        remove_punctuation: false,
        ..PreprocessConfig::default()
    };
    assert_eq!(clean_text("Hello, World!", &keep_punct), "hello, world!");

    let keep_case = PreprocessConfig {
        lowercase_text: false,
        ..PreprocessConfig::default()
    };
    assert_eq!(clean_text("Hello World", &keep_case), "Hello World");
}

#[test]
fn test_url_removal_is_opt_in() {
    let config = PreprocessConfig {
        remove_urls: true,
        ..PreprocessConfig::default()
    };
    assert_eq!(clean_text("see https://example.com now", &config), "see now");
}

#[test]
fn test_sentinels_become_null_and_drop() {
    let table = Table::from_rows(
        vec![Column::new("text", ColumnKind::Text)],
        vec![vec![text("N/A")], vec![text("ok")], vec![text(" none ")], vec![None]],
    )
    .unwrap();

    let processed = process(&table, &PreprocessConfig::default());
    assert_eq!(processed.row_count(), 1);
    assert_eq!(
        String::from_utf8(canonicalize_table(&processed)).unwrap(),
        "text\nok\n"
    );
}

#[test]
fn test_fill_strategy_fills_by_kind() {
    let table = Table::from_rows(
        vec![
            Column::new("text", ColumnKind::Text),
            Column::new("score", ColumnKind::Number),
        ],
        vec![
            vec![None, Some(Value::Int(3))],
            vec![text("b"), None],
        ],
    )
    .unwrap();

    let config = PreprocessConfig::from_json_value(&json!({
        "drop_nulls": false,
        "null_strategy": "fill",
        "null_fill_text": "missing",
        "null_fill_numeric": 0
    }))
    .unwrap();
    assert_eq!(config.effective_null_strategy(), NullStrategy::Fill);

    let processed = process(&table, &config);
    assert_eq!(processed.row_count(), 2);
    assert_eq!(
        String::from_utf8(canonicalize_table(&processed)).unwrap(),
        "text,score\nb,0\nmissing,3\n"
    );
}

#[test]
fn test_numeric_text_columns_are_coerced() {
    let table = Table::from_rows(
        vec![Column::new("amount", ColumnKind::Text)],
        vec![vec![text("10")], vec![text("2")]],
    )
    .unwrap();

    let processed = process(&table, &PreprocessConfig::default());
    assert_eq!(processed.columns()[0].kind, ColumnKind::Number);
    // Numeric sort, not lexicographic
    assert_eq!(
        String::from_utf8(canonicalize_table(&processed)).unwrap(),
        "amount\n2\n10\n"
    );
}

#[test]
fn test_duplicate_labels_are_suffixed() {
    let table = Table::from_rows(
        vec![
            Column::new("Text", ColumnKind::Text),
            Column::new("text ", ColumnKind::Text),
        ],
        vec![vec![text("a"), text("b")]],
    )
    .unwrap();

    let processed = process(&table, &PreprocessConfig::default());
    assert_eq!(processed.column_names(), vec!["text", "text_2"]);
}

#[test]
fn test_config_merge_and_validation() {
    let config = PreprocessConfig::from_json_value(&json!({
        "lowercase_text": false,
        "not_a_key": 12
    }))
    .unwrap();
    assert!(!config.lowercase_text);
    assert!(config.remove_punctuation);

    assert!(PreprocessConfig::from_json_value(&json!({"sort_rows": "yes"})).is_err());
    assert!(PreprocessConfig::from_json_value(&json!([1, 2])).is_err());
    assert!(PreprocessConfig::from_json_value(&json!({"null_strategy": "sometimes"})).is_err());
}

#[test]
fn test_config_hash_ignores_key_order() {
    let a = PreprocessConfig::from_json_value(&json!({"sort_rows": false, "remove_urls": true}))
        .unwrap();
    let b = PreprocessConfig::from_json_value(&json!({"remove_urls": true, "sort_rows": false}))
        .unwrap();
    assert_eq!(
        digest(&canonicalize_config(&a).unwrap()),
        digest(&canonicalize_config(&b).unwrap())
    );

    let c = PreprocessConfig::default();
    assert_ne!(
        digest(&canonicalize_config(&a).unwrap()),
        digest(&canonicalize_config(&c).unwrap())
    );
}

#[test]
fn test_digest_shape() {
    let id = digest(b"name\namy\n");
    assert!(is_version_id(&id));
    assert_eq!(
        digest(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

fn two_text_columns(rows: &[(&str, &str)]) -> Table {
    Table::from_rows(
        vec![
            Column::new("a", ColumnKind::Text),
            Column::new("b", ColumnKind::Text),
        ],
        rows.iter().map(|(a, b)| vec![text(a), text(b)]).collect(),
    )
    .unwrap()
}

#[test]
fn test_custom_unwanted_values_replace_defaults() {
    let config = PreprocessConfig::from_json_value(&json!({"unwanted_values": ["missing"]}))
        .unwrap();
    let table = two_text_columns(&[("x", "MISSING "), ("y", "ok"), ("z", "n/a")]);

    let processed = process(&table, &config);
    // "n/a" is no longer a sentinel, so it survives as cleaned text
    assert_eq!(
        String::from_utf8(canonicalize_table(&processed)).unwrap(),
        "a,b\ny,ok\nz,n a\n"
    );
}

#[test]
fn test_collapse_spaces_can_be_disabled() {
    let config = PreprocessConfig {
        collapse_spaces: false,
        ..PreprocessConfig::default()
    };
    assert_eq!(clean_text("  a  b  ", &config), "a  b");
    assert_eq!(clean_text("  a  b  ", &PreprocessConfig::default()), "a b");
}

#[test]
fn test_normalize_unicode_can_be_disabled() {
    let keep_punct = PreprocessConfig {
        remove_punctuation: false,
        ..PreprocessConfig::default()
    };
    let raw_width = PreprocessConfig {
        normalize_unicode: false,
        ..keep_punct.clone()
    };
    assert_eq!(clean_text("ＡＢＣ", &keep_punct), "abc");
    assert_eq!(clean_text("ＡＢＣ", &raw_width), "ａｂｃ");
}

#[test]
fn test_final_trim_applies_without_strip_text() {
    let config = PreprocessConfig {
        strip_text: false,
        collapse_spaces: false,
        remove_punctuation: false,
        lowercase_text: false,
        ..PreprocessConfig::default()
    };
    assert_eq!(clean_text("  Hi  there  ", &config), "Hi  there");

    let with_strip = PreprocessConfig {
        strip_text: true,
        ..config.clone()
    };
    assert_eq!(
        clean_text("  Hi  there  ", &with_strip),
        clean_text("  Hi  there  ", &config)
    );
}

#[test]
fn test_empty_text_and_null_are_duplicates() {
    let config = PreprocessConfig::from_json_value(&json!({
        "drop_nulls": false,
        "null_strategy": "keep"
    }))
    .unwrap();
    // "!!!" cleans to an empty string, "n/a" becomes null; both render as an empty field
    let table = two_text_columns(&[("x", "!!!"), ("x", "n/a")]);

    let processed = process(&table, &config);
    let bytes = canonicalize_table(&processed);
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), "a,b\nx,\n");
    assert_eq!(canonicalize_table(&process(&processed, &config)), bytes);
}
