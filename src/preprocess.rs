//! Deterministic preprocessing pipeline.
//!
//! The order of the stages below is part of the version identity: any change
//! to it, or to what a stage does, changes the hash of every future version.
//!
//! 1. normalize column labels
//! 2. nullify sentinel tokens in text columns
//! 3. per-cell text cleanup
//! 4. numeric coercion of text columns
//! 5. null strategy
//! 6. exact duplicate removal (first occurrence wins)
//! 7. stable lexicographic sort over all columns, nulls last
//! 8. contiguous row indices (implicit in the row vector)

use crate::config::{NullStrategy, PreprocessConfig};
use crate::table::{Cell, ColumnKind, Table, Value};
use rayon::prelude::*;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn re_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+|www\.\S+").expect("URL pattern is valid"))
}

fn re_punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9\s]").expect("punctuation pattern is valid"))
}

fn re_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn re_numeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("numeric pattern is valid"))
}

/// Pure transformation from a raw table to its canonical cleaned form
pub struct Preprocessor<'a> {
    config: &'a PreprocessConfig,
}

impl<'a> Preprocessor<'a> {
    pub fn new(config: &'a PreprocessConfig) -> Self {
        Self { config }
    }

    /// Run every stage in order. Never fails.
    pub fn process(&self, raw: &Table) -> Table {
        let mut table = raw.clone();

        normalize_column_labels(&mut table);
        self.nullify_sentinels(&mut table);

        if self.config.cleanup_text {
            self.cleanup_text_columns(&mut table);
        }

        if self.config.coerce_numeric_columns {
            coerce_numeric_columns(&mut table);
        }

        self.apply_null_strategy(&mut table);

        if self.config.drop_duplicates {
            drop_duplicate_rows(&mut table);
        }

        if self.config.sort_rows {
            sort_rows(&mut table);
        }

        log::debug!(
            "Preprocessed {} rows x {} columns into {} rows x {} columns",
            raw.row_count(),
            raw.column_count(),
            table.row_count(),
            table.column_count()
        );

        table
    }

    fn nullify_sentinels(&self, table: &mut Table) {
        let unwanted: HashSet<&str> = self
            .config
            .unwanted_values
            .iter()
            .map(|s| s.as_str())
            .collect();
        let text_columns = table.indices_of_kind(ColumnKind::Text);

        for row in table.rows_mut().iter_mut() {
            for &idx in &text_columns {
                let is_sentinel = match &row[idx] {
                    Some(Value::Text(s)) => unwanted.contains(s.trim().to_lowercase().as_str()),
                    _ => false,
                };
                if is_sentinel {
                    row[idx] = None;
                }
            }
        }
    }

    fn cleanup_text_columns(&self, table: &mut Table) {
        let text_columns = table.indices_of_kind(ColumnKind::Text);
        if text_columns.is_empty() {
            return;
        }

        let config = self.config;
        table.rows_mut().par_iter_mut().for_each(|row| {
            for &idx in &text_columns {
                if let Some(Value::Text(s)) = &mut row[idx] {
                    *s = clean_text(s, config);
                }
            }
        });
    }

    fn apply_null_strategy(&self, table: &mut Table) {
        match self.config.effective_null_strategy() {
            NullStrategy::DropAny => {
                table
                    .rows_mut()
                    .retain(|row| row.iter().all(|cell| cell.is_some()));
            }
            NullStrategy::DropAll => {
                table
                    .rows_mut()
                    .retain(|row| row.iter().any(|cell| cell.is_some()));
            }
            NullStrategy::Fill => self.fill_nulls(table),
            NullStrategy::Keep => {}
        }
    }

    fn fill_nulls(&self, table: &mut Table) {
        let numeric_fill = numeric_fill_value(&self.config.null_fill_numeric);
        let text_fill = self.config.null_fill_text.clone();

        for idx in 0..table.column_count() {
            let has_nulls = table.rows().iter().any(|row| row[idx].is_none());
            if !has_nulls {
                continue;
            }

            let kind = table.columns()[idx].kind;
            let fill = match kind {
                ColumnKind::Number => numeric_fill.clone(),
                ColumnKind::Text => Value::Text(text_fill.clone()),
                ColumnKind::Boolean => {
                    // A text fill cannot live in a boolean column
                    convert_column_to_text(table, idx);
                    Value::Text(text_fill.clone())
                }
            };

            for row in table.rows_mut().iter_mut() {
                if row[idx].is_none() {
                    row[idx] = Some(fill.clone());
                }
            }

            if kind == ColumnKind::Number {
                table.unify_number_column(idx);
            }
        }
    }
}

/// Convenience wrapper around [`Preprocessor::process`]
pub fn process(raw: &Table, config: &PreprocessConfig) -> Table {
    Preprocessor::new(config).process(raw)
}

/// Apply the configured cleanup sub-steps to a single text value
pub fn clean_text(value: &str, config: &PreprocessConfig) -> String {
    let mut text = value.to_string();

    if config.normalize_unicode {
        text = text.nfkc().collect();
    }

    if config.strip_text {
        text = text.trim().to_string();
    }

    if config.remove_urls {
        text = re_url().replace_all(&text, " ").into_owned();
    }

    if config.lowercase_text {
        text = text.to_lowercase();
    }

    if config.remove_punctuation {
        text = re_punctuation().replace_all(&text, " ").into_owned();
    }

    if config.collapse_spaces {
        text = re_whitespace().replace_all(&text, " ").into_owned();
    }

    text.trim().to_string()
}

/// Trim and lowercase every label; later duplicates get the smallest free `_N` suffix
fn normalize_column_labels(table: &mut Table) {
    let normalized: Vec<String> = table
        .columns()
        .iter()
        .map(|c| c.name.trim().to_lowercase())
        .collect();

    let mut taken: HashSet<String> = normalized.iter().cloned().collect();
    let mut first_seen: HashSet<String> = HashSet::new();

    for (column, label) in table.columns_mut().iter_mut().zip(normalized) {
        if first_seen.insert(label.clone()) {
            column.name = label;
            continue;
        }

        let mut suffix = 2;
        let mut candidate = format!("{}_{}", label, suffix);
        while taken.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}", label, suffix);
        }
        log::warn!(
            "Duplicate column label '{}' after normalization, renamed to '{}'",
            label,
            candidate
        );
        taken.insert(candidate.clone());
        column.name = candidate;
    }
}

/// Convert text columns whose every non-null value is a plain number
fn coerce_numeric_columns(table: &mut Table) {
    for idx in table.indices_of_kind(ColumnKind::Text) {
        let mut non_null = table
            .rows()
            .iter()
            .filter_map(|row| row[idx].as_ref().and_then(Value::as_text))
            .peekable();

        if non_null.peek().is_none() {
            continue;
        }
        let numeric = non_null.all(|s| re_numeric().is_match(&strip_thousands(s)));
        if !numeric {
            continue;
        }

        for row in table.rows_mut().iter_mut() {
            let parsed = match &row[idx] {
                Some(Value::Text(s)) => parse_number(&strip_thousands(s)),
                _ => None,
            };
            row[idx] = parsed;
        }
        table.columns_mut()[idx].kind = ColumnKind::Number;
        table.unify_number_column(idx);
        log::debug!("Coerced column '{}' to numeric", table.columns()[idx].name);
    }
}

fn strip_thousands(s: &str) -> String {
    s.replace(',', "").trim().to_string()
}

fn parse_number(s: &str) -> Option<Value> {
    if !s.contains('.') {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Value::Int(i));
        }
    }
    s.parse::<f64>().ok().map(Value::Float)
}

fn numeric_fill_value(number: &serde_json::Number) -> Value {
    if let Some(i) = number.as_i64() {
        Value::Int(i)
    } else {
        Value::Float(number.as_f64().unwrap_or(0.0))
    }
}

fn convert_column_to_text(table: &mut Table, idx: usize) {
    for row in table.rows_mut().iter_mut() {
        if let Some(value) = &row[idx] {
            row[idx] = Some(Value::Text(value.canonical_text()));
        }
    }
    table.columns_mut()[idx].kind = ColumnKind::Text;
}

/// Rows are duplicates when their canonical fields match, so a null and an
/// empty string count as the same value
fn drop_duplicate_rows(table: &mut Table) {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    table.rows_mut().retain(|row| {
        let key = row
            .iter()
            .map(|cell| cell.as_ref().map(Value::canonical_text).unwrap_or_default())
            .collect::<Vec<_>>();
        seen.insert(key)
    });
}

fn sort_rows(table: &mut Table) {
    table.rows_mut().sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| compare_cells(x, y))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Total order on cells of one column; nulls sort last
pub fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx.total_cmp(&fy),
            _ => kind_rank(x).cmp(&kind_rank(y)),
        },
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::Text(_) => 2,
    }
}
