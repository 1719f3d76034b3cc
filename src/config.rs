//! Preprocessing configuration: typed options, built-in defaults and JSON loading

use crate::error::{LineageError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sentinel recorded as `source_config_path` when the built-in defaults are used
pub const DEFAULT_CONFIG_SENTINEL: &str = "DEFAULT_CONFIG";

/// Tokens treated as null when no `unwanted_values` are configured
pub const DEFAULT_UNWANTED_VALUES: &[&str] = &["", "na", "n/a", "null", "none", "-", "?"];

/// How rows containing nulls are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullStrategy {
    DropAny,
    DropAll,
    Fill,
    Keep,
}

impl NullStrategy {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "" | "drop_any" => Ok(Self::DropAny),
            "drop_all" => Ok(Self::DropAll),
            "fill" => Ok(Self::Fill),
            "keep" => Ok(Self::Keep),
            other => Err(format!(
                "Invalid null_strategy: '{}'. Use 'drop_any', 'drop_all', 'fill' or 'keep'",
                other
            )),
        }
    }
}

/// Effective preprocessing configuration.
///
/// Every field has a built-in default; a user document only overrides the
/// keys it names. The serialized form of this struct is what gets hashed
/// into `config_hash` and written to `config_snapshot.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub drop_nulls: bool,
    pub drop_duplicates: bool,
    pub cleanup_text: bool,
    pub strip_text: bool,
    pub lowercase_text: bool,
    pub remove_punctuation: bool,
    pub collapse_spaces: bool,
    pub normalize_unicode: bool,
    pub remove_urls: bool,
    pub coerce_numeric_columns: bool,
    pub null_strategy: NullStrategy,
    pub null_fill_text: String,
    pub null_fill_numeric: serde_json::Number,
    pub sort_rows: bool,
    pub unwanted_values: Vec<String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            drop_nulls: true,
            drop_duplicates: true,
            cleanup_text: true,
            strip_text: true,
            lowercase_text: true,
            remove_punctuation: true,
            collapse_spaces: true,
            normalize_unicode: true,
            remove_urls: false,
            coerce_numeric_columns: true,
            null_strategy: NullStrategy::DropAny,
            null_fill_text: String::new(),
            null_fill_numeric: serde_json::Number::from(0),
            sort_rows: true,
            unwanted_values: normalize_unwanted(DEFAULT_UNWANTED_VALUES.iter().map(|s| s.to_string())),
        }
    }
}

impl PreprocessConfig {
    /// Merge a JSON document over the defaults.
    ///
    /// Unknown keys are ignored with a warning. Known keys carrying the wrong
    /// JSON type are rejected.
    pub fn from_json_value(document: &serde_json::Value) -> Result<Self> {
        let map = document.as_object().ok_or_else(|| {
            LineageError::validation("Configuration must be a JSON object")
        })?;

        let mut config = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "drop_nulls" => config.drop_nulls = expect_bool(key, value)?,
                "drop_duplicates" => config.drop_duplicates = expect_bool(key, value)?,
                "cleanup_text" => config.cleanup_text = expect_bool(key, value)?,
                "strip_text" => config.strip_text = expect_bool(key, value)?,
                "lowercase_text" => config.lowercase_text = expect_bool(key, value)?,
                "remove_punctuation" => config.remove_punctuation = expect_bool(key, value)?,
                "collapse_spaces" => config.collapse_spaces = expect_bool(key, value)?,
                "normalize_unicode" => config.normalize_unicode = expect_bool(key, value)?,
                "remove_urls" => config.remove_urls = expect_bool(key, value)?,
                "coerce_numeric_columns" => {
                    config.coerce_numeric_columns = expect_bool(key, value)?
                }
                "sort_rows" => config.sort_rows = expect_bool(key, value)?,
                "null_strategy" => {
                    let raw = value.as_str().ok_or_else(|| type_error(key, "a string"))?;
                    config.null_strategy =
                        NullStrategy::parse(raw).map_err(LineageError::validation)?;
                }
                "null_fill_text" => {
                    config.null_fill_text = value
                        .as_str()
                        .ok_or_else(|| type_error(key, "a string"))?
                        .to_string();
                }
                "null_fill_numeric" => {
                    config.null_fill_numeric = match value {
                        serde_json::Value::Number(n) => n.clone(),
                        _ => return Err(type_error(key, "a number")),
                    };
                }
                "unwanted_values" => {
                    let items = value
                        .as_array()
                        .ok_or_else(|| type_error(key, "an array"))?;
                    let mut tokens = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            serde_json::Value::String(s) => tokens.push(s.clone()),
                            serde_json::Value::Number(n) => tokens.push(n.to_string()),
                            serde_json::Value::Bool(b) => tokens.push(b.to_string()),
                            _ => return Err(type_error(key, "an array of scalars")),
                        }
                    }
                    config.unwanted_values = normalize_unwanted(tokens);
                }
                unknown => {
                    log::warn!("Ignoring unrecognized configuration key '{}'", unknown);
                }
            }
        }

        Ok(config)
    }

    /// Null strategy after applying the `drop_nulls` override
    pub fn effective_null_strategy(&self) -> NullStrategy {
        if self.drop_nulls && self.null_strategy == NullStrategy::Keep {
            NullStrategy::DropAny
        } else {
            self.null_strategy
        }
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn expect_bool(key: &str, value: &serde_json::Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| type_error(key, "a boolean"))
}

fn type_error(key: &str, expected: &str) -> LineageError {
    LineageError::validation(format!("Configuration key '{}' must be {}", key, expected))
}

/// Trim, lowercase, sort and deduplicate sentinel tokens so equal sets compare equal
fn normalize_unwanted(tokens: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut normalized: Vec<String> = tokens
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Load a configuration file (`.json` only) and merge it over the defaults
pub fn load_config_file(path: &Path) -> Result<PreprocessConfig> {
    if !path.is_file() {
        return Err(LineageError::validation(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json {
        return Err(LineageError::validation(format!(
            "Config file must be a .json file: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        LineageError::validation(format!("Invalid JSON config {}: {}", path.display(), e))
    })?;

    PreprocessConfig::from_json_value(&document)
}
