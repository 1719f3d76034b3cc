//! Canonical serialization and SHA-256 digests that define version identity

use crate::config::PreprocessConfig;
use crate::error::Result;
use crate::table::{Cell, Table};
use sha2::{Digest, Sha256};

/// A digest represented as 64 lowercase hex characters
pub type HashValue = String;

/// Length of the id prefix used in archive and report file names
pub const SHORT_ID_LEN: usize = 8;

/// Line terminator of the canonical table format
const LINE_TERMINATOR: &str = "\n";

/// SHA-256 of a byte payload
pub fn digest(payload: &[u8]) -> HashValue {
    hex::encode(Sha256::digest(payload))
}

/// First characters of an id, used for human-facing file names
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// True when `id` has the shape of a version id
pub fn is_version_id(id: &str) -> bool {
    id.len() == 64 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Canonical CSV bytes of a table: header first, `\n` after every line,
/// minimal quoting, nulls as empty fields.
pub fn canonicalize_table(table: &Table) -> Vec<u8> {
    let mut out = String::new();

    let header: Vec<String> = table.columns().iter().map(|c| escape_field(&c.name)).collect();
    out.push_str(&header.join(","));
    out.push_str(LINE_TERMINATOR);

    for row in table.rows() {
        let fields: Vec<String> = row.iter().map(render_cell).collect();
        out.push_str(&fields.join(","));
        out.push_str(LINE_TERMINATOR);
    }

    out.into_bytes()
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Some(value) => escape_field(&value.canonical_text()),
        None => String::new(),
    }
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// JSON bytes with object keys sorted recursively and no insignificant whitespace
pub fn canonical_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>> {
    fn canonicalize(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Object(map) => {
                let mut keys: Vec<_> = map.keys().cloned().collect();
                keys.sort();
                let mut out = serde_json::Map::new();
                for k in keys {
                    out.insert(k.clone(), canonicalize(&map[&k]));
                }
                serde_json::Value::Object(out)
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(canonicalize).collect())
            }
            other => other.clone(),
        }
    }

    Ok(serde_json::to_vec(&canonicalize(value))?)
}

/// Canonical bytes of the effective configuration
pub fn canonicalize_config(config: &PreprocessConfig) -> Result<Vec<u8>> {
    canonical_json_bytes(&config.to_json_value()?)
}

/// Pretty, key-sorted rendering used for `config_snapshot.json`
pub fn pretty_sorted_json(value: &serde_json::Value) -> Result<String> {
    let sorted: serde_json::Value = serde_json::from_slice(&canonical_json_bytes(value)?)?;
    Ok(format!("{}\n", serde_json::to_string_pretty(&sorted)?))
}

/// The three hashes recorded for every commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHashes {
    pub input_hash: HashValue,
    pub config_hash: HashValue,
    pub version_hash: HashValue,
}

impl CommitHashes {
    pub fn compute(
        raw_bytes: &[u8],
        config: &PreprocessConfig,
        processed_bytes: &[u8],
    ) -> Result<Self> {
        Ok(Self {
            input_hash: digest(raw_bytes),
            config_hash: digest(&canonicalize_config(config)?),
            version_hash: digest(processed_bytes),
        })
    }
}
