//! Dataset loading using DuckDB

use crate::error::{LineageError, Result};
use crate::table::{Cell, Column, ColumnKind, Table, Value};
use duckdb::types::ValueRef;
use duckdb::Connection;
use std::path::Path;

/// Types the CSV sniffer may pick; everything else stays text for the
/// preprocessing pipeline to coerce
const CSV_TYPE_CANDIDATES: &str = "['BIGINT', 'DOUBLE', 'VARCHAR']";

/// Column as reported by DuckDB before mapping to a [`ColumnKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn kind(&self) -> ColumnKind {
        let data_type = self.data_type.to_uppercase();
        match data_type.as_str() {
            "BOOLEAN" => ColumnKind::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" | "UBIGINT" | "HUGEINT" | "UHUGEINT" | "FLOAT" | "DOUBLE" => {
                ColumnKind::Number
            }
            t if t.starts_with("DECIMAL") => ColumnKind::Number,
            _ => ColumnKind::Text,
        }
    }

    /// Projection that yields only value types the extractor understands
    fn select_expr(&self) -> String {
        let quoted = format!("\"{}\"", self.name.replace('"', "\"\""));
        let data_type = self.data_type.to_uppercase();
        match self.kind() {
            ColumnKind::Number
                if data_type.starts_with("DECIMAL")
                    || data_type == "HUGEINT"
                    || data_type == "UHUGEINT" =>
            {
                format!("CAST({} AS DOUBLE)", quoted)
            }
            ColumnKind::Number | ColumnKind::Boolean => quoted,
            ColumnKind::Text => format!("CAST({} AS VARCHAR)", quoted),
        }
    }
}

/// Data processor for the supported file formats
pub struct DataProcessor {
    connection: Connection,
}

impl DataProcessor {
    pub fn new() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute("SET enable_progress_bar=false", [])?;
        // Row order of the source must survive loading
        connection.execute("SET preserve_insertion_order=true", [])?;
        Ok(Self { connection })
    }

    /// Load a file into a view and return basic info
    pub fn load_file(&self, file_path: &Path) -> Result<DataInfo> {
        if !file_path.is_file() {
            return Err(LineageError::validation(format!(
                "Dataset file not found: {}",
                file_path.display()
            )));
        }

        let source = Self::source_expr(file_path)?;
        let create_view_sql = format!("CREATE OR REPLACE VIEW data_view AS SELECT * FROM {}", source);
        self.connection
            .execute(&create_view_sql, [])
            .map_err(|e| self.convert_duckdb_error(e, file_path))?;

        let row_count: u64 = self
            .connection
            .prepare("SELECT COUNT(*) FROM data_view")?
            .query_row([], |row| row.get(0))
            .map_err(|e| self.convert_duckdb_error(e, file_path))?;

        let columns = self.get_column_info()?;

        Ok(DataInfo {
            source: file_path.to_path_buf(),
            row_count,
            columns,
        })
    }

    /// Load a file as a typed [`Table`]
    pub fn load_table(&self, file_path: &Path) -> Result<Table> {
        let info = self.load_file(file_path)?;
        if info.columns.is_empty() {
            return Ok(Table::default());
        }

        let columns: Vec<Column> = info
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.kind()))
            .collect();
        let projection = info
            .columns
            .iter()
            .map(ColumnInfo::select_expr)
            .collect::<Vec<_>>()
            .join(", ");

        let mut stmt = self
            .connection
            .prepare(&format!("SELECT {} FROM data_view", projection))?;
        let mut rows = stmt.query([])?;

        let mut table = Table::new(columns);
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(info.columns.len());
            for (idx, column) in info.columns.iter().enumerate() {
                cells.push(convert_value(row.get_ref(idx)?, column)?);
            }
            table.push_row(cells)?;
        }

        log::debug!(
            "Loaded {} rows x {} columns from {}",
            table.row_count(),
            table.column_count(),
            file_path.display()
        );

        Ok(table)
    }

    fn source_expr(file_path: &Path) -> Result<String> {
        let path = file_path.to_string_lossy().replace('\'', "''");
        let extension = file_path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(format!(
                "read_csv('{}', header = true, auto_detect = true, auto_type_candidates = {})",
                path, CSV_TYPE_CANDIDATES
            )),
            "tsv" => Ok(format!(
                "read_csv('{}', header = true, delim = '\\t', auto_detect = true, auto_type_candidates = {})",
                path, CSV_TYPE_CANDIDATES
            )),
            "json" => Ok(format!("read_json_auto('{}')", path)),
            "jsonl" | "ndjson" => Ok(format!(
                "read_json_auto('{}', format = 'newline_delimited')",
                path
            )),
            "parquet" => Ok(format!("read_parquet('{}')", path)),
            _ => Err(LineageError::validation(format!(
                "Unsupported file format: {} (expected csv, tsv, json, jsonl or parquet)",
                file_path.display()
            ))),
        }
    }

    /// Convert DuckDB errors about malformed input into validation failures
    fn convert_duckdb_error(&self, error: duckdb::Error, file_path: &Path) -> LineageError {
        let error_msg = error.to_string();

        if error_msg.contains("CSV Error")
            || error_msg.contains("Could not convert")
            || error_msg.contains("Invalid Input")
            || error_msg.contains("Unterminated quoted field")
        {
            LineageError::validation(format!(
                "Malformed dataset file '{}': {}",
                file_path.display(),
                error_msg
            ))
        } else if error_msg.contains("JSON") {
            LineageError::validation(format!(
                "Malformed JSON file '{}': {}",
                file_path.display(),
                error_msg
            ))
        } else if error_msg.contains("UTF-8") || error_msg.contains("encoding") {
            LineageError::validation(format!(
                "File encoding error '{}': {}",
                file_path.display(),
                error_msg
            ))
        } else {
            LineageError::DuckDb(error)
        }
    }

    fn get_column_info(&self) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self.connection.prepare("DESCRIBE data_view")?;
        let rows = stmt.query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get::<_, String>(0)?,
                data_type: row.get::<_, String>(1)?,
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    pub fn is_supported_format(file_path: &Path) -> bool {
        if let Some(extension) = file_path.extension().and_then(|s| s.to_str()) {
            matches!(
                extension.to_lowercase().as_str(),
                "csv" | "tsv" | "json" | "jsonl" | "ndjson" | "parquet"
            )
        } else {
            false
        }
    }
}

fn convert_value(value: ValueRef<'_>, column: &ColumnInfo) -> Result<Cell> {
    let cell = match value {
        ValueRef::Null => None,
        ValueRef::Boolean(b) => Some(Value::Bool(b)),
        ValueRef::TinyInt(i) => Some(Value::Int(i as i64)),
        ValueRef::SmallInt(i) => Some(Value::Int(i as i64)),
        ValueRef::Int(i) => Some(Value::Int(i as i64)),
        ValueRef::BigInt(i) => Some(Value::Int(i)),
        ValueRef::UTinyInt(i) => Some(Value::Int(i as i64)),
        ValueRef::USmallInt(i) => Some(Value::Int(i as i64)),
        ValueRef::UInt(i) => Some(Value::Int(i as i64)),
        ValueRef::UBigInt(i) => Some(match i64::try_from(i) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Float(i as f64),
        }),
        ValueRef::Float(f) => finite(f as f64),
        ValueRef::Double(f) => finite(f),
        ValueRef::Text(s) => Some(Value::Text(String::from_utf8_lossy(s).to_string())),
        _ => {
            return Err(LineageError::data_processing(format!(
                "Unsupported value in column '{}' of type {}",
                column.name, column.data_type
            )))
        }
    };
    Ok(cell)
}

/// NaN has no canonical form, so it loads as null
fn finite(value: f64) -> Cell {
    if value.is_nan() {
        None
    } else {
        Some(Value::Float(value))
    }
}

/// Information about loaded data
#[derive(Debug, Clone)]
pub struct DataInfo {
    pub source: std::path::PathBuf,
    pub row_count: u64,
    pub columns: Vec<ColumnInfo>,
}

impl DataInfo {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Load a dataset and reject empty or columnless results
pub fn load_dataset(path: &Path) -> Result<Table> {
    let processor = DataProcessor::new()?;
    let table = processor.load_table(path)?;
    if table.column_count() == 0 || table.is_empty() {
        return Err(LineageError::validation(format!(
            "Loaded dataset is empty: {}",
            path.display()
        )));
    }
    Ok(table)
}
