//! Structural table type shared by the loader, the preprocessing pipeline and the hasher

use crate::error::{LineageError, Result};
use serde::{Deserialize, Serialize};

/// Declared scalar kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Number,
    Boolean,
}

/// A non-null cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A nullable cell
pub type Cell = Option<Value>;

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Text(_) => ColumnKind::Text,
            Self::Int(_) | Self::Float(_) => ColumnKind::Number,
            Self::Bool(_) => ColumnKind::Boolean,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Locale-independent textual form used for canonical serialization.
    ///
    /// Integers print in plain decimal. Floats use the shortest representation
    /// that round-trips, with a trailing `.0` when the value is integral, so
    /// `2.0` and `2` never collide inside a float column.
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Bool(b) => b.to_string(),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Named column with its declared kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered sequence of named, typed columns with row-major nullable cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, checking every row against the column count and kinds
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(LineageError::validation(format!(
                "Row {} has {} cells but the table has {} columns",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        for (cell, column) in row.iter().zip(&self.columns) {
            if let Some(value) = cell {
                if value.kind() != column.kind {
                    return Err(LineageError::validation(format!(
                        "Column '{}' is {:?} but row {} holds a {:?} value",
                        column.name,
                        column.kind,
                        self.rows.len(),
                        value.kind()
                    )));
                }
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Cell>> {
        &mut self.rows
    }

    /// Indices of the columns with the given kind
    pub fn indices_of_kind(&self, kind: ColumnKind) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Promote every integer in a number column to a float if any float is present
    pub(crate) fn unify_number_column(&mut self, index: usize) {
        let has_float = self
            .rows
            .iter()
            .any(|row| matches!(row[index], Some(Value::Float(_))));
        if !has_float {
            return;
        }
        for row in &mut self.rows {
            if let Some(Value::Int(i)) = row[index] {
                row[index] = Some(Value::Float(i as f64));
            }
        }
    }
}

/// Schema checks applied to every intake before preprocessing
pub fn validate_schema(table: &Table) -> Result<()> {
    if table.column_count() == 0 {
        return Err(LineageError::validation(
            "Dataset schema invalid: no columns found.",
        ));
    }
    if table.is_empty() {
        return Err(LineageError::validation(
            "Dataset schema invalid: dataset is empty.",
        ));
    }
    Ok(())
}
