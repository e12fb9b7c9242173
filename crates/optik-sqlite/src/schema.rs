//! Table schema and statement text.
//!
//! Table and column names are caller-configurable, so they are validated
//! as plain identifiers at construction and spliced into statement text
//! exactly once, here. Every caller-supplied key or value travels as a
//! bound parameter, never as statement text.

use optik_core::error::{Result, SettingsError};

/// Column affinity for the value cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueColumn {
    /// Raw codec bytes (default).
    Blob,
    /// UTF-8 text; pair with a text codec such as
    /// [`JsonCodec`](optik_core::JsonCodec).
    Text,
}

impl ValueColumn {
    /// The declared column type, with an optional size suffix.
    pub fn ddl(self, size: Option<u32>) -> String {
        match (self, size) {
            (ValueColumn::Blob, None) => "BLOB".to_string(),
            (ValueColumn::Blob, Some(n)) => format!("BLOB({n})"),
            (ValueColumn::Text, None) => "TEXT".to_string(),
            (ValueColumn::Text, Some(n)) => format!("VARCHAR({n})"),
        }
    }
}

/// Validate a table or column name: ASCII letters, digits and `_`, not
/// starting with a digit.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SettingsError::Config(format!(
            "invalid SQL identifier: {name:?}"
        )))
    }
}

/// Statement text for one (table, key column, value column) triple.
///
/// Fixed-arity statements are built once; the IN-list and multi-row
/// variants are sized per call.
#[derive(Debug, Clone)]
pub struct Statements {
    pub create_table: String,
    pub select_one: String,
    pub select_all: String,
    pub update_one: String,
    pub insert_one: String,
    pub delete_one: String,
    pub delete_all: String,
    table: String,
    key_column: String,
    value_column: String,
}

impl Statements {
    pub fn new(
        table: &str,
        key_column: &str,
        value_column: &str,
        value_ddl: &str,
        max_key_length: usize,
    ) -> Self {
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" (\n\
                 \x20   \"{key_column}\" VARCHAR({max_key_length}) NOT NULL,\n\
                 \x20   \"{value_column}\" {value_ddl},\n\
                 \x20   UNIQUE(\"{key_column}\")\n\
                 )"
            ),
            select_one: format!(
                "SELECT \"{value_column}\" FROM \"{table}\" WHERE \"{key_column}\" = ?1"
            ),
            select_all: format!("SELECT \"{key_column}\", \"{value_column}\" FROM \"{table}\""),
            update_one: format!(
                "UPDATE \"{table}\" SET \"{value_column}\" = ?2 WHERE \"{key_column}\" = ?1"
            ),
            insert_one: format!(
                "INSERT INTO \"{table}\" (\"{key_column}\", \"{value_column}\") VALUES (?1, ?2)"
            ),
            delete_one: format!("DELETE FROM \"{table}\" WHERE \"{key_column}\" = ?1"),
            delete_all: format!("DELETE FROM \"{table}\""),
            table: table.to_string(),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        }
    }

    /// `SELECT key, value ... WHERE key IN (?, ...)` sized to `count`.
    pub fn select_in(&self, count: usize) -> String {
        format!(
            "SELECT \"{}\", \"{}\" FROM \"{}\" WHERE \"{}\" IN ({})",
            self.key_column,
            self.value_column,
            self.table,
            self.key_column,
            placeholders(count)
        )
    }

    /// `DELETE ... WHERE key IN (?, ...)` sized to `count`.
    pub fn delete_in(&self, count: usize) -> String {
        format!(
            "DELETE FROM \"{}\" WHERE \"{}\" IN ({})",
            self.table,
            self.key_column,
            placeholders(count)
        )
    }

    /// `INSERT ... VALUES (?, ?), ...` sized to `count` rows.
    pub fn insert_rows(&self, count: usize) -> String {
        let rows: Vec<&str> = std::iter::repeat("(?, ?)").take(count).collect();
        format!(
            "INSERT INTO \"{}\" (\"{}\", \"{}\") VALUES {}",
            self.table,
            self.key_column,
            self.value_column,
            rows.join(", ")
        )
    }
}

fn placeholders(count: usize) -> String {
    let marks: Vec<&str> = std::iter::repeat("?").take(count).collect();
    marks.join(", ")
}
