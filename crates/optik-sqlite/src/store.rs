//! The [`SqliteSettings`] store.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use optik_core::codec::BincodeCodec;
use optik_core::error::{Result, SettingsError};
use optik_core::key::{check_length, DisplayConverter, KeyConverter};
use optik_core::traits::SettingsStore;
use optik_core::value::Value;
use optik_core::Codec;

use crate::schema::{validate_identifier, Statements, ValueColumn};

/// Maximum canonical key length, in characters. The key column is
/// declared this wide; longer keys are rejected before any SQL executes.
pub const MAX_KEY_LENGTH: usize = 60;

/// Configuration for a [`SqliteSettings`] store.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// Database file. Created (parent directories included) if absent.
    pub path: PathBuf,
    /// Settings table name.
    pub table: String,
    /// Key column name.
    pub key_column: String,
    /// Value column name.
    pub value_column: String,
    /// Value column affinity.
    pub value_type: ValueColumn,
    /// Declared value column size; `None` leaves it unbounded.
    pub value_size: Option<u32>,
}

impl SqliteOptions {
    /// Defaults: table `settings`, columns `optionName`/`value`, unbounded
    /// BLOB cells.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: "settings".to_string(),
            key_column: "optionName".to_string(),
            value_column: "value".to_string(),
            value_type: ValueColumn::Blob,
            value_size: None,
        }
    }
}

/// SQLite-backed settings store.
///
/// One row per canonical key, reached exclusively through parameterized
/// SQL. There is no in-memory cache; every operation opens a fresh
/// connection and drops it when done. Writes run inside an explicit
/// transaction and roll back on any failure.
pub struct SqliteSettings<K: 'static, C = BincodeCodec> {
    options: SqliteOptions,
    statements: Statements,
    codec: C,
    conversion: Box<dyn KeyConverter<K>>,
}

impl<K> SqliteSettings<K, BincodeCodec>
where
    K: fmt::Display + 'static,
{
    /// Open (creating if needed) a store with default table layout and
    /// the default binary codec.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(SqliteOptions::new(path), BincodeCodec)
    }
}

impl<K, C> SqliteSettings<K, C>
where
    K: fmt::Display + 'static,
    C: Codec,
{
    /// Open (creating if needed) a store with caller-supplied options and
    /// codec.
    pub fn with_options(options: SqliteOptions, codec: C) -> Result<Self> {
        if options.path.as_os_str().is_empty() {
            return Err(SettingsError::Config(
                "database path is empty".to_string(),
            ));
        }
        validate_identifier(&options.table)?;
        validate_identifier(&options.key_column)?;
        validate_identifier(&options.value_column)?;

        let statements = Statements::new(
            &options.table,
            &options.key_column,
            &options.value_column,
            &options.value_type.ddl(options.value_size),
            MAX_KEY_LENGTH,
        );
        let store = Self {
            options,
            statements,
            codec,
            conversion: Box::new(DisplayConverter),
        };
        store.initialize()?;
        Ok(store)
    }

    /// The configured options.
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Ensure the database file and the settings table exist.
    fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.options.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.connect()?;
        conn.execute(&self.statements.create_table, [])
            .map_err(db_err)?;
        debug!(
            path = %self.options.path.display(),
            table = %self.options.table,
            "settings table ready"
        );
        Ok(())
    }

    /// A fresh connection; the CREATE flag doubles as "ensure the
    /// database exists".
    fn connect(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.options.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(db_err)
    }

    fn cell_to_sql(&self, cell: &Value) -> Result<SqlValue> {
        match cell.as_bytes() {
            None => Ok(SqlValue::Null),
            Some(bytes) => match self.options.value_type {
                ValueColumn::Blob => Ok(SqlValue::Blob(bytes.to_vec())),
                ValueColumn::Text => String::from_utf8(bytes.to_vec())
                    .map(SqlValue::Text)
                    .map_err(|_| {
                        SettingsError::Codec(
                            "encoded value is not valid UTF-8 for a text column".to_string(),
                        )
                    }),
            },
        }
    }

    fn cell_from_sql(value: SqlValue) -> Result<Value> {
        match value {
            SqlValue::Null => Ok(Value::null()),
            SqlValue::Blob(bytes) => Ok(Value::from_encoded(Some(bytes))),
            SqlValue::Text(text) => Ok(Value::from_encoded(Some(text.into_bytes()))),
            other => Err(SettingsError::Database(format!(
                "unsupported value column content: {other:?}"
            ))),
        }
    }
}

impl<K, C> SettingsStore for SqliteSettings<K, C>
where
    K: fmt::Display + Eq + Hash + Clone + 'static,
    C: Codec,
{
    type Key = K;
    type Codec = C;

    fn codec(&self) -> &C {
        &self.codec
    }

    fn canonical_key(&self, key: &K) -> Result<String> {
        let canonical = self.conversion.canonical(key)?;
        check_length(&canonical, MAX_KEY_LENGTH)?;
        Ok(canonical)
    }

    fn read_entry(&self, canonical: &str) -> Result<Option<Value>> {
        let conn = self.connect()?;
        let cell: Option<SqlValue> = conn
            .query_row(&self.statements.select_one, params![canonical], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_err)?;
        cell.map(Self::cell_from_sql).transpose()
    }

    fn read_entries(&self, canonical: &[String]) -> Result<Vec<(String, Value)>> {
        if canonical.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let sql = self.statements.select_in(canonical.len());
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt
            .query(params_from_iter(canonical.iter().map(String::as_str)))
            .map_err(db_err)?;

        let mut found = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            let key: String = row.get(0).map_err(db_err)?;
            let value: SqlValue = row.get(1).map_err(db_err)?;
            found.push((key, Self::cell_from_sql(value)?));
        }
        Ok(found)
    }

    fn read_all(&self) -> Result<HashMap<String, Value>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&self.statements.select_all).map_err(db_err)?;
        let mut rows = stmt.query([]).map_err(db_err)?;

        let mut all = HashMap::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            let key: String = row.get(0).map_err(db_err)?;
            let value: SqlValue = row.get(1).map_err(db_err)?;
            all.insert(key, Self::cell_from_sql(value)?);
        }
        Ok(all)
    }

    fn write_entry(&mut self, canonical: String, value: Value) -> Result<bool> {
        let cell = self.cell_to_sql(&value)?;
        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(db_err)?;

        let mut affected = tx
            .execute(&self.statements.update_one, params![canonical, cell])
            .map_err(db_err)?;
        if affected == 0 {
            affected = tx
                .execute(&self.statements.insert_one, params![canonical, cell])
                .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(affected > 0)
    }

    fn write_entries(&mut self, entries: Vec<(String, Value)>) -> Result<bool> {
        if entries.is_empty() {
            return Ok(true);
        }
        let cells: Vec<SqlValue> = entries
            .iter()
            .map(|(_, value)| self.cell_to_sql(value))
            .collect::<Result<_>>()?;

        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(db_err)?;

        // Replace semantics: clear any existing rows for these keys, then
        // insert the batch. Any failure drops the transaction, which
        // rolls the table back.
        let delete = self.statements.delete_in(entries.len());
        tx.execute(
            &delete,
            params_from_iter(entries.iter().map(|(key, _)| key.as_str())),
        )
        .map_err(db_err)?;

        let insert = self.statements.insert_rows(entries.len());
        let mut flat = Vec::with_capacity(entries.len() * 2);
        for ((key, _), cell) in entries.iter().zip(cells) {
            flat.push(SqlValue::Text(key.clone()));
            flat.push(cell);
        }
        let affected = tx
            .execute(&insert, params_from_iter(flat))
            .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        debug!(rows = affected, "settings batch written");
        Ok(affected == entries.len())
    }

    fn remove_entry(&mut self, canonical: &str) -> Result<bool> {
        let conn = self.connect()?;
        let affected = conn
            .execute(&self.statements.delete_one, params![canonical])
            .map_err(db_err)?;
        Ok(affected > 0)
    }

    fn remove_entries(&mut self, canonical: &[String]) -> Result<bool> {
        if canonical.is_empty() {
            return Ok(true);
        }
        let conn = self.connect()?;
        let sql = self.statements.delete_in(canonical.len());
        let affected = conn
            .execute(&sql, params_from_iter(canonical.iter().map(String::as_str)))
            .map_err(db_err)?;
        Ok(affected == canonical.len())
    }

    fn remove_all(&mut self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(&self.statements.delete_all, [])
            .map_err(db_err)?;
        Ok(())
    }

    fn set_key_conversion(&mut self, conversion: Option<Box<dyn KeyConverter<K>>>) {
        self.conversion = conversion.unwrap_or_else(|| Box::new(DisplayConverter));
    }
}

impl<K: 'static, C> fmt::Debug for SqliteSettings<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSettings")
            .field("path", &self.options.path)
            .field("table", &self.options.table)
            .finish()
    }
}

fn db_err(e: rusqlite::Error) -> SettingsError {
    SettingsError::Database(e.to_string())
}
