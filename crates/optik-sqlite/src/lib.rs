//! SQLite-backed settings storage.
//!
//! [`SqliteSettings`] keeps one row per canonical key in a single table
//! and reaches it exclusively through parameterized SQL. There is no
//! in-memory cache: every operation opens a fresh connection, executes,
//! and drops it. Single and batched writes run inside an explicit
//! transaction and roll back on any failure; reads and deletes are single
//! statements.
//!
//! The database file and the settings table are created on construction
//! if absent. Keys are stored in a `UNIQUE` fixed-width column; canonical
//! keys longer than [`MAX_KEY_LENGTH`] are rejected before any SQL is
//! built.

pub mod schema;
pub mod store;

pub use schema::ValueColumn;
pub use store::{SqliteOptions, SqliteSettings, MAX_KEY_LENGTH};
