//! Database helper layer.
//!
//! This module provides:
//! - The driver abstraction the helpers are written against
//! - Command preparation and the execution helpers
//! - Lazy row projection
//! - Column-list inference with a process-wide cache
//! - A SQLite driver built on sqlx

pub mod columns;
pub mod command;
pub mod driver;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod rows;
pub mod sqlite;
pub mod types;

pub use columns::{Constructor, SelectColumns, add_column_names, column_prefix};
pub use command::prepare_command;
pub use driver::{Command, Connection, Parameter, ParameterOf, ReaderOf, RowReader};
pub use executor::QueryHelper;
pub use rows::Rows;
pub use sqlite::{SqliteCommand, SqliteDb, SqliteParameter, SqliteReader, SqliteTransaction};
