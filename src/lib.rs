//! Query helpers over a database connection.
//!
//! [`QueryHelper`] adds parameterized execution, batched execution, lazy row
//! projection and per-row callbacks to any [`Connection`]. `select` derives the
//! `SELECT` column list from a type's constructor parameter names, registered
//! with [`impl_select_columns!`].
//!
//! ```
//! use db_query_helper::{CommandOptions, QueryHelper, RowReader, SqliteDb, params};
//!
//! let db = SqliteDb::in_memory().unwrap();
//! let opts = CommandOptions::default();
//! db.execute("CREATE TABLE t (n INTEGER)", &[], &opts).unwrap();
//! assert_eq!(db.execute("INSERT INTO t VALUES (?)", &params![5], &opts).unwrap(), 1);
//!
//! let values: Vec<i32> = db
//!     .read("SELECT n FROM t", &[], |r| r.get_i32(0), &opts)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(values, vec![5]);
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::SqliteConfig;
pub use db::{
    Command, Connection, Parameter, QueryHelper, RowReader, Rows, SelectColumns, SqliteDb,
};
pub use error::{DbError, DbResult};
pub use models::{CommandKind, CommandOptions, Value};
