//! SQLite driver built on sqlx.
//!
//! [`SqliteDb`] implements the driver traits with a single `SqliteConnection`
//! and a private current-thread tokio runtime, so the synchronous helpers
//! block on driver I/O. Do not call it from inside another tokio runtime.
//!
//! A reader streams its rows from a task on that runtime, one row per
//! `advance`. The task holds the connection until the rows run out or the
//! reader is dropped; other commands on the connection fail while a reader is
//! open.

use crate::config::SqliteConfig;
use crate::db::driver::{Command, Connection, Parameter, RowReader};
use crate::db::types::decode_column;
use crate::error::{DbError, DbResult};
use crate::models::{CommandKind, Value};
use futures_util::StreamExt;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Executor, Sqlite, Statement as _};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

struct Inner {
    runtime: Runtime,
    conn: Arc<Mutex<SqliteConnection>>,
    default_timeout: Option<Duration>,
    reader_open: AtomicBool,
}

/// A blocking SQLite connection.
///
/// Cloning is cheap and every clone shares the same underlying connection.
#[derive(Clone)]
pub struct SqliteDb {
    inner: Arc<Inner>,
}

impl fmt::Debug for SqliteDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDb")
            .field("default_timeout", &self.inner.default_timeout)
            .field("reader_open", &self.inner.reader_open.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl SqliteDb {
    /// Open the database described by `config`.
    pub fn connect(config: &SqliteConfig) -> DbResult<Self> {
        config
            .validate()
            .map_err(|msg| DbError::invalid_argument("config", msg))?;

        let mut options = SqliteConnectOptions::from_str(&config.url).map_err(|e| {
            DbError::connection(
                format!("Invalid SQLite connection string: {}", e),
                "Check the connection URL format: sqlite:path/to/db.sqlite",
            )
        })?;
        options = if config.read_only {
            options.read_only(true)
        } else {
            options.create_if_missing(config.create_if_missing)
        };
        options = options.busy_timeout(config.busy_timeout());

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to start driver runtime: {}", e)))?;
        let conn = runtime.block_on(options.connect()).map_err(|e| {
            DbError::connection(
                format!("Failed to connect: {}", e),
                "Verify the file path exists and is accessible: sqlite:path/to/db.sqlite",
            )
        })?;

        info!(
            url = %config.url,
            read_only = config.read_only,
            "Connected to SQLite"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                runtime,
                conn: Arc::new(Mutex::new(conn)),
                default_timeout: config.command_timeout(),
                reader_open: AtomicBool::new(false),
            }),
        })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        Self::connect(&SqliteConfig::in_memory())
    }

    /// Start a transaction on this connection.
    ///
    /// Commands enlisted in it run on the same connection after `BEGIN`.
    /// Dropping the handle without a successful commit rolls the transaction
    /// back.
    pub fn begin(&self) -> DbResult<SqliteTransaction> {
        self.run(&Statement::raw("BEGIN"))?;
        Ok(SqliteTransaction {
            db: self.clone(),
            finished: false,
        })
    }

    fn run(&self, statement: &Statement<'_>) -> DbResult<u64> {
        debug!(
            sql = %statement.sql,
            params = statement.params.len(),
            "Executing write operation"
        );
        self.ensure_no_open_reader()?;
        let limit = statement.timeout.or(self.inner.default_timeout);
        let conn = &self.inner.conn;
        let result = self.inner.runtime.block_on(async {
            let mut conn = conn.lock().await;
            with_timeout(limit, "write operation", async {
                // Raw SQL without parameters allows multi-statement scripts
                let result = if statement.params.is_empty() {
                    (&mut *conn).execute(statement.sql).await
                } else {
                    bind_params(sqlx::query(statement.sql), statement.params)
                        .execute(&mut *conn)
                        .await
                };
                result.map_err(DbError::from)
            })
            .await
        })?;
        Ok(result.rows_affected())
    }

    /// Start streaming the rows of `sql` and wait for the statement to be
    /// prepared and its first row fetched.
    fn open_reader(
        &self,
        sql: String,
        params: Vec<Value>,
        timeout: Option<Duration>,
    ) -> DbResult<SqliteReader> {
        debug!(sql = %sql, params = params.len(), "Executing query");
        self.ensure_no_open_reader()?;
        let limit = timeout.or(self.inner.default_timeout);

        let (columns_tx, columns_rx) = oneshot::channel();
        let (rows_tx, rows_rx) = mpsc::channel(1);
        let task = self.inner.runtime.spawn(stream_rows(
            Arc::clone(&self.inner.conn),
            sql,
            params,
            columns_tx,
            rows_tx,
        ));
        self.inner.reader_open.store(true, Ordering::Release);

        let mut reader = SqliteReader {
            db: self.clone(),
            rows: rows_rx,
            task,
            timeout: limit,
            columns: Vec::new(),
            pending: None,
            current: None,
            done: false,
        };
        reader.columns = self.inner.runtime.block_on(with_timeout(
            limit,
            "query execution",
            async move {
                columns_rx.await.unwrap_or_else(|_| {
                    Err(DbError::internal("Row stream ended before its columns"))
                })
            },
        ))?;
        // Execution errors surface here rather than on the first advance
        reader.pending = reader.next_row()?;
        Ok(reader)
    }

    fn ensure_no_open_reader(&self) -> DbResult<()> {
        if self.inner.reader_open.load(Ordering::Acquire) {
            return Err(DbError::invalid_argument(
                "connection",
                "A reader is still open on this connection; finish or drop it first",
            ));
        }
        Ok(())
    }

    fn same_connection(&self, other: &SqliteDb) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Connection for SqliteDb {
    type Transaction = SqliteTransaction;
    type Command = SqliteCommand;

    fn create_command(&self) -> DbResult<SqliteCommand> {
        Ok(SqliteCommand {
            db: self.clone(),
            text: String::new(),
            kind: CommandKind::Text,
            timeout: None,
            parameters: Vec::new(),
        })
    }
}

struct Statement<'a> {
    sql: &'a str,
    params: &'a [Value],
    timeout: Option<Duration>,
}

impl<'a> Statement<'a> {
    fn raw(sql: &'a str) -> Self {
        Self {
            sql,
            params: &[],
            timeout: None,
        }
    }
}

async fn with_timeout<T, F>(limit: Option<Duration>, operation: &str, fut: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match limit {
        None => fut.await,
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(operation, limit)),
        },
    }
}

/// Prepare `sql`, report its columns, then send rows one at a time.
///
/// Stops at the first error or as soon as the reader side goes away.
async fn stream_rows(
    conn: Arc<Mutex<SqliteConnection>>,
    sql: String,
    params: Vec<Value>,
    columns_tx: oneshot::Sender<DbResult<Vec<String>>>,
    rows_tx: mpsc::Sender<DbResult<SqliteRow>>,
) {
    let mut conn = conn.lock_owned().await;

    let columns = match (&mut *conn).prepare(sql.as_str()).await {
        Ok(statement) => statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
        Err(e) => {
            let _ = columns_tx.send(Err(e.into()));
            return;
        }
    };
    if columns_tx.send(Ok(columns)).is_err() {
        return;
    }

    // When params is empty, use raw SQL like writes do
    let mut rows = if params.is_empty() {
        (&mut *conn).fetch(sql.as_str())
    } else {
        bind_params(sqlx::query(&sql), &params).fetch(&mut *conn)
    };
    while let Some(row) = rows.next().await {
        let failed = row.is_err();
        if rows_tx.send(row.map_err(DbError::from)).await.is_err() || failed {
            break;
        }
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.as_str()),
            Value::Bytes(v) => query.bind(v.as_slice()),
            // SQLite doesn't have native JSON type, store as string
            Value::Json(v) => query.bind(v.to_string()),
        };
    }
    query
}

/// A transaction on a [`SqliteDb`].
#[derive(Debug)]
pub struct SqliteTransaction {
    db: SqliteDb,
    finished: bool,
}

impl SqliteTransaction {
    /// Commit the transaction.
    ///
    /// SQLite keeps the transaction open when `COMMIT` fails (a deferred
    /// constraint, a busy database); it is then rolled back as the handle
    /// drops and the commit error is returned.
    pub fn commit(mut self) -> DbResult<()> {
        self.db.run(&Statement::raw("COMMIT"))?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> DbResult<()> {
        self.db.run(&Statement::raw("ROLLBACK"))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.db.run(&Statement::raw("ROLLBACK")) {
                warn!(error = %e, "Failed to roll back abandoned transaction");
            }
        }
    }
}

/// A positional parameter slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqliteParameter {
    value: Value,
}

impl Parameter for SqliteParameter {
    fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    fn value(&self) -> &Value {
        &self.value
    }
}

/// A statement prepared against a [`SqliteDb`].
#[derive(Debug)]
pub struct SqliteCommand {
    db: SqliteDb,
    text: String,
    kind: CommandKind,
    timeout: Option<Duration>,
    parameters: Vec<SqliteParameter>,
}

impl SqliteCommand {
    fn sql(&self) -> String {
        match self.kind {
            CommandKind::TableDirect => format!("SELECT * FROM {}", self.text),
            _ => self.text.clone(),
        }
    }

    fn values(&self) -> Vec<Value> {
        self.parameters.iter().map(|p| p.value.clone()).collect()
    }
}

impl Command for SqliteCommand {
    type Transaction = SqliteTransaction;
    type Parameter = SqliteParameter;
    type Reader = SqliteReader;

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_transaction(&mut self, transaction: &SqliteTransaction) -> DbResult<()> {
        if !self.db.same_connection(&transaction.db) {
            return Err(DbError::invalid_argument(
                "transaction",
                "Transaction belongs to a different connection",
            ));
        }
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    fn set_kind(&mut self, kind: CommandKind) -> DbResult<()> {
        if kind == CommandKind::StoredProcedure {
            return Err(DbError::unsupported("SQLite has no stored procedures"));
        }
        self.kind = kind;
        Ok(())
    }

    fn create_parameter(&mut self) -> SqliteParameter {
        SqliteParameter::default()
    }

    fn add_parameter(&mut self, parameter: SqliteParameter) {
        self.parameters.push(parameter);
    }

    fn parameters_mut(&mut self) -> &mut [SqliteParameter] {
        &mut self.parameters
    }

    fn execute_non_query(&mut self) -> DbResult<u64> {
        let sql = self.sql();
        let values = self.values();
        self.db.run(&Statement {
            sql: &sql,
            params: &values,
            timeout: self.timeout,
        })
    }

    fn execute_reader(&mut self) -> DbResult<SqliteReader> {
        self.db.open_reader(self.sql(), self.values(), self.timeout)
    }
}

/// Forward-only cursor over a streamed result.
pub struct SqliteReader {
    db: SqliteDb,
    rows: mpsc::Receiver<DbResult<SqliteRow>>,
    task: JoinHandle<()>,
    timeout: Option<Duration>,
    columns: Vec<String>,
    /// First row, fetched when the command executed.
    pending: Option<SqliteRow>,
    current: Option<SqliteRow>,
    done: bool,
}

impl SqliteReader {
    fn row(&self) -> DbResult<&SqliteRow> {
        self.current.as_ref().ok_or(DbError::NoCurrentRow)
    }

    fn next_row(&mut self) -> DbResult<Option<SqliteRow>> {
        if self.done {
            return Ok(None);
        }
        let rows = &mut self.rows;
        let received = self.db.inner.runtime.block_on(with_timeout(
            self.timeout,
            "row fetch",
            async move { rows.recv().await.transpose() },
        ));
        if !matches!(received, Ok(Some(_))) {
            self.finish();
        }
        received
    }

    /// Stop the row stream and hand the connection back.
    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.task.abort();
            self.db.inner.reader_open.store(false, Ordering::Release);
        }
    }
}

impl Drop for SqliteReader {
    fn drop(&mut self) {
        self.finish();
    }
}

impl fmt::Debug for SqliteReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteReader")
            .field("columns", &self.columns)
            .field("on_row", &self.current.is_some())
            .field("done", &self.done)
            .finish()
    }
}

impl RowReader for SqliteReader {
    fn advance(&mut self) -> DbResult<bool> {
        self.current = self.pending.take();
        if self.current.is_none() {
            self.current = self.next_row()?;
        }
        Ok(self.current.is_some())
    }

    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    fn get_value(&self, index: usize) -> DbResult<Value> {
        decode_column(self.row()?, index)
    }
}
