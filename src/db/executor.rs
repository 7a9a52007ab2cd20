//! Query execution helpers.
//!
//! [`QueryHelper`] is implemented for every [`Connection`] and provides:
//! - Single and batched non-query execution
//! - Lazy row projection (`read`, `select`)
//! - Per-row callbacks (`for_each`, `for_each_while`)
//!
//! Every helper creates its own command and releases it, together with any
//! reader, before returning or once the returned [`Rows`] is finished or
//! dropped. Errors from the driver and from caller callbacks are returned as
//! they are.

use crate::db::columns::{SelectColumns, add_column_names};
use crate::db::command::{prepare_command, prepare_slots};
use crate::db::driver::{Command, Connection, RowReader};
use crate::db::rows::Rows;
use crate::error::{DbError, DbResult};
use crate::models::{CommandOptions, Value};
use tracing::debug;

/// Execution helpers available on any [`Connection`].
pub trait QueryHelper: Connection {
    /// Execute `sql` once with positional `params` and return the affected row count.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        options: &CommandOptions<'_, Self::Transaction>,
    ) -> DbResult<u64> {
        let mut command = prepare_command(self, sql, params, options)?;
        command.execute_non_query()
    }

    /// Execute `sql` once per item of `values`, reusing one command.
    ///
    /// The command gets `parameter_count` slots up front. Before each run
    /// `binder` writes the item into the slots; it must fill every slot, since
    /// values left over from the previous item are not cleared. Returns the
    /// sum of affected row counts.
    fn execute_batch<T, I, B>(
        &self,
        sql: &str,
        parameter_count: usize,
        mut binder: B,
        values: I,
        options: &CommandOptions<'_, Self::Transaction>,
    ) -> DbResult<u64>
    where
        I: IntoIterator<Item = T>,
        B: FnMut(T, &mut [<Self::Command as Command>::Parameter]),
    {
        let mut command = prepare_slots(self, sql, parameter_count, options)?;
        let mut total = 0;
        let mut runs = 0usize;
        for value in values {
            binder(value, command.parameters_mut());
            total += command.execute_non_query()?;
            runs += 1;
        }

        debug!(
            sql = %sql,
            runs = runs,
            rows_affected = total,
            "Executed batch"
        );
        Ok(total)
    }

    /// Execute `sql` and lazily yield `selector(reader)` for every row.
    ///
    /// The query runs before this returns; rows are pulled as the iterator is
    /// advanced. Re-running the query means calling `read` again.
    fn read<T, E, F>(
        &self,
        sql: &str,
        params: &[Value],
        selector: F,
        options: &CommandOptions<'_, Self::Transaction>,
    ) -> DbResult<Rows<Self::Command, F>>
    where
        F: FnMut(&<Self::Command as Command>::Reader) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut command = prepare_command(self, sql, params, options)?;
        let reader = command.execute_reader()?;
        Ok(Rows::new(command, reader, selector))
    }

    /// Like [`read`](Self::read), with `SELECT "c1", "c2", ... ` for `T`
    /// prepended to `sql`.
    ///
    /// `sql` usually starts at the `FROM` clause. Fails with
    /// [`DbError::InvalidArgument`] when `T` has no column names to infer.
    fn select<T, E, F>(
        &self,
        sql: &str,
        params: &[Value],
        selector: F,
        options: &CommandOptions<'_, Self::Transaction>,
    ) -> DbResult<Rows<Self::Command, F>>
    where
        T: SelectColumns,
        F: FnMut(&<Self::Command as Command>::Reader) -> Result<T, E>,
        E: From<DbError>,
    {
        let sql = add_column_names::<T>(sql)?;
        self.read(&sql, params, selector, options)
    }

    /// Execute `sql` and invoke `action` for every row.
    ///
    /// Stops at the first error, which is returned after the reader and
    /// command are released.
    fn for_each<E, A>(
        &self,
        sql: &str,
        params: &[Value],
        mut action: A,
        options: &CommandOptions<'_, Self::Transaction>,
    ) -> Result<(), E>
    where
        A: FnMut(&<Self::Command as Command>::Reader) -> Result<(), E>,
        E: From<DbError>,
    {
        let mut command = prepare_command(self, sql, params, options)?;
        let mut reader = command.execute_reader()?;
        while reader.advance()? {
            action(&reader)?;
        }
        Ok(())
    }

    /// Execute `sql` and invoke `predicate` for every row until it returns
    /// `Ok(false)`. Rows after that are never read.
    fn for_each_while<E, P>(
        &self,
        sql: &str,
        params: &[Value],
        mut predicate: P,
        options: &CommandOptions<'_, Self::Transaction>,
    ) -> Result<(), E>
    where
        P: FnMut(&<Self::Command as Command>::Reader) -> Result<bool, E>,
        E: From<DbError>,
    {
        let mut command = prepare_command(self, sql, params, options)?;
        let mut reader = command.execute_reader()?;
        while reader.advance()? {
            if !predicate(&reader)? {
                break;
            }
        }
        Ok(())
    }
}

impl<C: Connection + ?Sized> QueryHelper for C {}
