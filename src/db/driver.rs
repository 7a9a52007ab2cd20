//! Driver abstraction consumed by the query helpers.
//!
//! A driver exposes connections that create commands, commands that own an
//! ordered parameter collection and execute either as a non-query or as a
//! forward-only row reader. Releasing a command or reader is dropping it.

use crate::error::{DbError, DbResult};
use crate::models::{CommandKind, Value};
use std::time::Duration;

/// A long-lived database connection handle.
pub trait Connection {
    /// Driver transaction handle a command can be enlisted in.
    type Transaction: ?Sized;
    type Command: Command<Transaction = Self::Transaction>;

    /// Create a new, empty command bound to this connection.
    fn create_command(&self) -> DbResult<Self::Command>;
}

/// A single statement plus its positional parameters.
pub trait Command {
    type Transaction: ?Sized;
    type Parameter: Parameter;
    type Reader: RowReader;

    fn set_text(&mut self, text: &str);

    /// Enlist the command in `transaction`.
    fn set_transaction(&mut self, transaction: &Self::Transaction) -> DbResult<()>;

    fn set_timeout(&mut self, timeout: Duration);

    /// Set how the text is interpreted. Drivers reject kinds they cannot run.
    fn set_kind(&mut self, kind: CommandKind) -> DbResult<()>;

    /// Create a parameter slot that is not yet attached to the command.
    fn create_parameter(&mut self) -> Self::Parameter;

    /// Append a parameter slot after the existing ones.
    fn add_parameter(&mut self, parameter: Self::Parameter);

    /// The attached parameter slots, in positional order.
    fn parameters_mut(&mut self) -> &mut [Self::Parameter];

    /// Run the command and return the number of affected rows.
    fn execute_non_query(&mut self) -> DbResult<u64>;

    /// Run the command and return a cursor over its result rows.
    fn execute_reader(&mut self) -> DbResult<Self::Reader>;
}

/// A positional parameter slot. Its value may be overwritten any number of times.
pub trait Parameter {
    fn set_value(&mut self, value: Value);
    fn value(&self) -> &Value;
}

/// A forward-only cursor over result rows.
///
/// Field accessors read the row the last successful [`advance`](Self::advance)
/// moved to. The typed accessors are conveniences over [`get_value`](Self::get_value)
/// that drivers may override.
pub trait RowReader {
    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> DbResult<bool>;

    fn field_count(&self) -> usize;

    fn column_name(&self, index: usize) -> Option<&str>;

    fn get_value(&self, index: usize) -> DbResult<Value>;

    fn is_null(&self, index: usize) -> DbResult<bool> {
        Ok(self.get_value(index)?.is_null())
    }

    fn get_bool(&self, index: usize) -> DbResult<bool> {
        match self.get_value(index)? {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            other => Err(mismatch(index, "bool", &other)),
        }
    }

    fn get_i32(&self, index: usize) -> DbResult<i32> {
        let v = self.get_i64(index)?;
        i32::try_from(v).map_err(|_| DbError::decode(index, format!("{} overflows i32", v)))
    }

    fn get_i64(&self, index: usize) -> DbResult<i64> {
        match self.get_value(index)? {
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(i64::from(v)),
            other => Err(mismatch(index, "integer", &other)),
        }
    }

    fn get_f64(&self, index: usize) -> DbResult<f64> {
        match self.get_value(index)? {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(mismatch(index, "float", &other)),
        }
    }

    fn get_string(&self, index: usize) -> DbResult<String> {
        match self.get_value(index)? {
            Value::String(v) => Ok(v),
            Value::Json(v) => Ok(v.to_string()),
            other => Err(mismatch(index, "string", &other)),
        }
    }

    fn get_bytes(&self, index: usize) -> DbResult<Vec<u8>> {
        match self.get_value(index)? {
            Value::Bytes(v) => Ok(v),
            Value::String(v) => Ok(v.into_bytes()),
            other => Err(mismatch(index, "bytes", &other)),
        }
    }
}

fn mismatch(index: usize, expected: &str, found: &Value) -> DbError {
    DbError::decode(
        index,
        format!("expected {}, found {}", expected, found.type_name()),
    )
}

/// Parameter slot type of a connection's commands.
pub type ParameterOf<C> = <<C as Connection>::Command as Command>::Parameter;

/// Row reader type of a connection's commands.
pub type ReaderOf<C> = <<C as Connection>::Command as Command>::Reader;
