//! Command preparation.

use crate::db::driver::{Command, Connection, Parameter};
use crate::error::DbResult;
use crate::models::{CommandOptions, Value};
use tracing::debug;

/// Create a command on `connection` with `text` and one positional parameter
/// per entry of `parameters`, in order.
///
/// Transaction, timeout and kind are applied only when set in `options`.
/// The returned command is released when dropped.
pub fn prepare_command<C>(
    connection: &C,
    text: &str,
    parameters: &[Value],
    options: &CommandOptions<'_, C::Transaction>,
) -> DbResult<C::Command>
where
    C: Connection + ?Sized,
{
    let mut command = connection.create_command()?;
    if let Some(transaction) = options.transaction {
        command.set_transaction(transaction)?;
    }
    command.set_text(text);
    if let Some(timeout) = options.timeout {
        command.set_timeout(timeout);
    }
    if let Some(kind) = options.kind {
        command.set_kind(kind)?;
    }

    for value in parameters {
        let mut parameter = command.create_parameter();
        parameter.set_value(value.clone());
        command.add_parameter(parameter);
    }

    debug!(
        sql = %text,
        params = parameters.len(),
        in_transaction = options.transaction.is_some(),
        timeout_secs = ?options.timeout.map(|t| t.as_secs()),
        kind = ?options.kind,
        "Prepared command"
    );

    Ok(command)
}

/// Create a command with `count` empty parameter slots attached.
pub(crate) fn prepare_slots<C>(
    connection: &C,
    text: &str,
    count: usize,
    options: &CommandOptions<'_, C::Transaction>,
) -> DbResult<C::Command>
where
    C: Connection + ?Sized,
{
    let mut command = prepare_command(connection, text, &[], options)?;
    for _ in 0..count {
        let parameter = command.create_parameter();
        command.add_parameter(parameter);
    }
    Ok(command)
}
