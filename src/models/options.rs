//! Per-command options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How the driver interprets command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Plain SQL statement
    #[default]
    Text,
    /// Name of a stored procedure
    StoredProcedure,
    /// Name of a table whose rows are all returned
    TableDirect,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::StoredProcedure => write!(f, "stored_procedure"),
            Self::TableDirect => write!(f, "table_direct"),
        }
    }
}

/// Optional settings applied to a prepared command.
///
/// Every field is left untouched on the command when `None`, so the driver's
/// own default applies.
#[derive(Debug)]
pub struct CommandOptions<'t, Tx: ?Sized> {
    /// Transaction to enlist the command in. Default: none.
    pub transaction: Option<&'t Tx>,
    /// Command timeout. Default: none (driver default).
    pub timeout: Option<Duration>,
    /// Command kind. Default: none (driver default, normally [`CommandKind::Text`]).
    pub kind: Option<CommandKind>,
}

impl<'t, Tx: ?Sized> CommandOptions<'t, Tx> {
    pub fn new() -> Self {
        Self {
            transaction: None,
            timeout: None,
            kind: None,
        }
    }

    /// Run the command inside `transaction`.
    pub fn transaction(mut self, transaction: &'t Tx) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Set the command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the command kind.
    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl<Tx: ?Sized> Default for CommandOptions<'_, Tx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tx: ?Sized> Clone for CommandOptions<'_, Tx> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tx: ?Sized> Copy for CommandOptions<'_, Tx> {}
