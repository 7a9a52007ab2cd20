//! Shared test support: a recording driver double and tracing setup.

#![allow(dead_code)]

use db_query_helper::{
    Command, CommandKind, Connection, DbError, DbResult, Parameter, RowReader, Value,
};
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One run of a command against the double.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub text: String,
    pub slot_ids: Vec<usize>,
    pub values: Vec<Value>,
    pub kind: Option<CommandKind>,
    pub timeout: Option<Duration>,
    pub transaction: Option<String>,
}

#[derive(Debug, Default)]
pub struct Journal {
    pub commands_created: usize,
    pub commands_released: usize,
    pub readers_opened: usize,
    pub readers_released: usize,
    pub rows_advanced: usize,
    pub executions: Vec<Execution>,
    pub releases: Vec<&'static str>,
}

#[derive(Debug)]
pub struct MockTransaction(pub String);

/// Connection double returning canned rows and affected counts.
///
/// Commands whose text contains `FAIL` fail on execution with a database error.
#[derive(Clone, Default)]
pub struct MockConnection {
    journal: Rc<RefCell<Journal>>,
    rows: Rc<Vec<Vec<Value>>>,
    affected: u64,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: Rc::new(rows),
            ..Self::default()
        }
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    pub fn journal(&self) -> Ref<'_, Journal> {
        self.journal.borrow()
    }
}

impl Connection for MockConnection {
    type Transaction = MockTransaction;
    type Command = MockCommand;

    fn create_command(&self) -> DbResult<MockCommand> {
        self.journal.borrow_mut().commands_created += 1;
        Ok(MockCommand {
            journal: self.journal.clone(),
            rows: self.rows.clone(),
            affected: self.affected,
            text: String::new(),
            kind: None,
            timeout: None,
            transaction: None,
            parameters: Vec::new(),
            next_slot_id: 0,
        })
    }
}

#[derive(Debug)]
pub struct MockParameter {
    pub id: usize,
    value: Value,
}

impl Parameter for MockParameter {
    fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    fn value(&self) -> &Value {
        &self.value
    }
}

pub struct MockCommand {
    journal: Rc<RefCell<Journal>>,
    rows: Rc<Vec<Vec<Value>>>,
    affected: u64,
    text: String,
    kind: Option<CommandKind>,
    timeout: Option<Duration>,
    transaction: Option<String>,
    parameters: Vec<MockParameter>,
    next_slot_id: usize,
}

impl MockCommand {
    fn record(&self) -> DbResult<()> {
        self.journal.borrow_mut().executions.push(Execution {
            text: self.text.clone(),
            slot_ids: self.parameters.iter().map(|p| p.id).collect(),
            values: self.parameters.iter().map(|p| p.value.clone()).collect(),
            kind: self.kind,
            timeout: self.timeout,
            transaction: self.transaction.clone(),
        });
        if self.text.contains("FAIL") {
            return Err(DbError::database(
                "near \"FAIL\": syntax error",
                Some("1".to_string()),
                "Check the SQL syntax and referenced objects",
            ));
        }
        Ok(())
    }
}

impl Command for MockCommand {
    type Transaction = MockTransaction;
    type Parameter = MockParameter;
    type Reader = MockReader;

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_transaction(&mut self, transaction: &MockTransaction) -> DbResult<()> {
        self.transaction = Some(transaction.0.clone());
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    fn set_kind(&mut self, kind: CommandKind) -> DbResult<()> {
        self.kind = Some(kind);
        Ok(())
    }

    fn create_parameter(&mut self) -> MockParameter {
        self.next_slot_id += 1;
        MockParameter {
            id: self.next_slot_id,
            value: Value::Null,
        }
    }

    fn add_parameter(&mut self, parameter: MockParameter) {
        self.parameters.push(parameter);
    }

    fn parameters_mut(&mut self) -> &mut [MockParameter] {
        &mut self.parameters
    }

    fn execute_non_query(&mut self) -> DbResult<u64> {
        self.record()?;
        Ok(self.affected)
    }

    fn execute_reader(&mut self) -> DbResult<MockReader> {
        self.record()?;
        self.journal.borrow_mut().readers_opened += 1;
        Ok(MockReader {
            journal: self.journal.clone(),
            rows: self.rows.clone(),
            position: None,
        })
    }
}

impl Drop for MockCommand {
    fn drop(&mut self) {
        let mut journal = self.journal.borrow_mut();
        journal.commands_released += 1;
        journal.releases.push("command");
    }
}

pub struct MockReader {
    journal: Rc<RefCell<Journal>>,
    rows: Rc<Vec<Vec<Value>>>,
    position: Option<usize>,
}

impl RowReader for MockReader {
    fn advance(&mut self) -> DbResult<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        let more = next < self.rows.len();
        if more {
            self.journal.borrow_mut().rows_advanced += 1;
        }
        Ok(more)
    }

    fn field_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    fn column_name(&self, _index: usize) -> Option<&str> {
        None
    }

    fn get_value(&self, index: usize) -> DbResult<Value> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or(DbError::NoCurrentRow)?;
        row.get(index)
            .cloned()
            .ok_or_else(|| DbError::decode(index, "column index out of range"))
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        let mut journal = self.journal.borrow_mut();
        journal.readers_released += 1;
        journal.releases.push("reader");
    }
}

/// Rows with a single integer column.
pub fn int_rows(values: &[i64]) -> Vec<Vec<Value>> {
    values.iter().map(|v| vec![Value::Int(*v)]).collect()
}
