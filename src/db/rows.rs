//! Lazy row projection tied to the lifetime of its command and reader.

use crate::db::driver::{Command, RowReader};
use crate::error::DbError;
use std::iter::FusedIterator;
use tracing::trace;

/// Iterator over the rows of an executed command, yielding `selector(reader)`
/// for each row in driver order.
///
/// The reader and its command are released exactly once: when the rows run
/// out, when the cursor or the selector fails, or when the iterator is dropped
/// before that. The reader is always released before the command.
pub struct Rows<C: Command, F> {
    // Field order is drop order: reader before command.
    reader: Option<C::Reader>,
    command: Option<C>,
    selector: F,
}

impl<C: Command, F> Rows<C, F> {
    pub(crate) fn new(command: C, reader: C::Reader, selector: F) -> Self {
        Self {
            reader: Some(reader),
            command: Some(command),
            selector,
        }
    }

    /// Release the reader and command now. Further calls to `next` return `None`.
    pub fn release(&mut self) {
        if self.reader.is_some() || self.command.is_some() {
            trace!("Releasing row reader and command");
        }
        self.reader.take();
        self.command.take();
    }

    /// Whether the reader and command are still held.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl<C, F, T, E> Iterator for Rows<C, F>
where
    C: Command,
    F: FnMut(&C::Reader) -> Result<T, E>,
    E: From<DbError>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        match reader.advance() {
            Ok(true) => {}
            Ok(false) => {
                self.release();
                return None;
            }
            Err(err) => {
                self.release();
                return Some(Err(err.into()));
            }
        }

        let item = (self.selector)(&*reader);
        if item.is_err() {
            self.release();
        }
        Some(item)
    }
}

impl<C, F, T, E> FusedIterator for Rows<C, F>
where
    C: Command,
    F: FnMut(&C::Reader) -> Result<T, E>,
    E: From<DbError>,
{
}
