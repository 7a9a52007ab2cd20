//! Data models shared by the helpers and drivers.

pub mod options;
pub mod value;

pub use options::{CommandKind, CommandOptions};
pub use value::Value;
