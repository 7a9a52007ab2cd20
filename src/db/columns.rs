//! Column-list inference.
//!
//! A type opts in by listing the parameter names of its constructors through
//! [`SelectColumns`] (usually via [`impl_select_columns!`](crate::impl_select_columns)).
//! The constructor with the most parameters supplies the column list, rendered
//! as a `SELECT "a", "b" ` fragment that is prepended to caller SQL.
//!
//! Outcomes are cached per type for the life of the process, including the
//! outcome that a type has no usable constructor. The first computed entry for
//! a type is never replaced.

use crate::error::{DbError, DbResult};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tracing::{debug, trace};

/// Parameter names of one constructor, in declaration order.
pub type Constructor = &'static [&'static str];

/// Types whose constructor parameter names double as result column names.
pub trait SelectColumns: 'static {
    /// Every constructor the type declares, in declaration order.
    fn constructors() -> &'static [Constructor];
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Fragment(Arc<str>),
    Unresolvable,
}

static SELECT_COLUMNS: LazyLock<Mutex<HashMap<TypeId, CacheEntry>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Get the `SELECT "c1", "c2", ... ` fragment for `T`.
///
/// Fails with [`DbError::InvalidArgument`] when `T` has no constructor with
/// parameters. That outcome is cached too, so every later call fails the same
/// way without consulting `T::constructors` again.
pub fn column_prefix<T: SelectColumns>() -> DbResult<Arc<str>> {
    let entry = {
        // Held across inference: lookups for all types are serialized.
        let mut cache = SELECT_COLUMNS
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match cache.get(&TypeId::of::<T>()) {
            Some(entry) => {
                trace!(target_type = type_name::<T>(), "Column cache hit");
                entry.clone()
            }
            None => {
                let entry = infer::<T>();
                cache.insert(TypeId::of::<T>(), entry.clone());
                entry
            }
        }
    };

    match entry {
        CacheEntry::Fragment(fragment) => Ok(fragment),
        CacheEntry::Unresolvable => Err(DbError::invalid_argument(
            "type",
            format!("Could not find column names for type {}", type_name::<T>()),
        )),
    }
}

/// Prepend the inferred column fragment for `T` to `sql`.
pub fn add_column_names<T: SelectColumns>(sql: &str) -> DbResult<String> {
    let prefix = column_prefix::<T>()?;
    Ok(format!("{}{}", prefix, sql))
}

fn infer<T: SelectColumns>() -> CacheEntry {
    let entry = match widest_constructor(T::constructors()) {
        Some(params) => CacheEntry::Fragment(render_fragment(params).into()),
        None => CacheEntry::Unresolvable,
    };
    debug!(
        target_type = type_name::<T>(),
        resolved = matches!(entry, CacheEntry::Fragment(_)),
        "Inferred column names"
    );
    entry
}

/// The constructor with the most parameters, ignoring parameterless ones.
/// Ties go to the first declared.
fn widest_constructor(constructors: &[Constructor]) -> Option<Constructor> {
    constructors
        .iter()
        .copied()
        .filter(|params| !params.is_empty())
        .reduce(|best, params| {
            if params.len() > best.len() {
                params
            } else {
                best
            }
        })
}

fn render_fragment(params: Constructor) -> String {
    let columns = params
        .iter()
        .map(|name| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} ", columns)
}
