//! Declarative macros for opting types into column-list inference.

/// Implement [`SelectColumns`](crate::db::columns::SelectColumns) for a type.
///
/// The short form lists the parameters of a single constructor, typically the
/// struct fields. The long form lists every constructor, parameterless ones
/// included, in declaration order.
///
/// # Example
///
/// ```
/// use db_query_helper::impl_select_columns;
/// use db_query_helper::db::columns::add_column_names;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
/// impl_select_columns!(User { id, name });
///
/// struct Point;
/// impl_select_columns!(Point => (), (x, y), (x, y, z));
///
/// assert_eq!(
///     add_column_names::<User>("FROM users").unwrap(),
///     "SELECT \"id\", \"name\" FROM users"
/// );
/// assert_eq!(
///     add_column_names::<Point>("FROM points").unwrap(),
///     "SELECT \"x\", \"y\", \"z\" FROM points"
/// );
/// ```
#[macro_export]
macro_rules! impl_select_columns {
    ($ty:ty { $($param:ident),* $(,)? }) => {
        $crate::impl_select_columns!($ty => ($($param),*));
    };
    ($ty:ty => $( ( $($param:ident),* $(,)? ) ),+ $(,)?) => {
        impl $crate::db::columns::SelectColumns for $ty {
            fn constructors() -> &'static [$crate::db::columns::Constructor] {
                &[$( &[$(::std::stringify!($param)),*] ),+]
            }
        }
    };
}

pub use impl_select_columns;
