//! Declarative macros for records and statement arguments.
//!
//! These expand at compile time into plain trait impls and vectors, so they cost
//! nothing at runtime beyond what the hand-written code would.

/// Implement [`Record`](crate::record::Record) for a struct from a list of bound fields.
///
/// Each entry is one of:
///
/// - `field => "column[,flag]*"`: a bound column
/// - `#[id] field => "column[,flag]*"`: a bound column that is also the identity
/// - `#[embed] field`: an embedded record whose columns are flattened in place
///
/// Fields that are not listed are not bound.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Widget {
///     id: i64,
///     name: String,
///     total: i64,
/// }
///
/// impl_record! {
///     Widget {
///         #[id] id => "id,nullempty",
///         name => "name",
///         total => "total,nowrite",
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_record {
    (@fields $b:expr; ) => { $b };
    (@fields $b:expr; #[id] $field:ident => $tag:literal $(, $($rest:tt)*)?) => {
        $crate::impl_record!(@fields $b.id($tag, |r| &r.$field, |r| &mut r.$field); $($($rest)*)?)
    };
    (@fields $b:expr; #[embed] $field:ident $(, $($rest:tt)*)?) => {
        $crate::impl_record!(@fields $b.embed(|r| &r.$field, |r| &mut r.$field); $($($rest)*)?)
    };
    (@fields $b:expr; $field:ident => $tag:literal $(, $($rest:tt)*)?) => {
        $crate::impl_record!(@fields $b.column($tag, |r| &r.$field, |r| &mut r.$field); $($($rest)*)?)
    };
    ($ty:ident { $($body:tt)* }) => {
        impl $crate::record::Record for $ty {
            fn schema() -> &'static $crate::record::Schema<Self> {
                static SCHEMA: ::std::sync::OnceLock<$crate::record::Schema<$ty>> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let builder = $crate::record::Schema::<$ty>::builder(stringify!($ty));
                    $crate::impl_record!(@fields builder; $($body)*).build()
                })
            }
        }
    };
}

/// Build a `Vec<Value>` of statement arguments.
///
/// ```ignore
/// tx.get::<Widget>("name=$1 and owner=$2", &args!["bolt", owner_id]).await?;
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::models::Value>::new() };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::models::Value::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use crate::models::Value;

    #[test]
    fn test_args_macro() {
        let args = args!["a", 2i64, None::<i32>];
        assert_eq!(args, vec![Value::from("a"), Value::Int(2), Value::NULL]);
        assert!(args![].is_empty());
    }
}
