//! Convenience macros.

/// Build a [`Row`](crate::Row) from `column => value` pairs.
///
/// Each value goes through `sea_query::Value::from`, so integer literals become
/// `Value::Int` and string literals `Value::String`.
///
/// ```
/// use tidepool::row;
///
/// let row = row! { "id" => 1, "name" => "Acme" };
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($( $key:expr => $val:expr ),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $(
            row.insert(
                ::std::string::String::from($key),
                $crate::sea_query::Value::from($val),
            );
        )+
        row
    }};
}
