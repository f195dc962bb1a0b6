//! Derive macros for pgmodel
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod common;
mod record;

/// Derive `Record` for a struct, binding its fields to table columns.
///
/// # Example
///
/// ```ignore
/// use pgmodel::Record;
///
/// #[derive(Debug, Default, Record)]
/// #[orm(table = "employees")]
/// struct Employee {
///     #[orm(flatten)]
///     base: Base,
///     name: Option<String>,
///     #[orm(column = "years")]
///     age: Option<i32>,
///     #[orm(skip)]
///     scratch: Vec<u8>,
/// }
/// ```
///
/// # Generated
///
/// - `impl Record` with `TABLE`, `SOFT_DELETE_COLUMN` and a `schema()` built
///   once on first use
/// - an empty `impl Hooks`, unless `#[orm(hooks)]` is given
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (omit for records only used with `flatten`)
/// - `#[orm(soft_delete = "column")]` - Mark rows deleted by setting `column`
/// - `#[orm(hooks)]` - The type implements `Hooks` itself
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(flatten)]` - Embed the fields of another `Record` (they come first)
/// - `#[orm(skip)]` - Leave the field unbound
///
/// Bound fields must be `Option<T>` with `T` one of `bool`, `i32`, `i64`,
/// `String`, `NaiveDateTime`. Any other field type fails to compile; a plain
/// `T` compiles but is rejected with a binding error when the record is used.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
