//! Record declarations and their field schema.
//!
//! A [`Record`] is a plain struct whose fields map to table columns. The
//! mapping lives in a [`Schema`], an ordered list of [`FieldDef`] accessors
//! built once per type (normally by `#[derive(Record)]`).

use crate::hooks::Hooks;
use crate::value::{ColumnType, Value, ValueKind};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A struct bound to a table.
///
/// ```ignore
/// #[derive(Debug, Default, Record)]
/// #[orm(table = "employees")]
/// struct Employee {
///     id: Option<i64>,
///     name: Option<String>,
///     age: Option<i32>,
/// }
/// ```
pub trait Record: Default + Hooks + Send + Sized + 'static {
    /// Table name. Empty for records that are only embedded in others.
    const TABLE: &'static str;

    /// Column that marks a row as deleted instead of removing it.
    const SOFT_DELETE_COLUMN: Option<&'static str> = None;

    /// Field descriptors in declaration order, embedded records first.
    fn schema() -> &'static Schema<Self>;
}

/// Record with no fields, used for ad-hoc queries against a named table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dynamic;

impl Hooks for Dynamic {}

impl Record for Dynamic {
    const TABLE: &'static str = "";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Dynamic>> = OnceLock::new();
        SCHEMA.get_or_init(Schema::new)
    }
}

type Getter<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;
type Setter<R> = Arc<dyn Fn(&mut R, Value) -> Result<(), Value> + Send + Sync>;

/// One bound field.
pub struct FieldDef<R> {
    name: &'static str,
    column: String,
    kind: ValueKind,
    nullable: bool,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R: 'static> FieldDef<R> {
    /// An `Option<T>` field; `None` reads as [`Value::Null`].
    pub fn optional<T: ColumnType>(
        name: &'static str,
        get: fn(&R) -> &Option<T>,
        get_mut: fn(&mut R) -> &mut Option<T>,
    ) -> Self {
        Self {
            name,
            column: name.to_lowercase(),
            kind: T::KIND,
            nullable: true,
            get: Arc::new(move |record: &R| get(record).clone().map_or(Value::Null, T::into_value)),
            set: Arc::new(move |record: &mut R, value: Value| {
                *get_mut(record) = match value {
                    Value::Null => None,
                    other => Some(T::from_value(other)?),
                };
                Ok(())
            }),
        }
    }

    /// A plain `T` field.
    ///
    /// Such a field cannot represent an unset column, so importing it fails
    /// with [`ModelError::Binding`](crate::ModelError::Binding).
    pub fn required<T: ColumnType>(
        name: &'static str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        Self {
            name,
            column: name.to_lowercase(),
            kind: T::KIND,
            nullable: false,
            get: Arc::new(move |record: &R| get(record).clone().into_value()),
            set: Arc::new(move |record: &mut R, value: Value| {
                *get_mut(record) = T::from_value(value)?;
                Ok(())
            }),
        }
    }

    /// Override the column name. It is lowercased like the default.
    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_lowercase();
        self
    }

    /// Lift a field of an embedded record `P` onto its parent `R`.
    fn embedded<P: 'static>(
        parent: &FieldDef<P>,
        project: fn(&R) -> &P,
        project_mut: fn(&mut R) -> &mut P,
    ) -> Self {
        let get = Arc::clone(&parent.get);
        let set = Arc::clone(&parent.set);
        Self {
            name: parent.name,
            column: parent.column.clone(),
            kind: parent.kind,
            nullable: parent.nullable,
            get: Arc::new(move |record: &R| get(project(record))),
            set: Arc::new(move |record: &mut R, value: Value| set(project_mut(record), value)),
        }
    }
}

impl<R> FieldDef<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column_name(&self) -> &str {
        &self.column
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub(crate) fn read(&self, record: &R) -> Value {
        (self.get)(record)
    }

    /// Assign `value`, handing it back when its kind does not fit.
    pub(crate) fn write(&self, record: &mut R, value: Value) -> Result<(), Value> {
        (self.set)(record, value)
    }
}

impl<R> fmt::Debug for FieldDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// Ordered field descriptors of a record type.
pub struct Schema<R> {
    fields: Vec<FieldDef<R>>,
}

impl<R: 'static> Schema<R> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, field: FieldDef<R>) -> Self {
        self.fields.push(field);
        self
    }

    /// Append every field of an embedded record, in its own order.
    pub fn embed<P: 'static>(
        mut self,
        parent: &Schema<P>,
        project: fn(&R) -> &P,
        project_mut: fn(&mut R) -> &mut P,
    ) -> Self {
        self.fields.extend(
            parent
                .fields
                .iter()
                .map(|field| FieldDef::embedded(field, project, project_mut)),
        );
        self
    }
}

impl<R: 'static> Default for Schema<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Schema<R> {
    pub fn fields(&self) -> &[FieldDef<R>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn by_column(&self, column: &str) -> Option<&FieldDef<R>> {
        self.fields.iter().find(|f| f.column == column)
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Base {
        id: Option<i64>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Employee {
        base: Base,
        name: Option<String>,
        count: i32,
    }

    fn base_schema() -> Schema<Base> {
        Schema::<Base>::new().field(FieldDef::<Base>::optional::<i64>("id", |r| &r.id, |r| &mut r.id))
    }

    fn employee_schema(base: &Schema<Base>) -> Schema<Employee> {
        Schema::<Employee>::new()
            .embed::<Base>(base, |r: &Employee| &r.base, |r: &mut Employee| &mut r.base)
            .field(
                FieldDef::<Employee>::optional::<String>("Name", |r| &r.name, |r| &mut r.name)
                    .column("Full_Name"),
            )
            .field(FieldDef::<Employee>::required::<i32>(
                "count",
                |r| &r.count,
                |r| &mut r.count,
            ))
    }

    #[test]
    fn embedded_fields_come_first() {
        let base = base_schema();
        let schema = employee_schema(&base);
        let columns: Vec<_> = schema.fields().iter().map(|f| f.column_name()).collect();
        assert_eq!(columns, vec!["id", "full_name", "count"]);
        assert!(!schema.by_column("count").is_some_and(FieldDef::is_nullable));
    }

    #[test]
    fn accessors_reach_through_embedding() {
        let base = base_schema();
        let schema = employee_schema(&base);
        let mut record = Employee::default();

        let id = schema.by_column("id").unwrap();
        assert_eq!(id.read(&record), Value::Null);
        id.write(&mut record, Value::Int(4)).unwrap();
        assert_eq!(record.base.id, Some(4));

        let name = schema.by_column("full_name").unwrap();
        assert_eq!(
            name.write(&mut record, Value::Bool(true)),
            Err(Value::Bool(true))
        );
        name.write(&mut record, Value::Null).unwrap();
        assert_eq!(record.name, None);
    }

    #[test]
    fn dynamic_has_no_fields() {
        assert!(Dynamic::schema().is_empty());
        assert_eq!(Dynamic::TABLE, "");
    }
}
