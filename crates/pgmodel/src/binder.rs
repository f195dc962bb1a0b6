//! Transfer between a record's fields and a column store.

use crate::error::{ModelError, ModelResult};
use crate::record::Record;
use crate::store::ColumnValueStore;

/// Copy every bound field of `record` into `store`.
///
/// All fields are checked before anything is written, so a schema with a
/// non-nullable field leaves the store untouched.
pub fn import_from_record<R: Record>(record: &R, store: &mut ColumnValueStore) -> ModelResult<()> {
    let schema = R::schema();

    if let Some(field) = schema.fields().iter().find(|f| !f.is_nullable()) {
        return Err(ModelError::binding(
            field.name(),
            format!(
                "field bound to column '{}' must be an Option<{}> so it can stay unset",
                field.column_name(),
                field.kind()
            ),
        ));
    }

    for field in schema.fields() {
        store.put(field.column_name(), field.read(record));
    }
    Ok(())
}

/// Copy column values from `store` back into the fields of `record`.
///
/// Columns missing from the store leave their field untouched. A value whose
/// kind does not fit the field is logged and skipped.
pub fn export_to_record<R: Record>(record: &mut R, store: &ColumnValueStore) {
    for field in R::schema().fields() {
        let Some(value) = store.get(field.column_name()) else {
            continue;
        };
        if let Err(rejected) = field.write(record, value.clone()) {
            tracing::warn!(
                table = R::TABLE,
                field = field.name(),
                column = field.column_name(),
                expected = %field.kind(),
                got = ?rejected,
                "cannot assign column value to field"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Hooks;
    use crate::record::{FieldDef, Schema};
    use crate::value::Value;
    use std::sync::OnceLock;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Employee {
        id: Option<i64>,
        name: Option<String>,
        age: Option<i32>,
        active: Option<bool>,
    }

    impl Hooks for Employee {}

    impl Record for Employee {
        const TABLE: &'static str = "employees";

        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<Employee>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::<Employee>::new()
                    .field(FieldDef::<Employee>::optional::<i64>("id", |r| &r.id, |r| &mut r.id))
                    .field(FieldDef::<Employee>::optional::<String>(
                        "name",
                        |r| &r.name,
                        |r| &mut r.name,
                    ))
                    .field(FieldDef::<Employee>::optional::<i32>(
                        "age",
                        |r| &r.age,
                        |r| &mut r.age,
                    ))
                    .field(
                        FieldDef::<Employee>::optional::<bool>(
                            "active",
                            |r| &r.active,
                            |r| &mut r.active,
                        )
                        .column("is_active"),
                    )
            })
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        hits: i32,
    }

    impl Hooks for Counter {}

    impl Record for Counter {
        const TABLE: &'static str = "counters";

        fn schema() -> &'static Schema<Self> {
            static SCHEMA: OnceLock<Schema<Counter>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::<Counter>::new().field(FieldDef::<Counter>::required::<i32>(
                    "hits",
                    |r| &r.hits,
                    |r| &mut r.hits,
                ))
            })
        }
    }

    #[test]
    fn import_then_export_reproduces_record() {
        let record = Employee {
            id: Some(3),
            name: Some("alice".into()),
            age: None,
            active: Some(true),
        };
        let mut store = ColumnValueStore::new();
        import_from_record(&record, &mut store).unwrap();
        assert_eq!(store.get("is_active"), Some(&Value::Bool(true)));
        assert_eq!(store.get("age"), Some(&Value::Null));

        let copy = store.clone();
        let mut restored = Employee::default();
        export_to_record(&mut restored, &copy);
        assert_eq!(restored, record);
    }

    #[test]
    fn export_leaves_absent_columns_untouched() {
        let mut record = Employee {
            name: Some("kept".into()),
            ..Default::default()
        };
        let mut store = ColumnValueStore::new();
        store.put("age", 40);
        export_to_record(&mut record, &store);
        assert_eq!(record.name.as_deref(), Some("kept"));
        assert_eq!(record.age, Some(40));
    }

    #[test]
    fn export_widens_int_and_skips_mismatches() {
        let mut record = Employee::default();
        let mut store = ColumnValueStore::new();
        store.put("id", Value::Int(12));
        store.put("name", Value::Int(5));
        store.put("age", "old");
        export_to_record(&mut record, &store);
        assert_eq!(record.id, Some(12));
        assert_eq!(record.name, None);
        assert_eq!(record.age, None);
    }

    #[test]
    fn non_nullable_field_is_a_binding_error() {
        let mut store = ColumnValueStore::new();
        let err = import_from_record(&Counter { hits: 1 }, &mut store).unwrap_err();
        assert!(matches!(err, ModelError::Binding { ref field, .. } if field == "hits"));
        assert!(store.is_empty());
    }
}
