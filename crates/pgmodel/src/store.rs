//! Column value store with dirty tracking.

use crate::hooks::QueryType;
use crate::value::Value;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use std::fmt::Write as _;

/// Column name to value map in insertion order.
pub type RowMap = IndexMap<String, Value>;

/// Primary key column.
pub const ID_COLUMN: &str = "id";
/// Stamped with the current time on INSERT when present.
pub const CREATED_AT_COLUMN: &str = "created_at";
/// Stamped with the current time on UPDATE when present.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

fn is_reserved(column: &str) -> bool {
    column == ID_COLUMN || column == CREATED_AT_COLUMN || column == UPDATED_AT_COLUMN
}

/// Current UTC time at the microsecond precision of a `timestamp` column.
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// The `(column, value)` pairs an INSERT or UPDATE writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub names: Vec<String>,
    pub values: Vec<Value>,
}

impl ChangeSet {
    fn push(&mut self, name: &str, value: Value) {
        self.names.push(name.to_string());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Untyped working set of column values backing one [`Model`](crate::Model).
///
/// `snapshot` holds the last state known to match the database. It changes
/// only through [`commit_snapshot`](Self::commit_snapshot), after a successful
/// write or when a store is loaded from a fetched row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValueStore {
    current: RowMap,
    snapshot: RowMap,
}

impl ColumnValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding a row just read from the database; it starts clean.
    pub fn loaded(row: RowMap) -> Self {
        let mut store = Self {
            current: row,
            snapshot: RowMap::new(),
        };
        store.commit_snapshot();
        store
    }

    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.current.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.current.get(column)
    }

    /// Value of `column`, or `fallback` when the column is absent.
    pub fn get_or<'a>(&'a self, column: &str, fallback: &'a Value) -> &'a Value {
        self.current.get(column).unwrap_or(fallback)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn get_i32(&self, column: &str) -> Option<i32> {
        self.get(column).and_then(Value::as_i32)
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Value::as_bool)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn get_timestamp(&self, column: &str) -> Option<NaiveDateTime> {
        self.get(column).and_then(Value::as_timestamp)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.current.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.current.shift_remove(column)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.current.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> &RowMap {
        &self.current
    }

    /// Replace every current value. The snapshot is kept.
    pub fn replace_all(&mut self, values: RowMap) {
        self.current = values;
    }

    /// The `id` column as an integer, if set.
    pub fn id(&self) -> Option<i64> {
        self.get_i64(ID_COLUMN)
    }

    pub fn put_id(&mut self, id: i64) {
        self.put(ID_COLUMN, Value::BigInt(id));
    }

    /// Whether `column` differs from the last synced state.
    pub fn is_modified(&self, column: &str) -> bool {
        match (self.current.get(column), self.snapshot.get(column)) {
            (Some(current), Some(prev)) => !current.same_as(prev),
            (current, prev) => current != prev,
        }
    }

    /// Build the columns to write for `query_type`.
    ///
    /// Reserved columns and nulls are skipped. With `modified_only`, only
    /// columns present in the snapshot with a different value are kept. The
    /// timestamp column matching the operation is appended when present: the
    /// caller's value if it was set since the last sync, otherwise the
    /// current time.
    pub fn change_set(&self, query_type: QueryType, modified_only: bool) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (column, value) in &self.current {
            if is_reserved(column) || value.is_null() {
                continue;
            }
            if modified_only && self.snapshot.get(column).is_none_or(|prev| prev.same_as(value)) {
                continue;
            }
            changes.push(column, value.clone());
        }

        let stamp = match query_type {
            QueryType::Insert => Some(CREATED_AT_COLUMN),
            QueryType::Update => Some(UPDATED_AT_COLUMN),
            QueryType::Select | QueryType::Delete => None,
        };
        if let Some(column) = stamp {
            if let Some(value) = self.current.get(column) {
                let value = if value.is_null() || !self.is_modified(column) {
                    Value::Timestamp(now())
                } else {
                    value.clone()
                };
                changes.push(column, value);
            }
        }

        changes
    }

    /// Record a single column as written, without touching other columns.
    pub(crate) fn mark_written(&mut self, column: &str, value: Value) {
        self.snapshot.insert(column.to_string(), value.clone());
        self.current.insert(column.to_string(), value);
    }

    /// Mark the current state as synced with the database.
    pub fn commit_snapshot(&mut self) {
        self.snapshot = self.current.clone();
    }

    /// One `column : value` line per entry.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (column, value) in &self.current {
            let _ = writeln!(out, " {column} : {value}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, Value)]) -> ColumnValueStore {
        let mut store = ColumnValueStore::new();
        for (column, value) in pairs {
            store.put(*column, value.clone());
        }
        store
    }

    #[test]
    fn modified_only_yields_changed_columns() {
        let mut s = store(&[
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            ("c", Value::Int(3)),
        ]);
        s.commit_snapshot();
        s.put("b", 22);
        s.put("c", 33);

        let changes = s.change_set(QueryType::Update, true);
        assert_eq!(changes.names, vec!["b", "c"]);
        assert_eq!(changes.values, vec![Value::Int(22), Value::Int(33)]);

        let all = s.change_set(QueryType::Update, false);
        assert_eq!(all.names, vec!["a", "b", "c"]);
    }

    #[test]
    fn widened_int_is_not_a_modification() {
        let mut s = ColumnValueStore::loaded(RowMap::from_iter([
            ("id".to_string(), Value::BigInt(1)),
            ("age".to_string(), Value::Int(40)),
        ]));
        s.put("age", 40_i64);
        assert!(!s.is_modified("age"));
        assert!(s.change_set(QueryType::Update, true).is_empty());

        s.put("age", 41_i64);
        assert!(s.is_modified("age"));
        assert_eq!(s.change_set(QueryType::Update, true).names, vec!["age"]);
    }

    #[test]
    fn now_has_microsecond_precision() {
        use chrono::Timelike;
        assert_eq!(now().nanosecond() % 1_000, 0);
    }

    #[test]
    fn null_versus_value_is_a_modification() {
        let mut s = store(&[("a", Value::Null)]);
        s.commit_snapshot();
        s.put("a", "x");
        assert!(s.is_modified("a"));
        assert_eq!(s.change_set(QueryType::Update, true).names, vec!["a"]);
    }

    #[test]
    fn skips_reserved_and_null_columns() {
        let s = store(&[
            ("id", Value::BigInt(1)),
            ("name", Value::Text("a".into())),
            ("age", Value::Null),
        ]);
        let changes = s.change_set(QueryType::Insert, false);
        assert_eq!(changes.names, vec!["name"]);
    }

    #[test]
    fn stamps_created_at_on_insert_only_when_present() {
        let without = store(&[("name", Value::from("a"))]);
        assert!(
            without
                .change_set(QueryType::Insert, false)
                .get(CREATED_AT_COLUMN)
                .is_none()
        );

        let with = store(&[
            ("name", Value::from("a")),
            ("created_at", Value::Null),
            ("updated_at", Value::Null),
        ]);
        let insert = with.change_set(QueryType::Insert, false);
        assert_eq!(insert.names, vec!["name", "created_at"]);
        assert!(matches!(insert.get("created_at"), Some(Value::Timestamp(_))));

        let update = with.change_set(QueryType::Update, false);
        assert_eq!(update.names, vec!["name", "updated_at"]);
    }

    #[test]
    fn keeps_caller_supplied_timestamp() {
        let ts = chrono::NaiveDate::from_ymd_opt(2020, 5, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let s = store(&[("created_at", Value::Timestamp(ts))]);
        assert_eq!(
            s.change_set(QueryType::Insert, false).get("created_at"),
            Some(&Value::Timestamp(ts))
        );

        // A value that only reflects the last sync is refreshed.
        let mut synced = store(&[("updated_at", Value::Timestamp(ts))]);
        synced.commit_snapshot();
        let changes = synced.change_set(QueryType::Update, false);
        assert_ne!(changes.get("updated_at"), Some(&Value::Timestamp(ts)));
    }

    #[test]
    fn change_set_does_not_mutate_current() {
        let s = store(&[("name", Value::from("a")), ("created_at", Value::Null)]);
        let before = s.clone();
        let _ = s.change_set(QueryType::Insert, false);
        assert_eq!(s, before);
    }

    #[test]
    fn preserves_insertion_order() {
        let s = store(&[
            ("z", Value::Int(1)),
            ("a", Value::Int(2)),
            ("m", Value::Int(3)),
        ]);
        assert_eq!(
            s.change_set(QueryType::Insert, false).names,
            vec!["z", "a", "m"]
        );
    }

    #[test]
    fn modified_only_ignores_columns_missing_from_snapshot() {
        let mut s = store(&[("a", Value::Int(1))]);
        s.commit_snapshot();
        s.put("b", 2);
        assert!(s.change_set(QueryType::Update, true).is_empty());
        assert_eq!(s.change_set(QueryType::Update, false).names, vec!["a", "b"]);
    }

    #[test]
    fn loaded_store_starts_clean() {
        let mut row = RowMap::new();
        row.insert("name".into(), Value::from("a"));
        let mut s = ColumnValueStore::loaded(row);
        assert!(s.change_set(QueryType::Update, true).is_empty());
        s.put("name", "b");
        assert_eq!(s.change_set(QueryType::Update, true).names, vec!["name"]);
    }

    #[test]
    fn id_and_fallback_accessors() {
        let mut s = ColumnValueStore::new();
        assert_eq!(s.id(), None);
        s.put("id", 5);
        assert_eq!(s.id(), Some(5), "int ids read as i64");
        s.put_id(9);
        assert_eq!(s.get("id"), Some(&Value::BigInt(9)));

        let fallback = Value::from("none");
        assert_eq!(s.get_or("missing", &fallback), &fallback);
    }

    #[test]
    fn mark_written_touches_one_column() {
        let mut s = store(&[("a", Value::Int(1)), ("b", Value::Int(2))]);
        s.mark_written("a", Value::Int(10));
        assert!(!s.is_modified("a"));
        assert!(s.is_modified("b"));
    }
}
