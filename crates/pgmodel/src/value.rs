//! Column values.
//!
//! [`Value`] is the closed set of values a column can hold in a
//! [`ColumnValueStore`](crate::ColumnValueStore). It binds as a statement
//! parameter through `ToSql`, and [`ColumnType`] converts between it and the
//! typed fields of a record.

use bytes::BytesMut;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A single column value.
///
/// `Int` is the 32-bit integer produced when decoding `int2`/`int4` columns.
/// It widens losslessly wherever a 64-bit integer is expected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

/// The kind of a non-null [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    BigInt,
    Text,
    Timestamp,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Kind of this value, `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::BigInt(_) => Some(ValueKind::BigInt),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    fn kind_name(&self) -> &'static str {
        self.kind().map_or("null", ValueKind::as_str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Equality where `Int` and `BigInt` compare by numeric value.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Int(a), Self::BigInt(b)) | (Self::BigInt(b), Self::Int(a)) => i64::from(*a) == *b,
            _ => self == other,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::BigInt(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("(null)"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int(i32::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) if *ty == Type::BOOL => v.to_sql(ty, out),
            Self::Int(v) => bind_integer(i64::from(*v), ty, out),
            Self::BigInt(v) => bind_integer(*v, ty, out),
            Self::Text(v) if <String as ToSql>::accepts(ty) => v.to_sql(ty, out),
            Self::Timestamp(v) if *ty == Type::TIMESTAMP => v.to_sql(ty, out),
            other => Err(format!(
                "cannot bind {} value to a parameter of type {}",
                other.kind_name(),
                ty
            )
            .into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL | Type::INT2 | Type::INT4 | Type::INT8 | Type::TIMESTAMP
        ) || <String as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

/// Integers adapt to the width the server inferred for the placeholder.
fn bind_integer(
    v: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        _ => Err(format!("cannot bind integer value to a parameter of type {ty}").into()),
    }
}

/// Rust types that can back a record field.
///
/// `from_value` hands the value back unchanged when it has the wrong kind.
/// The only implicit conversion is `Int` into `i64`.
pub trait ColumnType: Clone + Send + Sync + Sized + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl ColumnType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl ColumnType for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl ColumnType for i64 {
    const KIND: ValueKind = ValueKind::BigInt;

    fn into_value(self) -> Value {
        Value::BigInt(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::BigInt(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            other => Err(other),
        }
    }
}

impl ColumnType for String {
    const KIND: ValueKind = ValueKind::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl ColumnType for NaiveDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Timestamp(v) => Ok(v),
            other => Err(other),
        }
    }
}

/// Build a `Vec<Value>` of positional parameters from mixed types.
///
/// ```ignore
/// model.where_clause("name = ? and age = ?", params!["alice", 30]);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn int_widens_into_i64_only() {
        assert_eq!(i64::from_value(Value::Int(7)), Ok(7));
        assert_eq!(i32::from_value(Value::BigInt(7)), Err(Value::BigInt(7)));
        assert_eq!(
            String::from_value(Value::Int(1)),
            Err(Value::Int(1)),
            "no coercion into text"
        );
    }

    #[test]
    fn widened_integers_are_the_same_value() {
        assert!(Value::Int(5).same_as(&Value::BigInt(5)));
        assert!(Value::BigInt(5).same_as(&Value::Int(5)));
        assert!(!Value::Int(5).same_as(&Value::BigInt(6)));
        assert!(!Value::Int(1).same_as(&Value::Text("1".into())));
        assert!(Value::Null.same_as(&Value::Null));
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::BigInt(i64::MAX).as_i32(), None);
        assert_eq!(Value::Text("x".into()).as_str(), Some("x"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).kind(), Some(ValueKind::Bool));
    }

    #[test]
    fn binds_integers_at_inferred_width() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(5).to_sql(&Type::INT8, &mut buf).is_ok());
        assert_eq!(buf.len(), 8);

        let mut buf = BytesMut::new();
        assert!(Value::BigInt(5).to_sql(&Type::INT4, &mut buf).is_ok());
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        assert!(Value::BigInt(i64::MAX).to_sql(&Type::INT4, &mut buf).is_err());
    }

    #[test]
    fn rejects_mismatched_kinds() {
        let mut buf = BytesMut::new();
        assert!(Value::Text("1".into()).to_sql(&Type::INT4, &mut buf).is_err());
        assert!(Value::Bool(true).to_sql(&Type::TEXT, &mut buf).is_err());
        assert!(matches!(
            Value::Null.to_sql(&Type::INT4, &mut buf),
            Ok(IsNull::Yes)
        ));
    }

    #[test]
    fn serializes_untagged() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Int(1),
            Value::Text("a".into()),
            Value::Timestamp(ts),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,1,"a","2024-01-02T03:04:05"]"#);
    }

    #[test]
    fn params_macro_mixes_types() {
        let params = params!["alice", 30, 7_i64, None::<String>];
        assert_eq!(
            params,
            vec![
                Value::Text("alice".into()),
                Value::Int(30),
                Value::BigInt(7),
                Value::Null
            ]
        );
    }
}
