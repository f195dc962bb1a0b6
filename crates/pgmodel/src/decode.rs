//! Result row decoding.
//!
//! Each result column is classified once per statement, then every row is
//! turned into a [`RowMap`] keyed by column name. Columns reported by a table
//! other than the primary one are keyed `table.column`.

use crate::error::{ModelError, ModelResult};
use crate::store::RowMap;
use crate::value::Value;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Column, Row};

/// Supported result column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Text,
    Timestamp,
}

/// Map a column type onto the value it decodes into, `None` if unsupported.
pub fn classify(ty: &Type) -> Option<ColumnKind> {
    match *ty {
        Type::BOOL => Some(ColumnKind::Bool),
        Type::INT2 => Some(ColumnKind::SmallInt),
        Type::INT4 => Some(ColumnKind::Int),
        Type::INT8 => Some(ColumnKind::BigInt),
        Type::VARCHAR | Type::TEXT | Type::BPCHAR => Some(ColumnKind::Text),
        Type::TIMESTAMP => Some(ColumnKind::Timestamp),
        _ => None,
    }
}

/// Key a column is stored under. A schema prefix on `primary_table` is
/// ignored, since `table` is the bare relation name.
pub fn column_key(primary_table: &str, table: &str, column: &str) -> String {
    let primary = primary_table.rsplit('.').next().unwrap_or(primary_table);
    if table.is_empty() || table == primary {
        column.to_string()
    } else {
        format!("{table}.{column}")
    }
}

/// Cache of table OID to table name, shared by every connection of a pool.
#[derive(Debug, Default)]
pub(crate) struct TableNames {
    names: Mutex<HashMap<u32, String>>,
}

impl TableNames {
    fn cached(&self, oid: u32) -> Option<String> {
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&oid)
            .cloned()
    }

    async fn resolve(&self, client: &Client, oid: u32) -> ModelResult<String> {
        if let Some(name) = self.cached(oid) {
            return Ok(name);
        }

        let row = client
            .query_opt(
                "SELECT relname::text FROM pg_catalog.pg_class WHERE oid = $1",
                &[&oid],
            )
            .await
            .map_err(ModelError::from_db_error)?;
        let name: String = match row {
            Some(row) => row.try_get(0).map_err(ModelError::from_db_error)?,
            None => String::new(),
        };

        tracing::trace!(oid, table = %name, "resolved table name");
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(oid, name.clone());
        Ok(name)
    }
}

/// Per-column decoding instructions for one statement.
#[derive(Debug, Clone)]
pub(crate) struct RowPlan {
    columns: Vec<(String, ColumnKind)>,
}

impl RowPlan {
    pub(crate) async fn build(
        client: &Client,
        tables: &TableNames,
        primary_table: &str,
        columns: &[Column],
    ) -> ModelResult<Self> {
        let mut planned = Vec::with_capacity(columns.len());
        for column in columns {
            let table = match column.table_oid() {
                Some(oid) if oid != 0 => tables.resolve(client, oid).await?,
                _ => String::new(),
            };
            let key = column_key(primary_table, &table, column.name());
            let kind = classify(column.type_()).ok_or_else(|| {
                ModelError::decode(
                    key.clone(),
                    format!("unsupported column type {}", column.type_()),
                )
            })?;
            planned.push((key, kind));
        }
        Ok(Self { columns: planned })
    }

    pub(crate) fn decode(&self, row: &Row) -> ModelResult<RowMap> {
        let mut map = RowMap::with_capacity(self.columns.len());
        for (idx, (key, kind)) in self.columns.iter().enumerate() {
            let value = read_value(row, idx, *kind)
                .map_err(|e| ModelError::decode(key.clone(), e.to_string()))?;
            map.insert(key.clone(), value);
        }
        Ok(map)
    }
}

fn read_value(row: &Row, idx: usize, kind: ColumnKind) -> Result<Value, tokio_postgres::Error> {
    Ok(match kind {
        ColumnKind::Bool => row.try_get::<_, Option<bool>>(idx)?.into(),
        ColumnKind::SmallInt => row.try_get::<_, Option<i16>>(idx)?.into(),
        ColumnKind::Int => row.try_get::<_, Option<i32>>(idx)?.into(),
        ColumnKind::BigInt => row.try_get::<_, Option<i64>>(idx)?.into(),
        ColumnKind::Text => row.try_get::<_, Option<String>>(idx)?.into(),
        ColumnKind::Timestamp => row.try_get::<_, Option<NaiveDateTime>>(idx)?.into(),
    })
}
