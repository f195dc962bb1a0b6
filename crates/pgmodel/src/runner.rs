//! Statement execution.
//!
//! Every function here takes SQL with `?` placeholders, gets a connection
//! from the [`Scope`], prepares, binds the [`Value`] parameters in order and
//! runs the statement. The lease is completed on every path, successful or
//! not, before the result is returned.

use crate::decode::RowPlan;
use crate::error::{ModelError, ModelResult};
use crate::pool::Database;
use crate::scope::Scope;
use crate::sql::{number_placeholders, truncate_for_log};
use crate::store::RowMap;
use crate::value::Value;
use std::path::Path;
use std::time::Instant;
use tokio_postgres::Client;
use tokio_postgres::types::{ToSql, Type};

fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn log_sql(db: &Database, sql: &str, params: &[Value]) {
    tracing::debug!(
        target: "pgmodel.sql",
        sql = %truncate_for_log(sql, db.config().log_sql_max_len),
        params = params.len(),
        "executing"
    );
    tracing::trace!(target: "pgmodel.sql", ?params, "bind");
}

fn log_done(start: Instant, rows: usize) {
    tracing::debug!(
        target: "pgmodel.sql",
        rows,
        elapsed_us = start.elapsed().as_micros() as u64,
        "done"
    );
}

/// Run a query and decode every row, keying columns relative to
/// `primary_table`.
pub async fn query_raw(
    scope: impl Into<Scope<'_>>,
    primary_table: &str,
    sql: &str,
    params: &[Value],
) -> ModelResult<Vec<RowMap>> {
    let scope = scope.into();
    let db = scope.database();
    let sql = number_placeholders(sql);
    log_sql(db, &sql, params);

    let start = Instant::now();
    let lease = scope.acquire().await?;
    let result = query_rows(lease.client(), db, primary_table, &sql, params).await;
    lease.executed(result.is_ok());

    if let Ok(rows) = &result {
        log_done(start, rows.len());
    }
    result
}

async fn query_rows(
    client: &Client,
    db: &Database,
    primary_table: &str,
    sql: &str,
    params: &[Value],
) -> ModelResult<Vec<RowMap>> {
    let stmt = client.prepare(sql).await.map_err(ModelError::from_db_error)?;
    let rows = client
        .query(&stmt, &bind(params))
        .await
        .map_err(ModelError::from_db_error)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let plan = RowPlan::build(client, db.tables(), primary_table, stmt.columns()).await?;
    rows.iter().map(|row| plan.decode(row)).collect()
}

/// Run a statement and return the number of affected rows.
pub async fn execute_raw(
    scope: impl Into<Scope<'_>>,
    sql: &str,
    params: &[Value],
) -> ModelResult<u64> {
    let scope = scope.into();
    let db = scope.database();
    let sql = number_placeholders(sql);
    log_sql(db, &sql, params);

    let start = Instant::now();
    let lease = scope.acquire().await?;
    let result = execute_statement(lease.client(), &sql, params).await;
    lease.executed(result.is_ok());

    if let Ok(affected) = result {
        log_done(start, affected as usize);
    }
    result
}

async fn execute_statement(client: &Client, sql: &str, params: &[Value]) -> ModelResult<u64> {
    let stmt = client.prepare(sql).await.map_err(ModelError::from_db_error)?;
    client
        .execute(&stmt, &bind(params))
        .await
        .map_err(ModelError::from_db_error)
}

/// Run an INSERT with `RETURNING id` appended and read back the generated key.
pub(crate) async fn insert_returning_id(
    scope: Scope<'_>,
    sql: &str,
    params: &[Value],
) -> ModelResult<Option<i64>> {
    let db = scope.database();
    let sql = format!("{} RETURNING id", number_placeholders(sql));
    log_sql(db, &sql, params);

    let start = Instant::now();
    let lease = scope.acquire().await?;
    let result = returning_id(lease.client(), &sql, params).await;
    lease.executed(result.is_ok());

    if result.is_ok() {
        log_done(start, 1);
    }
    result
}

async fn returning_id(client: &Client, sql: &str, params: &[Value]) -> ModelResult<Option<i64>> {
    let stmt = client.prepare(sql).await.map_err(ModelError::from_db_error)?;
    let Some(row) = client
        .query_opt(&stmt, &bind(params))
        .await
        .map_err(ModelError::from_db_error)?
    else {
        return Ok(None);
    };

    let id = match row.columns().first().map(|c| c.type_()) {
        Some(&Type::INT4) => row
            .try_get::<_, Option<i32>>(0)
            .map(|id| id.map(i64::from)),
        Some(&Type::INT2) => row
            .try_get::<_, Option<i16>>(0)
            .map(|id| id.map(i64::from)),
        _ => row.try_get::<_, Option<i64>>(0),
    };
    id.map_err(|e| ModelError::decode("id", e.to_string()))
}

/// Execute a DDL file verbatim, as one batch.
pub async fn load_schema(scope: impl Into<Scope<'_>>, path: impl AsRef<Path>) -> ModelResult<()> {
    let scope = scope.into();
    let path = path.as_ref();
    let ddl = tokio::fs::read_to_string(path).await?;
    tracing::info!(path = %path.display(), bytes = ddl.len(), "loading schema");

    let lease = scope.acquire().await?;
    let result = lease
        .client()
        .batch_execute(&ddl)
        .await
        .map_err(ModelError::from_db_error);
    lease.executed(result.is_ok());
    result
}
