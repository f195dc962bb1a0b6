//! Query builder and record operations.
//!
//! A [`Model`] pairs a table with a bound [`Record`] and a
//! [`ColumnValueStore`]. Clause methods accumulate the parts of a query;
//! the async terminal operations (`create`, `fetch`, `update`, `delete` and
//! friends) assemble the SQL, run it through a [`Scope`] and keep the record
//! and the store in sync.
//!
//! ```ignore
//! let mut employee = Model::table("employees");
//! employee.put("name", "alice").put("age", 30);
//! let id = employee.create(&db).await?;
//!
//! let found = Model::table("employees")
//!     .where_clause("age > ?", params![20])
//!     .order("id desc")
//!     .limit(10)
//!     .fetch(&db)
//!     .await?;
//! ```

mod clauses;


use crate::binder::{export_to_record, import_from_record};
use crate::error::{ModelError, ModelResult};
use crate::hooks::QueryType;
use crate::record::{Dynamic, Record};
use crate::runner;
use crate::scope::Scope;
use crate::store::{self, ChangeSet, ColumnValueStore, RowMap, CREATED_AT_COLUMN, UPDATED_AT_COLUMN};
use crate::value::Value;
use chrono::NaiveDateTime;
use clauses::{Clauses, delete_sql, id_predicate, insert_sql, update_sql};

/// A query against one table, bound to a record of type `R`.
///
/// `Model<Dynamic>` (built with [`Model::table`]) works on bare column
/// values. A model is meant for one terminal operation: clauses are never
/// reset implicitly, so reusing an instance keeps everything set so far.
#[derive(Debug, Clone)]
pub struct Model<R: Record = Dynamic> {
    table: String,
    record: R,
    store: ColumnValueStore,
    clauses: Clauses,
    before_enabled: bool,
    after_enabled: bool,
    include_deleted: bool,
    modified_only: bool,
}

/// A prepared write: SQL with `?` placeholders and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl Model<Dynamic> {
    /// Ad-hoc model for `name` (lowercased).
    pub fn table(name: &str) -> Self {
        Self::build(name, Dynamic)
    }
}

impl<R: Record> Default for Model<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Model<R> {
    /// Model for `R::TABLE` with a default record.
    pub fn new() -> Self {
        Self::from_record(R::default())
    }

    /// Model for `R::TABLE` bound to `record`.
    pub fn from_record(record: R) -> Self {
        Self::build(R::TABLE, record)
    }

    fn build(table: &str, record: R) -> Self {
        Self {
            table: table.to_lowercase(),
            record,
            store: ColumnValueStore::new(),
            clauses: Clauses::default(),
            before_enabled: true,
            after_enabled: true,
            include_deleted: false,
            modified_only: false,
        }
    }

    /// Use `name` as the table instead of the declared one.
    pub fn with_table(mut self, name: &str) -> Self {
        self.table = name.to_lowercase();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_record(self) -> R {
        self.record
    }

    pub fn store(&self) -> &ColumnValueStore {
        &self.store
    }

    pub fn column_values(&self) -> &RowMap {
        self.store.values()
    }

    // ── column values ───────────────────────────────────────────────────────

    /// Set a column value. A record field bound to the same column is updated
    /// too, so the value survives the import done by terminal operations.
    pub fn put(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if let Some(field) = R::schema().by_column(column) {
            if let Err(rejected) = field.write(&mut self.record, value.clone()) {
                tracing::warn!(
                    table = %self.table,
                    column,
                    expected = %field.kind(),
                    got = ?rejected,
                    "value does not fit the bound field"
                );
            }
        }
        self.store.put(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.store.get(column)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.store.get_i64(column)
    }

    pub fn get_i32(&self, column: &str) -> Option<i32> {
        self.store.get_i32(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.store.get_str(column)
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.store.get_bool(column)
    }

    pub fn get_timestamp(&self, column: &str) -> Option<NaiveDateTime> {
        self.store.get_timestamp(column)
    }

    pub fn id(&self) -> Option<i64> {
        self.store.id()
    }

    // ── clauses ─────────────────────────────────────────────────────────────

    /// Replace the select list (defaults to `*`).
    pub fn select(mut self, clause: impl Into<String>) -> Self {
        self.clauses.select = clause.into();
        self
    }

    /// Append a join. `JOIN ` is prepended when the text has no `join` word.
    pub fn joins(mut self, clause: &str) -> Self {
        self.clauses.add_join(clause);
        self
    }

    /// Add a predicate, combined with earlier ones using `and`.
    ///
    /// A blank clause is ignored along with its params.
    pub fn where_clause(mut self, clause: &str, params: Vec<Value>) -> Self {
        self.clauses.add_where(clause, params);
        self
    }

    pub fn reset_where(mut self) -> Self {
        self.clauses.reset_where();
        self
    }

    pub fn order(mut self, clause: impl Into<String>) -> Self {
        self.clauses.order = clause.into();
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.clauses.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.clauses.offset = Some(offset);
        self
    }

    /// Also fetch soft-deleted rows.
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    /// Only write columns that changed since the last sync on `update`.
    pub fn modified_only(mut self, modified_only: bool) -> Self {
        self.modified_only = modified_only;
        self
    }

    pub fn set_enable_before_execute(&mut self, enable: bool) -> &mut Self {
        self.before_enabled = enable;
        self
    }

    pub fn set_enable_after_execute(&mut self, enable: bool) -> &mut Self {
        self.after_enabled = enable;
        self
    }

    /// The SELECT `fetch` would run.
    pub fn to_select_sql(&self) -> String {
        self.fetch_clauses().select_sql(&self.table)
    }

    /// Table and column values, one per line.
    pub fn dump(&self) -> String {
        format!("table: {}\n{}", self.table, self.store.dump())
    }

    /// Column values as a JSON object, in column order.
    pub fn to_json(&self) -> ModelResult<String> {
        serde_json::to_string(self.store.values()).map_err(|e| ModelError::Other(e.to_string()))
    }

    // ── terminal operations ─────────────────────────────────────────────────

    /// Insert the bound values and return the generated id.
    pub async fn create(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<i64> {
        let scope = scope.into();
        self.ensure_table()?;
        self.before(QueryType::Insert)?;
        let result = self.run_create(scope).await;
        self.complete(QueryType::Insert, result)
    }

    async fn run_create(&mut self, scope: Scope<'_>) -> ModelResult<i64> {
        let (stmt, changes) = self.insert_statement()?;
        let id = runner::insert_returning_id(scope, &stmt.sql, &stmt.params)
            .await?
            .ok_or_else(|| ModelError::Other(format!("insert into {} returned no id", self.table)))?;

        self.store.put_id(id);
        self.keep_stamp(&changes, CREATED_AT_COLUMN);
        self.store.commit_snapshot();
        export_to_record(&mut self.record, &self.store);
        Ok(id)
    }

    pub(crate) fn insert_statement(&mut self) -> ModelResult<(Statement, ChangeSet)> {
        import_from_record(&self.record, &mut self.store)?;
        let changes = self.store.change_set(QueryType::Insert, false);
        let stmt = Statement {
            sql: insert_sql(&self.table, &changes.names),
            params: changes.values.clone(),
        };
        Ok((stmt, changes))
    }

    /// Run the SELECT and return one model per row.
    ///
    /// Each result gets a fresh record filled from the row, then its
    /// `after_execute` hook.
    pub async fn fetch(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<Vec<Model<R>>> {
        let clauses = self.fetch_clauses();
        self.select_with(scope.into(), clauses).await
    }

    /// Like [`fetch`](Self::fetch), returning only the records.
    pub async fn fetch_records(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<Vec<R>> {
        let models = self.fetch(scope).await?;
        Ok(models.into_iter().map(Model::into_record).collect())
    }

    /// First result of `fetch`. No `LIMIT` is added.
    pub async fn fetch_first(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<Model<R>> {
        self.fetch(scope)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::not_found(format!("no row in {}", self.table)))
    }

    /// First row matching `clause` (on top of any existing where).
    pub async fn find_by(
        &mut self,
        scope: impl Into<Scope<'_>>,
        clause: &str,
        params: Vec<Value>,
    ) -> ModelResult<Option<Model<R>>> {
        let mut clauses = self.fetch_clauses();
        clauses.add_where(clause, params);
        clauses.limit = Some(1);
        let models = self.select_with(scope.into(), clauses).await?;
        Ok(models.into_iter().next())
    }

    /// Row with the given id.
    pub async fn find(
        &mut self,
        scope: impl Into<Scope<'_>>,
        id: i64,
    ) -> ModelResult<Option<Model<R>>> {
        let predicate = id_predicate(&self.table, self.clauses.has_join(), id);
        self.find_by(scope, &predicate, Vec::new()).await
    }

    /// Whether the query matches at least one row.
    pub async fn exists(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<bool> {
        let mut clauses = self.fetch_clauses();
        clauses.limit = Some(1);
        Ok(!self.select_with(scope.into(), clauses).await?.is_empty())
    }

    async fn select_with(&mut self, scope: Scope<'_>, clauses: Clauses) -> ModelResult<Vec<Model<R>>> {
        self.ensure_table()?;
        self.before(QueryType::Select)?;
        match self.run_select(scope, &clauses).await {
            Ok(models) => Ok(models),
            Err(e) => {
                if let Err(hook_err) = self.after(QueryType::Select, false) {
                    tracing::debug!(error = %hook_err, "after_execute failed on a failed select");
                }
                Err(e)
            }
        }
    }

    async fn run_select(&self, scope: Scope<'_>, clauses: &Clauses) -> ModelResult<Vec<Model<R>>> {
        let sql = clauses.select_sql(&self.table);
        let rows = runner::query_raw(scope, &self.table, &sql, &clauses.params).await?;

        let mut models = Vec::with_capacity(rows.len());
        for row in rows {
            let mut model = Self::build(&self.table, R::default());
            model.before_enabled = self.before_enabled;
            model.after_enabled = self.after_enabled;
            model.store = ColumnValueStore::loaded(row);
            export_to_record(&mut model.record, &model.store);
            model.after(QueryType::Select, true)?;
            models.push(model);
        }
        Ok(models)
    }

    fn fetch_clauses(&self) -> Clauses {
        let mut clauses = self.clauses.clone();
        if let Some(column) = R::SOFT_DELETE_COLUMN {
            if !self.include_deleted {
                clauses.add_where(&format!("{}.{} is null", self.table, column), Vec::new());
            }
        }
        clauses
    }

    /// Write the changed columns, filtered by the where clause or the id.
    ///
    /// Returns the number of affected rows; nothing is sent when there is
    /// nothing to write.
    pub async fn update(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<u64> {
        let scope = scope.into();
        self.ensure_table()?;
        self.before(QueryType::Update)?;
        let result = self.run_update(scope).await;
        self.complete(QueryType::Update, result)
    }

    async fn run_update(&mut self, scope: Scope<'_>) -> ModelResult<u64> {
        let Some((stmt, changes)) = self.update_statement()? else {
            tracing::warn!(table = %self.table, "nothing to update");
            return Ok(0);
        };

        let affected = runner::execute_raw(scope, &stmt.sql, &stmt.params).await?;
        if affected == 0 {
            tracing::warn!(table = %self.table, sql = %stmt.sql, "update affected no rows");
        }

        self.keep_stamp(&changes, UPDATED_AT_COLUMN);
        self.store.commit_snapshot();
        export_to_record(&mut self.record, &self.store);
        Ok(affected)
    }

    pub(crate) fn update_statement(&mut self) -> ModelResult<Option<(Statement, ChangeSet)>> {
        import_from_record(&self.record, &mut self.store)?;
        let (filter, filter_params) = self.write_filter()?;
        let changes = self.store.change_set(QueryType::Update, self.modified_only);
        if changes.is_empty() {
            return Ok(None);
        }

        let mut params = changes.values.clone();
        params.extend(filter_params);
        let stmt = Statement {
            sql: update_sql(&self.table, &changes.names, &filter),
            params,
        };
        Ok(Some((stmt, changes)))
    }

    /// Set one column directly. Hooks and change tracking are skipped, so
    /// this is also the way to write NULL.
    pub async fn update_column(
        &mut self,
        scope: impl Into<Scope<'_>>,
        column: &str,
        value: impl Into<Value>,
    ) -> ModelResult<u64> {
        self.ensure_table()?;
        self.write_column(scope.into(), column, value.into()).await
    }

    async fn write_column(&mut self, scope: Scope<'_>, column: &str, value: Value) -> ModelResult<u64> {
        let stmt = self.column_statement(column, value.clone())?;
        let affected = runner::execute_raw(scope, &stmt.sql, &stmt.params).await?;
        if affected == 0 {
            tracing::warn!(table = %self.table, column, "update affected no rows");
        }
        self.store.mark_written(column, value);
        export_to_record(&mut self.record, &self.store);
        Ok(affected)
    }

    pub(crate) fn column_statement(&mut self, column: &str, value: Value) -> ModelResult<Statement> {
        import_from_record(&self.record, &mut self.store)?;
        let (filter, filter_params) = self.write_filter()?;
        let mut params = vec![value];
        params.extend(filter_params);
        Ok(Statement {
            sql: update_sql(&self.table, &[column.to_string()], &filter),
            params,
        })
    }

    /// Delete the matching rows, filtered by the where clause or the id.
    ///
    /// Records with a soft-delete column get that column set to the current
    /// time instead.
    pub async fn delete(&mut self, scope: impl Into<Scope<'_>>) -> ModelResult<u64> {
        let scope = scope.into();
        self.ensure_table()?;
        self.before(QueryType::Delete)?;
        let result = match R::SOFT_DELETE_COLUMN {
            Some(column) => {
                self.write_column(scope, column, Value::Timestamp(store::now()))
                    .await
            }
            None => self.run_delete(scope).await,
        };
        self.complete(QueryType::Delete, result)
    }

    async fn run_delete(&mut self, scope: Scope<'_>) -> ModelResult<u64> {
        let stmt = self.delete_statement()?;
        runner::execute_raw(scope, &stmt.sql, &stmt.params).await
    }

    pub(crate) fn delete_statement(&mut self) -> ModelResult<Statement> {
        import_from_record(&self.record, &mut self.store)?;
        let (filter, params) = self.write_filter()?;
        Ok(Statement {
            sql: delete_sql(&self.table, &filter),
            params,
        })
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    /// Where text and params for UPDATE/DELETE, falling back to the id.
    fn write_filter(&self) -> ModelResult<(String, Vec<Value>)> {
        if !self.clauses.filter.is_empty() {
            return Ok((self.clauses.filter.clone(), self.clauses.params.clone()));
        }
        match self.store.id() {
            Some(id) => Ok((
                id_predicate(&self.table, self.clauses.has_join(), id),
                Vec::new(),
            )),
            None => Err(ModelError::MissingWhere(format!(
                "table {} has no where clause and no id",
                self.table
            ))),
        }
    }

    /// Copy the timestamp written for `column` back into the store.
    fn keep_stamp(&mut self, changes: &ChangeSet, column: &str) {
        if let Some(value) = changes.get(column) {
            self.store.put(column, value.clone());
        }
    }

    fn ensure_table(&self) -> ModelResult<()> {
        if self.table.trim().is_empty() {
            return Err(ModelError::Other(
                "model has no table; declare one or use with_table".into(),
            ));
        }
        Ok(())
    }

    fn before(&mut self, query_type: QueryType) -> ModelResult<()> {
        if self.before_enabled {
            self.record.before_execute(query_type)?;
        }
        Ok(())
    }

    fn after(&mut self, query_type: QueryType, success: bool) -> ModelResult<()> {
        if self.after_enabled {
            self.record.after_execute(query_type, success)?;
        }
        Ok(())
    }

    /// Run the after hook and surface the operation's error first.
    fn complete<T>(&mut self, query_type: QueryType, result: ModelResult<T>) -> ModelResult<T> {
        let hook = self.after(query_type, result.is_ok());
        let value = result?;
        hook?;
        Ok(value)
    }
}
