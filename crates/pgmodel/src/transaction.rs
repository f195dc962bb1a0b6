//! Transactions.
//!
//! A [`Transaction`] holds one pooled connection with an open `BEGIN` and
//! hands out a pinned [`Scope`] for it. Every statement run through that
//! scope shares the connection; the transaction alone decides whether the
//! work is committed or rolled back.
//!
//! # Example
//!
//! ```ignore
//! use pgmodel::{Model, ModelResult, Transaction};
//!
//! # async fn demo(db: &pgmodel::Database) -> ModelResult<()> {
//! Transaction::execute(db, async |scope| {
//!     let mut a = Model::table("employees");
//!     a.put("name", "a");
//!     a.create(scope).await?;
//!
//!     let mut b = Model::table("employees");
//!     b.put("name", "b");
//!     b.create(scope).await?;
//!     Ok::<_, pgmodel::ModelError>(())
//! })
//! .await?;
//! # Ok(()) }
//! ```

use crate::error::{ModelError, ModelResult};
use crate::pool::Database;
use crate::scope::Scope;
use deadpool_postgres::Object;

/// Runs the given block inside a transaction.
///
/// - Begins a transaction on a fresh connection from `$db`.
/// - Binds a pinned [`Scope`] to `$scope` for the block.
/// - Commits on `Ok(_)`, rolls back on `Err(_)` and returns the error as is.
///
/// The block must evaluate to a `Result` whose error type implements
/// `From<pgmodel::ModelError>`.
///
/// ```ignore
/// pgmodel::transaction!(&db, scope, {
///     Model::<Employee>::new().where_clause("age > ?", params![60]).delete(scope).await?;
///     Ok::<_, ModelError>(())
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($db:expr, $scope:ident, $body:block) => {{
        let __pgmodel_tx = $crate::Transaction::begin($db).await?;
        let __pgmodel_tx_result = {
            let $scope = __pgmodel_tx.scope();
            async { $body }.await
        };
        __pgmodel_tx.finish(__pgmodel_tx_result).await
    }};
}

/// An open transaction on a dedicated pooled connection.
pub struct Transaction {
    db: Database,
    client: Option<Object>,
}

impl Transaction {
    /// Check out a connection and issue `BEGIN` on it.
    pub async fn begin(db: &Database) -> ModelResult<Self> {
        let client = db.acquire().await?;
        if let Err(e) = client.batch_execute("BEGIN").await {
            let _ = Object::take(client);
            return Err(ModelError::from_db_error(e));
        }
        tracing::debug!("transaction started");
        Ok(Self {
            db: db.clone(),
            client: Some(client),
        })
    }

    /// Run `work` inside a transaction.
    ///
    /// Commits when `work` returns `Ok`. On `Err` the transaction is rolled
    /// back and the error is returned unchanged; a failing rollback is only
    /// logged.
    pub async fn execute<T, E, F>(db: &Database, work: F) -> Result<T, E>
    where
        F: AsyncFnOnce(Scope<'_>) -> Result<T, E>,
        E: From<ModelError>,
    {
        let tx = Self::begin(db).await?;
        let result = work(tx.scope()).await;
        tx.finish(result).await
    }

    /// Pinned scope for statements that belong to this transaction.
    pub fn scope(&self) -> Scope<'_> {
        Scope::Pinned(self)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn connection(&self) -> ModelResult<&Object> {
        self.client
            .as_ref()
            .ok_or_else(|| ModelError::Connection("transaction already finished".into()))
    }

    /// Commit on `Ok`, roll back on `Err`, and pass `result` through.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<ModelError>,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                }
                Err(error)
            }
        }
    }

    pub async fn commit(mut self) -> ModelResult<()> {
        self.end("COMMIT").await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback(mut self) -> ModelResult<()> {
        self.end("ROLLBACK").await?;
        tracing::info!("transaction rolled back");
        Ok(())
    }

    /// Send `command` and give the connection back to the pool, or drop it
    /// from the pool when the command failed.
    async fn end(&mut self, command: &str) -> ModelResult<()> {
        let client = self.connection_owned()?;
        match client.batch_execute(command).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = Object::take(client);
                Err(ModelError::from_db_error(e))
            }
        }
    }

    fn connection_owned(&mut self) -> ModelResult<Object> {
        self.client
            .take()
            .ok_or_else(|| ModelError::Connection("transaction already finished".into()))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::warn!("transaction dropped without commit or rollback; discarding connection");
            let _ = Object::take(client);
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("open", &self.client.is_some())
            .finish()
    }
}
