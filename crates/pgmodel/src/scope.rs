//! Connection scoping.
//!
//! Every terminal operation takes a [`Scope`]. A pooled scope checks out a
//! connection per statement and gives it back right after. A pinned scope
//! borrows the connection held by a [`Transaction`], so all statements issued
//! through it share that connection and its completion is left to the
//! transaction.

use crate::error::ModelResult;
use crate::pool::Database;
use crate::transaction::Transaction;
use deadpool_postgres::Object;
use tokio_postgres::Client;

/// Where a statement gets its connection from.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// A fresh pooled connection per statement.
    Pooled(&'a Database),
    /// The connection of an open transaction.
    Pinned(&'a Transaction),
}

impl<'a> Scope<'a> {
    pub fn database(&self) -> &'a Database {
        match self {
            Self::Pooled(db) => db,
            Self::Pinned(tx) => tx.database(),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Pinned(_))
    }

    /// Get a connection for one statement.
    pub(crate) async fn acquire(&self) -> ModelResult<Lease<'a>> {
        match self {
            Self::Pooled(db) => Ok(Lease::Owned(db.acquire().await?)),
            Self::Pinned(tx) => Ok(Lease::Pinned(tx.connection()?)),
        }
    }
}

impl<'a> From<&'a Database> for Scope<'a> {
    fn from(db: &'a Database) -> Self {
        Self::Pooled(db)
    }
}

impl<'a> From<&'a Transaction> for Scope<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self::Pinned(tx)
    }
}

/// A connection checked out for one statement.
pub(crate) enum Lease<'a> {
    Owned(Object),
    Pinned(&'a Object),
}

impl Lease<'_> {
    pub(crate) fn client(&self) -> &Client {
        match self {
            Self::Owned(object) => object,
            Self::Pinned(object) => object,
        }
    }

    /// Finish the statement. Owned connections go back to the pool; pinned
    /// ones stay with their transaction, which decides commit or rollback.
    pub(crate) fn executed(self, success: bool) {
        match self {
            Self::Owned(object) => {
                tracing::trace!(success, "releasing connection");
                drop(object);
            }
            Self::Pinned(_) => {
                tracing::trace!(success, "completion deferred to transaction");
            }
        }
    }
}
