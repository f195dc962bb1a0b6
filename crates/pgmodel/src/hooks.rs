//! Execution hooks for records.

use crate::error::ModelResult;

/// The terminal operation a [`Model`](crate::Model) is about to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement (or the soft-delete UPDATE standing in for it)
    Delete,
}

/// Callbacks run around every terminal operation of a [`Model`](crate::Model).
///
/// `before_execute` runs on the bound record before its fields are read into
/// the column store, so it may still change what gets written. Returning an
/// error (usually [`ModelError::Aborted`](crate::ModelError::Aborted)) stops
/// the operation before any SQL is sent.
///
/// `after_execute` runs once the statement finished. For SELECT it runs on
/// every fetched record rather than on the query instance.
///
/// `#[derive(Record)]` emits an empty impl unless the struct is annotated with
/// `#[orm(hooks)]`, in which case the type supplies its own.
pub trait Hooks {
    fn before_execute(&mut self, query_type: QueryType) -> ModelResult<()> {
        let _ = query_type;
        Ok(())
    }

    fn after_execute(&mut self, query_type: QueryType, success: bool) -> ModelResult<()> {
        let _ = (query_type, success);
        Ok(())
    }
}
