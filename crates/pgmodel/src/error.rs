//! Error types for pgmodel

use thiserror::Error;

/// Result type alias for pgmodel operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for record and query operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// A record field cannot take part in column binding
    #[error("Binding error on field '{field}': {message}")]
    Binding { field: String, message: String },

    /// A result column could not be decoded
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// UPDATE/DELETE without a where clause and without an id to fall back on
    #[error("No where clause specified: {0}")]
    MissingWhere(String),

    /// A before/after execute hook refused the operation
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a schema file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// Create a binding error for a specific field
    pub fn binding(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Binding {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an aborted error, typically returned from a hook
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error came from a hook
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Parse a tokio_postgres error into a more specific ModelError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<deadpool_postgres::PoolError> for ModelError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ModelError::binding("age", "field must be Option<_>");
        assert_eq!(
            err.to_string(),
            "Binding error on field 'age': field must be Option<_>"
        );

        let err = ModelError::decode("props", "unsupported column type jsonb");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'props': unsupported column type jsonb"
        );
    }

    #[test]
    fn predicates() {
        assert!(ModelError::not_found("x").is_not_found());
        assert!(ModelError::aborted("age is zero").is_aborted());
        assert!(!ModelError::Other("x".into()).is_unique_violation());
    }
}
