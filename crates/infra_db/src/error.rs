//! Database error types
//!
//! SQLx errors are classified by PostgreSQL SQLSTATE code so that callers
//! above the port boundary only ever see the [`PortError`] taxonomy.

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish or keep a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {entity} with id '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation (23505)
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation (23503)
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Row-level security or grant rejected the statement (42501)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid text representation, datetime format, not-null or check violation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization failure, deadlock or server shutting down; safe to retry
    #[error("Transient database failure: {0}")]
    Transient(String),

    /// A row could not be mapped to a domain value
    #[error("Could not decode row: {0}")]
    Decode(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::InvalidInput(_)
        )
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }

    /// Maps a PostgreSQL SQLSTATE code and message to an error variant
    pub fn from_sqlstate(code: &str, message: &str) -> Self {
        let message = message.to_string();
        match code {
            "23505" => DatabaseError::DuplicateEntry(message),
            "23503" => DatabaseError::ForeignKeyViolation(message),
            "42501" => DatabaseError::PermissionDenied(message),
            "22P02" | "22007" | "22008" | "23502" | "23514" => DatabaseError::InvalidInput(message),
            "40001" | "40P01" | "57P01" | "57P03" | "53300" => DatabaseError::Transient(message),
            _ if code.starts_with("08") => DatabaseError::ConnectionFailed(message),
            _ => DatabaseError::QueryFailed(message),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(&error)
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound {
                entity: "Record",
                id: String::new(),
            },
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Database(db_err) => match db_err.code() {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                Some(code) => DatabaseError::from_sqlstate(code.as_ref(), db_err.message()),
                None => DatabaseError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::Decode(error.to_string())
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
            DatabaseError::DuplicateEntry(message) => PortError::UniqueConflict { message },
            DatabaseError::ForeignKeyViolation(message) => PortError::ForeignKeyConflict { message },
            DatabaseError::PermissionDenied(message) => PortError::permission_denied(message),
            DatabaseError::InvalidInput(message) => PortError::malformed(message),
            DatabaseError::ConnectionFailed(message) => PortError::connection(message),
            DatabaseError::Transient(_) | DatabaseError::PoolExhausted => PortError::ServiceUnavailable {
                service: error.to_string(),
            },
            DatabaseError::QueryFailed(_)
            | DatabaseError::Decode(_)
            | DatabaseError::MigrationFailed(_) => PortError::Internal {
                message: error.to_string(),
                source: Some(Box::new(error)),
            },
        }
    }
}
