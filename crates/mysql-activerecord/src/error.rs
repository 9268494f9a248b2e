//! Error types for mysql-activerecord

use thiserror::Error;

/// Result type alias for mysql-activerecord operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for builder and database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Missing or invalid connection settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Builder misuse detected before any SQL was dispatched
    #[error("Usage error: {0}")]
    Usage(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error reported by the driver
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the error means the server connection was lost or refused.
    ///
    /// These are the only errors that schedule a reconnect on a direct
    /// connection; everything else is handed back to the caller untouched.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::Query(err) => is_connection_lost(err),
            _ => false,
        }
    }
}

/// Server error numbers reported for a session the server has dropped:
/// `ER_CONNECTION_KILLED`, `CR_SERVER_GONE_ERROR`, `CR_SERVER_LOST` and
/// `ER_CLIENT_INTERACTION_TIMEOUT`.
const LOST_SESSION_ERRORS: [u16; 4] = [1927, 2006, 2013, 4031];

pub(crate) fn is_connection_lost(err: &sqlx::Error) -> bool {
    use std::io::ErrorKind;

    match err {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
            .is_some_and(|e| LOST_SESSION_ERRORS.contains(&e.number())),
        sqlx::Error::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::NotConnected
                | ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
