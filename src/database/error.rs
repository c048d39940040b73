use thiserror::Error;

/// What went wrong talking to Postgres
#[derive(Debug, Clone, Error)]
pub enum DatabaseErrorKind {
    #[error("Database connection pool exhausted. Please try again.")]
    PoolExhausted,

    #[error("Database connection timed out. Please try again.")]
    ConnectionTimeout,

    #[error("{entity} with ID '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("A record with {column} '{value}' already exists")]
    UniqueConstraintViolation { column: String, value: String },

    #[error("Cannot perform operation: referenced {column} in {table} does not exist")]
    ForeignKeyViolation { table: String, column: String },

    #[error("Database query failed: {message}")]
    QueryError { message: String },

    #[error("Transaction failed: {message}")]
    TransactionError { message: String },

    #[error("Database connection error: {message}")]
    ConnectionError { message: String },

    /// A stored row could not be mapped back into the domain model.
    #[error("Corrupt {entity} row: {message}")]
    CorruptRow { entity: String, message: String },

    #[error("Database configuration error: {message}")]
    ConfigError { message: String },

    #[error("Unknown database error: {message}")]
    Unknown { message: String },
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub context: Option<String>,
    pub is_retryable: bool,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let is_retryable = matches!(
            kind,
            DatabaseErrorKind::ConnectionTimeout
                | DatabaseErrorKind::PoolExhausted
                | DatabaseErrorKind::ConnectionError { .. }
        );

        Self {
            kind,
            context: None,
            is_retryable,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::new(DatabaseErrorKind::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        })
    }

    pub fn corrupt_row(entity: impl Into<String>, message: impl ToString) -> Self {
        Self::new(DatabaseErrorKind::CorruptRow {
            entity: entity.into(),
            message: message.to_string(),
        })
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::NotFound { .. })
    }

    /// Map SQLx error to our custom error type
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => Self::new(DatabaseErrorKind::PoolExhausted),
            sqlx::Error::PoolClosed => Self::new(DatabaseErrorKind::ConnectionError {
                message: "Connection pool is closed".to_string(),
            }),
            sqlx::Error::Configuration(msg) => Self::new(DatabaseErrorKind::ConfigError {
                message: msg.to_string(),
            }),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // Postgres unique_violation
                Some("23505") => Self::new(DatabaseErrorKind::UniqueConstraintViolation {
                    column: db_err.constraint().unwrap_or("unknown").to_string(),
                    value: "provided value".to_string(),
                }),
                // Postgres foreign_key_violation
                Some("23503") => Self::new(DatabaseErrorKind::ForeignKeyViolation {
                    table: db_err.table().unwrap_or("unknown").to_string(),
                    column: db_err.constraint().unwrap_or("unknown").to_string(),
                }),
                _ => Self::new(DatabaseErrorKind::QueryError {
                    message: db_err.message().to_string(),
                }),
            },
            sqlx::Error::Io(io_err) => Self::new(DatabaseErrorKind::ConnectionError {
                message: io_err.to_string(),
            }),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::corrupt_row("column", format!("{}: {}", index, source))
            }
            _ => Self::new(DatabaseErrorKind::Unknown {
                message: error.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} ({})", self.kind, context),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for DatabaseError {}
