use sqlx::{PgConnection, PgPool, Postgres, Transaction as SqlxTransaction};
use tracing::{debug, error as log_error};

use crate::database::error::{DatabaseError, DatabaseErrorKind};

/// Database transaction wrapper for atomic operations
///
/// Dropping it without `commit` rolls the transaction back.
pub struct DatabaseTransaction {
    transaction: Option<SqlxTransaction<'static, Postgres>>,
}

impl DatabaseTransaction {
    /// Begin a new transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, DatabaseError> {
        debug!("Beginning database transaction");

        let transaction = pool.begin().await.map_err(|e| {
            log_error!("Failed to begin transaction: {}", e);
            DatabaseError::from_sqlx(e)
        })?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), DatabaseError> {
        let tx = self.take()?;
        debug!("Committing transaction");
        tx.commit().await.map_err(|e| {
            log_error!("Failed to commit transaction: {}", e);
            DatabaseError::from_sqlx(e)
        })
    }

    /// Connection to run statements inside the transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection, DatabaseError> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(Self::completed)
    }

    fn take(&mut self) -> Result<SqlxTransaction<'static, Postgres>, DatabaseError> {
        self.transaction.take().ok_or_else(Self::completed)
    }

    fn completed() -> DatabaseError {
        DatabaseError::new(DatabaseErrorKind::TransactionError {
            message: "Transaction already completed".to_string(),
        })
    }
}
