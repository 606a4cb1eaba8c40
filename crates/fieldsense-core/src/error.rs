use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Re-classify a storage failure at the operation boundary: unique
    /// constraint violations become conflicts with a user-facing message,
    /// everything else stays an opaque database error.
    pub fn from_query(err: sqlx::Error, conflict_message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(conflict_message.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
