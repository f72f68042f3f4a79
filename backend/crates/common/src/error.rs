use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// A write collided on a unique key that should have been resolved by upsert.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type TallyResult<T> = Result<T, TallyError>;
