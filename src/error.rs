use thiserror::Error;

use crate::transaction::TransactionId;

/// The error kinds surfaced by the storage and execution core.
///
/// Nothing here is retried internally; retry (abort, sleep, reissue with a
/// fresh transaction id) is a policy of the caller.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction {0:?} aborted")]
    TransactionAborted(TransactionId),

    #[error("invalid iterator state: {0}")]
    InvalidState(String),
}

pub type DbResult<T> = Result<T, DbError>;
