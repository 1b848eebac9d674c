use service_core::error::AppError;
use std::fmt;
use thiserror::Error;

/// Where a storage call failed. Carried into diagnostic log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Query,
    Cursor,
    TransactionStep,
    TransactionCommit,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Query => "query",
            Phase::Cursor => "cursor",
            Phase::TransactionStep => "transaction_step",
            Phase::TransactionCommit => "transaction_commit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a storage collaborator.
#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Database query failed: {0}")]
    Query(anyhow::Error),

    #[error("Cursor iteration failed: {0}")]
    Cursor(anyhow::Error),

    #[error("Transaction step failed: {0}")]
    TransactionStep(anyhow::Error),

    #[error("Transaction commit failed: {0}")]
    TransactionCommit(anyhow::Error),
}

impl DataAccessError {
    pub fn phase(&self) -> Phase {
        match self {
            DataAccessError::Query(_) => Phase::Query,
            DataAccessError::Cursor(_) => Phase::Cursor,
            DataAccessError::TransactionStep(_) => Phase::TransactionStep,
            DataAccessError::TransactionCommit(_) => Phase::TransactionCommit,
        }
    }
}

impl From<DataAccessError> for AppError {
    fn from(err: DataAccessError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// Role update failures that are not business rejections. Both variants are
/// reported to the caller as a GraphQL error entry, never as a typed payload.
#[derive(Error, Debug)]
pub enum RoleUpdateFailure {
    /// The verified requester no longer resolves to a user.
    #[error("{message}")]
    Unauthenticated { message: String },

    /// A storage call failed. `message` is the localized, client-safe text.
    #[error("{message}")]
    DataAccess {
        message: String,
        #[source]
        source: DataAccessError,
    },
}

impl RoleUpdateFailure {
    /// Client-facing message. Never contains driver details.
    pub fn message(&self) -> &str {
        match self {
            RoleUpdateFailure::Unauthenticated { message } => message,
            RoleUpdateFailure::DataAccess { message, .. } => message,
        }
    }
}
