use std::result::Result as StdResult;

use thiserror::Error;

/// Error type shared by the ledger, simulation and persistence layers.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Duplicate account number: {0}")]
    DuplicateAccountNumber(String),
    #[error("Duplicate account path: {0}")]
    DuplicateAccountPath(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = StdResult<T, ModelError>;

/// User-facing CLI error wrapper.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ModelError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Core(ModelError::Io(err))
    }
}
