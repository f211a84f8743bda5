//! Error types for dispatch.

use thiserror::Error;

/// Errors raised while validating, assembling or executing an operation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No operation name was supplied.
    #[error("API should be provided")]
    MissingOperation,

    /// The operation name does not match any registry entry.
    #[error("API '{0}' was not found")]
    UnknownOperation(String),

    /// One or more required arguments were absent or empty.
    #[error("The argument(s) {0:?} are required")]
    MissingRequiredArguments(Vec<String>),

    /// The referenced workflow is not in the catalog.
    #[error("The DAG ID '{0}' does not exist")]
    UnknownWorkflow(String),

    /// The workflow catalog could not be queried.
    #[error("Workflow catalog lookup failed: {0}")]
    Catalog(String),

    /// The registry violates one of its structural invariants.
    #[error("Invalid registry: {0}")]
    Registry(String),

    /// The child process could not be started.
    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Whether this error is caused by the request rather than the server.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DispatchError::MissingOperation
                | DispatchError::UnknownOperation(_)
                | DispatchError::MissingRequiredArguments(_)
                | DispatchError::UnknownWorkflow(_)
        )
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
