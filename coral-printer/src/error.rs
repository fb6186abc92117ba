//! Error types for the printer library

use thiserror::Error;

/// Printer error types
///
/// The dispatcher treats every variant as retryable - a rejected job and an
/// unreachable bridge look the same to the retry policy.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for the printer bridge
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Bridge answered but refused the job
    #[error("Print rejected: {0}")]
    Rejected(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
