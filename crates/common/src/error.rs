use thiserror::Error;

/// Common error types shared by the QRL client crates
#[derive(Error, Debug)]
pub enum QrlError {
    /// Validation errors on locally constructed values
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid node target: {0}")]
    InvalidTarget(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, QrlError>;

impl From<config::ConfigError> for QrlError {
    fn from(err: config::ConfigError) -> Self {
        QrlError::Config(format!("Configuration error: {}", err))
    }
}
