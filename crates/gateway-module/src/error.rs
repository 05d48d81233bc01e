//! Gateway Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway-related errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Module missing from the host or not switched on
    #[error("Module Not Activated")]
    ModuleNotActivated,

    /// Verification hash did not match the recomputed digest
    #[error("Invalid hash")]
    InvalidHash,

    /// Invoice id unknown to the host
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(u64),

    /// Invoice exists but cannot take a payment
    #[error("Invoice {0} is not payable")]
    InvoiceNotPayable(u64),

    /// Transaction id already recorded against a payment
    #[error("Duplicate transaction id: {0}")]
    DuplicateTransaction(String),

    /// Pay method unknown or owned by another client
    #[error("Pay method not found: {0}")]
    PayMethodNotFound(u64),

    /// Any other failure raised by the host platform
    #[error("Host error: {0}")]
    Host(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed inbound parameters
    #[error("Parse error: {0}")]
    Parse(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Query string encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

impl GatewayError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Host(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            GatewayError::ModuleNotActivated => "Module Not Activated",
            GatewayError::InvalidHash => "Invalid hash.",
            GatewayError::InvoiceNotFound(_) | GatewayError::InvoiceNotPayable(_) => {
                "Invoice not available for payment."
            }
            GatewayError::DuplicateTransaction(_) => "This transaction has already been recorded.",
            GatewayError::Parse(_) => "The request could not be understood.",
            _ => "An error occurred processing your request.",
        }
    }
}
