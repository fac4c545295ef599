use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC error code returned by EIP-1193 providers when the user rejects a request.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletError {
    // Session errors
    NoProvider,
    ConnectionDenied(String),
    NotBound,

    // Gate errors
    VerificationFailed,
    VerificationRequired,
    InvalidAmount(String),
    BalanceUnavailable,

    // Remote errors
    RemoteOperationFailed(String),
    NetworkError(String),
    RpcError { code: i64, message: String },
    InvalidResponse(String),

    // Validation errors
    ValidationError(String),
    InvalidAddress(String),
}

impl WalletError {
    /// Whether the provider reported that the user declined the request.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletError::RpcError { code, .. } if *code == USER_REJECTED_CODE)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::NoProvider => {
                write!(f, "A browser wallet such as MetaMask is required to connect")
            }
            WalletError::ConnectionDenied(msg) => write!(f, "Connection denied: {}", msg),
            WalletError::NotBound => write!(f, "Wallet is not connected to the ATM contract"),

            WalletError::VerificationFailed => write!(f, "Incorrect captcha. Please try again."),
            WalletError::VerificationRequired => {
                write!(f, "Please submit the captcha before performing a transaction.")
            }
            WalletError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            WalletError::BalanceUnavailable => write!(f, "Balance unavailable"),

            WalletError::RemoteOperationFailed(msg) => write!(f, "Transaction failed: {}", msg),
            WalletError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            WalletError::RpcError { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            WalletError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            WalletError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::InvalidResponse(format!("JSON error: {}", error))
    }
}
