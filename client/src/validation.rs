use crate::blockchain::{Address, Amount};
use crate::errors::{WalletError, WalletResult};
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[xX][a-fA-F0-9]{40}$").expect("address regex compiles"));

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,39}$").expect("amount regex compiles"));

/// Input validation utilities for the wallet
#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        InputValidator
    }

    /// Validate an account or contract address and parse it
    pub fn validate_address(&self, address: &str) -> WalletResult<Address> {
        if address.is_empty() {
            return Err(WalletError::ValidationError(
                "Address cannot be empty".to_string(),
            ));
        }

        if address.len() > 100 {
            return Err(WalletError::ValidationError("Address too long".to_string()));
        }

        if !ADDRESS_PATTERN.is_match(address) {
            return Err(WalletError::InvalidAddress(
                "Address format is invalid".to_string(),
            ));
        }

        Address::from_string(address)
    }

    /// Validate an amount string and parse it
    ///
    /// Only emptiness and the integer shape are checked here; whether the
    /// contract accepts the value (e.g. a withdrawal above the balance) is
    /// decided remotely.
    pub fn validate_amount(&self, amount: &str) -> WalletResult<Amount> {
        if amount.is_empty() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        if !AMOUNT_PATTERN.is_match(amount) {
            return Err(WalletError::InvalidAmount(
                "Amount format is invalid".to_string(),
            ));
        }

        Amount::from_string(amount)
    }
}
