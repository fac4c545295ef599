/// Core chain types for the ATM wallet
///
/// Accounts and the ledger contract are addressed Ethereum-style, and
/// amounts are the integer units the contract's `uint256` arguments carry.
use crate::errors::{WalletError, WalletResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account or contract address
///
/// Addresses follow the format: 0x{40_hex_chars}. The stored string form is
/// lower-cased so that checksummed and plain spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    hex_address: String,
}

impl Address {
    /// Create a new address from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        let raw_bytes: [u8; 20] = bytes.try_into().map_err(|_| {
            WalletError::InvalidAddress(format!(
                "Invalid address length: expected 20 bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Address {
            hex_address: format!("0x{}", hex::encode(raw_bytes)),
        })
    }

    /// Parse a hex address (0x format)
    pub fn from_string(hex_address: &str) -> WalletResult<Self> {
        let hex_part = hex_address
            .strip_prefix("0x")
            .or_else(|| hex_address.strip_prefix("0X"))
            .ok_or_else(|| {
                WalletError::InvalidAddress("Address must start with '0x'".to_string())
            })?;

        if hex_part.len() != 40 {
            return Err(WalletError::InvalidAddress(format!(
                "Invalid hex address length: expected 42 characters, got {}",
                hex_address.len()
            )));
        }

        let bytes = hex::decode(hex_part)
            .map_err(|_| WalletError::InvalidAddress("Invalid hex in address".to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Get the string representation (lower-case hex)
    pub fn as_string(&self) -> &str {
        &self.hex_address
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex_address)
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl TryFrom<String> for Address {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::from_string(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.hex_address
    }
}

/// An amount handed to the ledger contract
///
/// The contract takes whole integer units, so no decimal scaling is applied:
/// `"1"` deposits one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount {
    units: u128,
}

impl Amount {
    pub fn from_units(units: u128) -> Self {
        Amount { units }
    }

    /// Parse a caller-supplied amount string
    pub fn from_string(amount_str: &str) -> WalletResult<Self> {
        if amount_str.is_empty() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        if !amount_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WalletError::InvalidAmount(
                "Invalid number format".to_string(),
            ));
        }

        let units: u128 = amount_str
            .parse()
            .map_err(|_| WalletError::InvalidAmount("Amount too large".to_string()))?;

        Ok(Amount { units })
    }

    pub fn units(&self) -> u128 {
        self.units
    }

}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.units)
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::from_string(s)
    }
}
