// lib.rs - Core library structure for the ATM wallet client

pub mod api;
pub mod app_state;
pub mod blockchain;
pub mod blockchain_client;
pub mod config;
pub mod contract;
pub mod errors;
pub mod gate;
pub mod ledger;
pub mod provider;
pub mod session;
pub mod validation;
pub mod verification;

// Re-export common types
pub use api::types::*;
pub use app_state::{AtmGate, WalletContext};
pub use blockchain::{Address, Amount};
#[cfg(feature = "native")]
pub use blockchain_client::HttpTransport;
pub use blockchain_client::RpcTransport;
pub use config::{ClientConfig, ConfirmationPolicy, Environment};
pub use contract::{AtmContract, AtmContractBinder};
pub use errors::{WalletError, WalletResult};
pub use gate::TransactionGate;
pub use ledger::{Ledger, Statement, TransactionKind, TransactionRecord};
pub use provider::{
    Confirmation, ContractBinder, Eip1193Wallet, LedgerContract, PendingTransaction,
    WalletProvider,
};
pub use session::{transition, SessionController, SessionEvent, WalletSession};
pub use validation::InputValidator;
pub use verification::VerificationChallenge;
