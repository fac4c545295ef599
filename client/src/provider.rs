//! Collaborator seams: the wallet that authorizes accounts and the ledger
//! contract that holds the balance.

use crate::blockchain::{Address, Amount};
use crate::blockchain_client::RpcTransport;
use crate::errors::WalletResult;
use crate::validation::InputValidator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Result of a transaction that the remote ledger accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
}

/// Account access exposed by an injected wallet.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Ask for account access; may prompt the user.
    async fn request_accounts(&self) -> WalletResult<Vec<Address>>;

    /// Accounts already authorized for this client; never prompts.
    async fn accounts(&self) -> WalletResult<Vec<Address>>;
}

/// A submitted transaction whose outcome is not yet known.
#[async_trait(?Send)]
pub trait PendingTransaction {
    fn hash(&self) -> &str;

    /// Suspend until the ledger confirms or rejects the transaction.
    async fn wait(&self) -> WalletResult<Confirmation>;
}

/// Handle on the ledger contract, bound to one account.
#[async_trait(?Send)]
pub trait LedgerContract {
    type Pending: PendingTransaction;

    async fn get_balance(&self) -> WalletResult<u128>;

    async fn deposit(&self, amount: Amount) -> WalletResult<Self::Pending>;

    async fn withdraw(&self, amount: Amount) -> WalletResult<Self::Pending>;
}

/// Derives a contract handle for a freshly authorized account.
pub trait ContractBinder {
    type Contract: LedgerContract;

    fn bind(&self, account: &Address) -> WalletResult<Self::Contract>;
}

/// Wallet provider speaking the EIP-1193 account methods over a transport.
pub struct Eip1193Wallet<T> {
    transport: Rc<T>,
    validator: InputValidator,
}

impl<T: RpcTransport> Eip1193Wallet<T> {
    pub fn new(transport: Rc<T>) -> Self {
        Self {
            transport,
            validator: InputValidator::new(),
        }
    }

    async fn fetch_accounts(&self, method: &str) -> WalletResult<Vec<Address>> {
        let response = self
            .transport
            .request(method, serde_json::json!([]))
            .await?;
        let raw: Vec<String> = serde_json::from_value(response)?;

        raw.iter()
            .map(|account| self.validator.validate_address(account))
            .collect()
    }
}

#[async_trait(?Send)]
impl<T: RpcTransport> WalletProvider for Eip1193Wallet<T> {
    async fn request_accounts(&self) -> WalletResult<Vec<Address>> {
        self.fetch_accounts("eth_requestAccounts").await
    }

    async fn accounts(&self) -> WalletResult<Vec<Address>> {
        self.fetch_accounts("eth_accounts").await
    }
}
