use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::blockchain::{Address, Amount};
use crate::errors::{WalletError, WalletResult};
use crate::ledger::TransactionKind;
use crate::provider::{
    Confirmation, ContractBinder, LedgerContract, PendingTransaction, WalletProvider,
};

/// Snapshot of the wallet connection.
///
/// `contract_bound` implies `account` is set, and `balance` implies
/// `contract_bound`. Values are never edited in place; [`transition`]
/// produces the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    provider_present: bool,
    account: Option<Address>,
    contract_bound: bool,
    balance: Option<u128>,
}

impl WalletSession {
    pub fn new(provider_present: bool) -> Self {
        Self {
            provider_present,
            ..Self::default()
        }
    }

    pub fn provider_present(&self) -> bool {
        self.provider_present
    }

    pub fn account(&self) -> Option<&Address> {
        self.account.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.contract_bound
    }

    pub fn balance(&self) -> Option<u128> {
        self.balance
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    AccountAuthorized(Address),
    ContractBound,
    BalanceFetched(u128),
    Reset,
}

/// Pure session transition. Events that would break an invariant are ignored.
pub fn transition(session: &WalletSession, event: SessionEvent) -> WalletSession {
    match event {
        SessionEvent::AccountAuthorized(account) => {
            if session.account.as_ref() == Some(&account) {
                session.clone()
            } else {
                WalletSession {
                    provider_present: session.provider_present,
                    account: Some(account),
                    contract_bound: false,
                    balance: None,
                }
            }
        }
        SessionEvent::ContractBound if session.account.is_some() => WalletSession {
            contract_bound: true,
            ..session.clone()
        },
        SessionEvent::BalanceFetched(balance) if session.contract_bound => WalletSession {
            balance: Some(balance),
            ..session.clone()
        },
        SessionEvent::Reset => WalletSession::new(session.provider_present),
        SessionEvent::ContractBound | SessionEvent::BalanceFetched(_) => session.clone(),
    }
}

/// Owns the wallet connection, the contract binding and the last known balance.
///
/// Every call is cooperative: state is read and replaced between suspension
/// points, never across one. Two operations in flight at once both refresh
/// the balance when they confirm, and whichever refresh resolves last wins.
pub struct SessionController<P, B: ContractBinder> {
    provider: Option<P>,
    binder: B,
    state: RwLock<WalletSession>,
    contract: RwLock<Option<Rc<B::Contract>>>,
}

impl<P: WalletProvider, B: ContractBinder> SessionController<P, B> {
    pub fn new(provider: Option<P>, binder: B) -> Self {
        let state = WalletSession::new(provider.is_some());
        Self {
            provider,
            binder,
            state: RwLock::new(state),
            contract: RwLock::new(None),
        }
    }

    pub fn snapshot(&self) -> WalletSession {
        self.state.read().clone()
    }

    /// Request account access and bind the contract for the first account.
    pub async fn connect(&self) -> WalletResult<Address> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            log::warn!("Connect attempted without a wallet provider");
            WalletError::NoProvider
        })?;

        let accounts = provider.request_accounts().await.map_err(|err| {
            log::warn!("Account request failed: {}", err);
            WalletError::ConnectionDenied(err.to_string())
        })?;

        let account = accounts.into_iter().next().ok_or_else(|| {
            log::info!("No account found");
            WalletError::ConnectionDenied("no account was authorized".to_string())
        })?;

        self.bind(account)
    }

    /// Pick up an account the wallet already authorized, without prompting.
    pub async fn resume(&self) -> Option<Address> {
        let provider = self.provider.as_ref()?;

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                log::warn!("Failed to read authorized accounts: {}", err);
                return None;
            }
        };

        let Some(account) = accounts.into_iter().next() else {
            log::info!("No account found");
            return None;
        };

        match self.bind(account) {
            Ok(account) => Some(account),
            Err(err) => {
                log::warn!("Failed to bind contract on resume: {}", err);
                None
            }
        }
    }

    /// Fetch the balance; a no-op until bound, and failures keep the old value.
    pub async fn refresh_balance(&self) -> Option<u128> {
        let Some(contract) = self.bound_contract() else {
            return None;
        };

        match contract.get_balance().await {
            Ok(balance) => {
                log::debug!("Balance refreshed: {}", balance);
                self.apply(SessionEvent::BalanceFetched(balance)).balance()
            }
            Err(err) => {
                log::warn!("Failed to refresh balance: {}", err);
                self.snapshot().balance()
            }
        }
    }

    /// Submit, await confirmation, then refresh the balance.
    pub async fn issue_operation(
        &self,
        kind: TransactionKind,
        amount: Amount,
    ) -> WalletResult<Confirmation> {
        let contract = self.bound_contract().ok_or(WalletError::NotBound)?;

        let pending = match kind {
            TransactionKind::Deposit => contract.deposit(amount).await,
            TransactionKind::Withdrawal => contract.withdraw(amount).await,
        }
        .map_err(|err| remote_failure(kind, "submission", err))?;
        log::info!("{} of {} submitted as {}", kind, amount, pending.hash());

        let confirmation = pending
            .wait()
            .await
            .map_err(|err| remote_failure(kind, "confirmation", err))?;
        log::info!(
            "{} of {} confirmed in {}",
            kind,
            amount,
            confirmation.transaction_hash
        );

        self.refresh_balance().await;
        Ok(confirmation)
    }

    /// Forget the connection, as a page reload would.
    pub fn reset(&self) {
        *self.contract.write() = None;
        self.apply(SessionEvent::Reset);
    }

    fn bind(&self, account: Address) -> WalletResult<Address> {
        log::info!("Account connected: {}", account);
        let next = self.apply(SessionEvent::AccountAuthorized(account.clone()));
        if next.is_bound() {
            return Ok(account);
        }

        *self.contract.write() = None;
        let contract = self.binder.bind(&account)?;
        *self.contract.write() = Some(Rc::new(contract));
        self.apply(SessionEvent::ContractBound);
        Ok(account)
    }

    fn bound_contract(&self) -> Option<Rc<B::Contract>> {
        if !self.state.read().is_bound() {
            return None;
        }
        self.contract.read().clone()
    }

    fn apply(&self, event: SessionEvent) -> WalletSession {
        let mut state = self.state.write();
        let next = transition(&state, event);
        *state = next.clone();
        next
    }
}

fn remote_failure(kind: TransactionKind, stage: &str, err: WalletError) -> WalletError {
    log::warn!("{} {} failed: {}", kind, stage, err);
    if err.is_user_rejection() {
        return WalletError::RemoteOperationFailed("rejected in wallet".to_string());
    }
    match err {
        WalletError::RemoteOperationFailed(message) => WalletError::RemoteOperationFailed(message),
        other => WalletError::RemoteOperationFailed(other.to_string()),
    }
}
