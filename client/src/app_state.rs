use std::rc::Rc;

use crate::api::types::{OperationResponse, SessionView, StatementView, TransactionRecordView};
use crate::blockchain_client::RpcTransport;
use crate::config::{ClientConfig, Environment};
use crate::contract::AtmContractBinder;
use crate::errors::WalletResult;
use crate::gate::TransactionGate;
use crate::ledger::TransactionKind;
use crate::provider::Eip1193Wallet;
use crate::session::SessionController;

pub type AtmGate<T> = TransactionGate<Eip1193Wallet<T>, AtmContractBinder<T>>;

/// Everything a frontend needs, wired from configuration and a transport.
pub struct WalletContext<T: RpcTransport> {
    gate: AtmGate<T>,
    environment: Environment,
}

impl<T: RpcTransport> WalletContext<T> {
    /// `provider_present` is false when no wallet was detected; the transport
    /// is then never used for account or contract calls.
    pub fn initialize(
        transport: Rc<T>,
        provider_present: bool,
        config: &ClientConfig,
    ) -> WalletResult<Self> {
        let contract_address = config.contract_address()?;
        let policy = config.confirmation_policy()?;
        let require_verification = config.require_verification()?;
        log::info!(
            "Initializing wallet context ({:?}, contract {}, verification {})",
            config.environment(),
            contract_address,
            if require_verification { "required" } else { "off" }
        );

        let provider = provider_present.then(|| Eip1193Wallet::new(Rc::clone(&transport)));
        let binder = AtmContractBinder::new(transport, contract_address, policy);
        let session = SessionController::new(provider, binder);

        Ok(Self {
            gate: TransactionGate::new(session, require_verification),
            environment: config.environment(),
        })
    }

    pub fn gate(&self) -> &AtmGate<T> {
        &self.gate
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn session_view(&self) -> SessionView {
        SessionView::new(
            &self.gate.session().snapshot(),
            self.gate.verification_passed(),
            self.gate.requires_verification(),
        )
    }

    pub async fn connect(&self) -> WalletResult<SessionView> {
        self.gate.session().connect().await?;
        self.gate.session().refresh_balance().await;
        Ok(self.session_view())
    }

    pub async fn resume(&self) -> SessionView {
        if self.gate.session().resume().await.is_some() {
            self.gate.session().refresh_balance().await;
        }
        self.session_view()
    }

    pub async fn refresh_balance(&self) -> SessionView {
        self.gate.session().refresh_balance().await;
        self.session_view()
    }

    pub async fn request_operation(
        &self,
        kind: TransactionKind,
        amount: &str,
    ) -> WalletResult<OperationResponse> {
        let record = self.gate.request_operation(kind, amount).await?;
        Ok(OperationResponse {
            record: TransactionRecordView::from(&record),
            session: self.session_view(),
        })
    }

    pub fn ledger_view(&self) -> Vec<TransactionRecordView> {
        self.gate
            .ledger()
            .iter()
            .map(TransactionRecordView::from)
            .collect()
    }

    pub fn statement_view(&self) -> WalletResult<StatementView> {
        self.gate.generate_statement().map(StatementView::from)
    }
}
