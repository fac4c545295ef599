use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use atm_wallet_lib::config::KEY_CONTRACT_ADDRESS;
use atm_wallet_lib::{
    ClientConfig, Environment, RpcTransport, TransactionKind, WalletContext, WalletError,
    WalletResult,
};
use serde_json::{json, Value};

const ACCOUNT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const CONTRACT: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";

/// In-memory node hosting a single ATM contract.
#[derive(Default)]
struct LedgerNode {
    authorized: bool,
    balance: u128,
    receipts: HashMap<String, bool>,
    methods: Vec<String>,
}

impl LedgerNode {
    fn execute(&mut self, tx: &Value) -> WalletResult<String> {
        assert_eq!(tx["to"], CONTRACT);
        assert_eq!(tx["from"], ACCOUNT);

        let data = tx["data"].as_str().unwrap_or_default();
        let (selector, word) = data[2..].split_at(8);
        let amount = u128::from_str_radix(&word[32..], 16).unwrap();

        let success = match selector {
            "b6b55f25" => {
                self.balance += amount;
                true
            }
            "2e1a7d4d" if amount <= self.balance => {
                self.balance -= amount;
                true
            }
            "2e1a7d4d" => false,
            other => panic!("unknown selector {}", other),
        };

        let hash = format!("0x{:064x}", self.receipts.len() + 1);
        self.receipts.insert(hash.clone(), success);
        Ok(hash)
    }
}

#[derive(Default)]
struct InMemoryTransport {
    node: RefCell<LedgerNode>,
}

#[async_trait(?Send)]
impl RpcTransport for InMemoryTransport {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        let mut node = self.node.borrow_mut();
        node.methods.push(method.to_string());

        match method {
            "eth_requestAccounts" => {
                node.authorized = true;
                Ok(json!([ACCOUNT]))
            }
            "eth_accounts" if node.authorized => Ok(json!([ACCOUNT])),
            "eth_accounts" => Ok(json!([])),
            "eth_call" => {
                assert_eq!(params[0]["data"], "0x12065fe0");
                Ok(json!(format!("0x{:064x}", node.balance)))
            }
            "eth_sendTransaction" => node.execute(&params[0]).map(Value::from),
            "eth_getTransactionReceipt" => {
                let hash = params[0].as_str().unwrap_or_default();
                Ok(match node.receipts.get(hash) {
                    Some(true) => json!({ "status": "0x1", "blockNumber": "0x1" }),
                    Some(false) => json!({ "status": "0x0", "blockNumber": "0x1" }),
                    None => Value::Null,
                })
            }
            other => Err(WalletError::RpcError {
                code: -32601,
                message: format!("method {} not found", other),
            }),
        }
    }

    async fn pause(&self, _duration: Duration) {}
}

fn config() -> ClientConfig {
    let mut config = ClientConfig::new(Environment::Test);
    config.set(KEY_CONTRACT_ADDRESS, CONTRACT);
    config
}

#[tokio::test]
async fn connect_verify_transact_and_report() -> WalletResult<()> {
    let transport = Rc::new(InMemoryTransport::default());
    let context = WalletContext::initialize(Rc::clone(&transport), true, &config())?;

    // Nothing authorized yet: resume stays disconnected and never prompts.
    let view = context.resume().await;
    assert!(view.account.is_none());
    assert_eq!(
        context.statement_view(),
        Err(WalletError::BalanceUnavailable)
    );

    let view = context.connect().await?;
    assert_eq!(view.account.as_deref(), Some(ACCOUNT));
    assert_eq!(view.balance.as_deref(), Some("0"));

    // Gate holds until the captcha is reproduced exactly.
    assert_eq!(
        context
            .request_operation(TransactionKind::Deposit, "10")
            .await,
        Err(WalletError::VerificationRequired)
    );
    let challenge = context.gate().challenge_text();
    assert_eq!(
        context.gate().submit_verification(&challenge.to_lowercase()),
        Err(WalletError::VerificationFailed)
    );
    context.gate().submit_verification(&challenge)?;

    let response = context
        .request_operation(TransactionKind::Deposit, "10")
        .await?;
    assert_eq!(response.record.action, "Deposit");
    assert_eq!(response.session.balance.as_deref(), Some("10"));

    // Overdrawing reverts on chain: no record, balance untouched, still verified.
    let overdraw = context
        .request_operation(TransactionKind::Withdrawal, "11")
        .await;
    assert!(matches!(overdraw, Err(WalletError::RemoteOperationFailed(_))));
    assert_eq!(context.session_view().balance.as_deref(), Some("10"));
    assert!(context.gate().verification_passed());

    context
        .request_operation(TransactionKind::Withdrawal, "4")
        .await?;

    let ledger = context.ledger_view();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[1].action, "Withdrawal");
    assert_eq!(ledger[1].amount, "4");

    let statement = context.statement_view()?;
    assert_eq!(statement.balance, "6");
    assert!(statement.lines[0].starts_with("1. Deposit - 10 ("));
    assert!(statement.lines[1].starts_with("2. Withdrawal - 4 ("));
    assert!(statement.text.starts_with("Account Statement"));

    let methods = transport.node.borrow().methods.clone();
    assert_eq!(methods[0], "eth_accounts");
    assert_eq!(methods[1], "eth_requestAccounts");
    assert_eq!(
        methods.iter().filter(|m| *m == "eth_sendTransaction").count(),
        3
    );
    Ok(())
}

#[tokio::test]
async fn resume_reconnects_an_authorized_account() -> WalletResult<()> {
    let transport = Rc::new(InMemoryTransport::default());
    {
        let mut node = transport.node.borrow_mut();
        node.authorized = true;
        node.balance = 42;
    }

    let context = WalletContext::initialize(Rc::clone(&transport), true, &config())?;
    let view = context.resume().await;

    assert!(view.contract_bound);
    assert_eq!(view.balance.as_deref(), Some("42"));
    assert!(!transport
        .node
        .borrow()
        .methods
        .iter()
        .any(|m| m == "eth_requestAccounts"));
    Ok(())
}
