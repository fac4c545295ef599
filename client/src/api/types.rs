//! Frontend-facing views. Balances and amounts travel as decimal strings so
//! JavaScript callers never see a lossy number.

use crate::ledger::{Statement, TransactionRecord};
use crate::session::WalletSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub provider_present: bool,
    #[serde(default)]
    pub account: Option<String>,
    pub contract_bound: bool,
    #[serde(default)]
    pub balance: Option<String>,
    pub verification_passed: bool,
    pub requires_verification: bool,
}

impl SessionView {
    pub fn new(
        session: &WalletSession,
        verification_passed: bool,
        requires_verification: bool,
    ) -> Self {
        Self {
            provider_present: session.provider_present(),
            account: session.account().map(|a| a.as_string().to_string()),
            contract_bound: session.is_bound(),
            balance: session.balance().map(|b| b.to_string()),
            verification_passed,
            requires_verification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecordView {
    pub action: String,
    pub amount: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&TransactionRecord> for TransactionRecordView {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            action: record.action.to_string(),
            amount: record.amount.to_string(),
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementView {
    pub balance: String,
    pub entries: Vec<TransactionRecordView>,
    pub lines: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub text: String,
}

impl From<Statement> for StatementView {
    fn from(statement: Statement) -> Self {
        Self {
            balance: statement.balance.to_string(),
            entries: statement
                .entries
                .iter()
                .map(TransactionRecordView::from)
                .collect(),
            lines: statement.entry_lines(),
            generated_at: statement.generated_at,
            text: statement.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeView {
    pub challenge: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub record: TransactionRecordView,
    pub session: SessionView,
}
