use crate::blockchain::Amount;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary operation the ATM contract supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One confirmed operation, as remembered by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub action: TransactionKind,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(action: TransactionKind, amount: Amount) -> Self {
        Self::at(action, amount, Utc::now())
    }

    pub fn at(action: TransactionKind, amount: Amount, timestamp: DateTime<Utc>) -> Self {
        Self {
            action,
            amount,
            timestamp,
        }
    }
}

/// Session-scoped, append-only history of confirmed operations.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<TransactionRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TransactionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Human-readable account report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub balance: u128,
    pub entries: Vec<TransactionRecord>,
    pub generated_at: DateTime<Utc>,
}

impl Statement {
    pub fn new(balance: u128, entries: Vec<TransactionRecord>) -> Self {
        Self {
            balance,
            entries,
            generated_at: Utc::now(),
        }
    }

    /// Entry lines in the form `<index>. <action> - <amount> (<timestamp>)`, 1-based.
    pub fn entry_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, record)| {
                format!(
                    "{}. {} - {} ({})",
                    index + 1,
                    record.action,
                    record.amount,
                    format_timestamp(&record.timestamp)
                )
            })
            .collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Account Statement")?;
        writeln!(f, "Balance: {}", self.balance)?;
        writeln!(f, "Transactions:")?;
        if self.entries.is_empty() {
            writeln!(f, "No transactions recorded")?;
        }
        for line in self.entry_lines() {
            writeln!(f, "{}", line)?;
        }
        write!(f, "Generated: {}", format_timestamp(&self.generated_at))
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
