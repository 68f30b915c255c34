use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AccountId, Money};

/// Globally unique, write-once transaction reference (`TXN-XXXXXXXXXXXX`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference(pub String);

impl Reference {
    pub const PREFIX: &'static str = "TXN-";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Reference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Transfer,
    Withdrawal,
    Fee,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [
        TransactionKind::Deposit,
        TransactionKind::Transfer,
        TransactionKind::Withdrawal,
        TransactionKind::Fee,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A ledger row before the ledger assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub reference: Reference,
    pub kind: TransactionKind,
    pub amount: Money,
    pub sender: AccountId,
    pub receiver: Option<AccountId>,
    pub description: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: u64,
    pub reference: Reference,
    pub kind: TransactionKind,
    pub amount: Money,
    pub sender: AccountId,
    pub receiver: Option<AccountId>,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender == account || self.receiver == Some(account)
    }
}

impl core::fmt::Display for Transaction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.receiver {
            Some(receiver) => write!(
                f,
                "{:?},ref={},from={},to={},amount={}",
                self.kind, self.reference, self.sender, receiver, self.amount
            ),
            None => write!(
                f,
                "{:?},ref={},from={},amount={}",
                self.kind, self.reference, self.sender, self.amount
            ),
        }
    }
}

/// One page of a newest-first listing. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn first(size: usize) -> Self {
        Self { number: 1, size }
    }

    pub fn offset(&self) -> usize {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }
}
