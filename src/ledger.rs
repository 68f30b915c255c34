use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    AccountId, Clock, Error, Ledger, Money, NewTransaction, Page, Reference, Transaction,
    TransactionKind, TransactionStatus,
};

const REFERENCE_ATTEMPTS: usize = 8;
const REFERENCE_HEX_LEN: usize = 12;

#[derive(Debug, Default)]
struct Rows {
    entries: Vec<Transaction>,
    references: HashSet<Reference>,
}

/// In-memory append-only ledger. Rows are never updated or removed.
pub struct InMemoryLedger {
    clock: Arc<dyn Clock>,
    rows: RwLock<Rows>,
}

impl core::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryLedger").finish_non_exhaustive()
    }
}

impl InMemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rows: RwLock::new(Rows::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Rows> {
        self.rows.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rows> {
        self.rows.write().unwrap_or_else(|e| e.into_inner())
    }

    fn candidate_reference() -> Reference {
        let hex = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Reference(format!("{}{}", Reference::PREFIX, &hex[..REFERENCE_HEX_LEN]))
    }

    fn sum_completed(
        &self,
        what: &str,
        keep: impl Fn(TransactionKind) -> bool,
    ) -> Result<Money, Error> {
        self.read()
            .entries
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed && keep(t.kind))
            .try_fold(Money::ZERO, |acc, t| acc.checked_add(t.amount))
            .ok_or_else(|| {
                error!(total = what, "ledger total overflows");
                Error::Integrity(format!("{} overflows", what))
            })
    }
}

impl Ledger for InMemoryLedger {
    fn next_reference(&self) -> Reference {
        let rows = self.read();
        let mut candidate = Self::candidate_reference();
        for _ in 1..REFERENCE_ATTEMPTS {
            if !rows.references.contains(&candidate) {
                break;
            }
            warn!(reference = %candidate, "generated reference already exists, retrying");
            candidate = Self::candidate_reference();
        }
        candidate
    }

    fn record(&self, entries: Vec<NewTransaction>) -> Result<Vec<Transaction>, Error> {
        let mut rows = self.write();

        {
            let mut batch = HashSet::with_capacity(entries.len());
            for entry in &entries {
                if !entry.amount.is_positive() {
                    return Err(Error::InvalidAmount(entry.amount));
                }
                if rows.references.contains(&entry.reference) || !batch.insert(&entry.reference)
                {
                    error!(reference = %entry.reference, "transaction reference collision");
                    return Err(Error::ReferenceCollision(entry.reference.clone()));
                }
            }
        }

        let created_at = self.clock.now();
        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            let transaction = Transaction {
                id: rows.entries.len() as u64 + 1,
                reference: entry.reference,
                kind: entry.kind,
                amount: entry.amount,
                sender: entry.sender,
                receiver: entry.receiver,
                description: entry.description,
                status: entry.status,
                created_at,
            };
            info!(
                reference = %transaction.reference,
                kind = ?transaction.kind,
                amount = %transaction.amount,
                sender = %transaction.sender,
                receiver = ?transaction.receiver.map(|r| r.0),
                "transaction recorded"
            );
            rows.references.insert(transaction.reference.clone());
            rows.entries.push(transaction.clone());
            written.push(transaction);
        }
        Ok(written)
    }

    fn find(&self, reference: &Reference) -> Option<Transaction> {
        self.read()
            .entries
            .iter()
            .find(|t| &t.reference == reference)
            .cloned()
    }

    fn history(&self, account: AccountId, page: Page) -> Vec<Transaction> {
        self.read()
            .entries
            .iter()
            .rev()
            .filter(|t| t.involves(account))
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect()
    }

    fn recent(&self, limit: usize) -> Vec<Transaction> {
        self.read()
            .entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    fn total_fees(&self) -> Result<Money, Error> {
        self.sum_completed("total fees", |kind| kind == TransactionKind::Fee)
    }

    fn total_volume_completed(&self) -> Result<Money, Error> {
        self.sum_completed("total volume", |kind| kind != TransactionKind::Fee)
    }

    fn completed_count(&self) -> usize {
        self.read()
            .entries
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .count()
    }

    fn count_by_kind(&self, kind: TransactionKind) -> usize {
        self.read()
            .entries
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed && t.kind == kind)
            .count()
    }

    fn len(&self) -> usize {
        self.read().entries.len()
    }
}
