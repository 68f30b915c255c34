use chrono::{DateTime, Utc};
use futures::Stream;

use crate::domain::{
    AccountId, Error, Money, OneTimeCode, Operation, Page, Principal, Reference, Transaction,
    TransactionKind, NewTransaction,
};

pub trait CommandStream {
    type OpStream: Stream<Item = Result<Operation, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::OpStream;
}

pub trait DeadLetterQueue {
    fn report(&self, operation: Option<&Operation>, error: &Error);
}

/// Append-only store of transaction records.
pub trait Ledger: Send + Sync {
    /// A reference not present in the ledger at the time of the call.
    fn next_reference(&self) -> Reference;

    /// Appends every entry or none of them.
    fn record(&self, entries: Vec<NewTransaction>) -> Result<Vec<Transaction>, Error>;

    fn find(&self, reference: &Reference) -> Option<Transaction>;

    /// Sent or received by `account`, newest first.
    fn history(&self, account: AccountId, page: Page) -> Vec<Transaction>;

    /// Newest first across all accounts.
    fn recent(&self, limit: usize) -> Vec<Transaction>;

    /// Fails if the sum does not fit in [`Money`].
    fn total_fees(&self) -> Result<Money, Error>;

    fn total_volume_completed(&self) -> Result<Money, Error>;

    fn completed_count(&self) -> usize;

    fn count_by_kind(&self, kind: TransactionKind) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Out-of-band transport for one-time codes (email, SMS).
pub trait CodeDelivery: Send + Sync {
    fn deliver(&self, principal: &Principal, code: &OneTimeCode) -> Result<(), Error>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<T> CodeDelivery for std::sync::Arc<T>
where
    T: CodeDelivery + ?Sized,
{
    fn deliver(&self, principal: &Principal, code: &OneTimeCode) -> Result<(), Error> {
        (**self).deliver(principal, code)
    }
}
