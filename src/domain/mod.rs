pub mod account;
pub mod error;
pub mod money;
pub mod operation;
pub mod otp;
pub mod traits;
pub mod transaction;

pub use account::{Account, AccountId, NotOperable, Principal, PrincipalId};
pub use error::{Error, ErrorClass};
pub use money::Money;
pub use operation::{Operation, OperationKind};
pub use otp::{CodePurpose, DeliveryToken, OneTimeCode};
pub use traits::{Clock, CodeDelivery, CommandStream, DeadLetterQueue, Ledger};
pub use transaction::{
    NewTransaction, Page, Reference, Transaction, TransactionKind, TransactionStatus,
};
