pub mod account_store;
pub mod bank;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod ledger;
pub mod logging;
pub mod onboarding;
pub mod otp;
pub mod processor;
pub mod report;
pub mod withdrawal;

pub use account_store::{AccountStore, UnitOfWork};
pub use bank::{Bank, LedgerSummary};
pub use domain::{Error, ErrorClass, Money};
pub use engine::{Engine, FeeSchedule, WithdrawalQuote, WithdrawalReceipt};
pub use ledger::InMemoryLedger;
pub use otp::CodeVerifier;
pub use withdrawal::{PendingWithdrawal, WithdrawalDesk};
