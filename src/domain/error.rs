use crate::domain::{AccountId, Money, NotOperable, PrincipalId, Reference};

/// How an upstream caller should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input, caught before any mutation.
    Validation,
    /// Expected business-rule refusal, shown to the user.
    Rejected,
    /// Configuration or storage defect. Never a user mistake.
    Integrity,
    /// I/O and parsing around the engine (files, CSV, JSON).
    Infrastructure,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Code delivery failed: {0}")]
    Delivery(String),

    // validation
    #[error("Amount must be a positive amount of at least one fee unit, got {0}")]
    InvalidAmount(Money),

    #[error("Malformed lookup key: {0}")]
    MalformedLookupKey(String),

    #[error("Invalid principal details: {0}")]
    InvalidPrincipal(String),

    // business rules
    #[error("Account {account} cannot operate: {reason}")]
    AccountNotOperable {
        account: AccountId,
        reason: NotOperable,
    },

    #[error("Insufficient balance on account {account}: {available} available, {requested} requested")]
    InsufficientBalance {
        account: AccountId,
        available: Money,
        requested: Money,
    },

    #[error("No active user found for {0}")]
    RecipientNotFound(String),

    #[error("Recipient {0} has no account")]
    RecipientHasNoAccount(PrincipalId),

    #[error("Account {0} cannot transfer to itself")]
    SelfTransferForbidden(AccountId),

    #[error("Recipient account {0} is suspended")]
    RecipientSuspended(AccountId),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Principal {0} not found")]
    PrincipalNotFound(String),

    #[error("Principal {0} has no account")]
    NoAccount(PrincipalId),

    #[error("{0} is already taken")]
    DuplicatePrincipal(String),

    #[error("Principal {0} is already active")]
    PrincipalAlreadyActive(PrincipalId),

    #[error("Principal {0} already has an account")]
    AccountAlreadyProvisioned(PrincipalId),

    #[error("Invalid code")]
    InvalidCode,

    #[error("Code has already been used")]
    CodeAlreadyUsed,

    #[error("Code has expired")]
    CodeExpired,

    #[error("No pending withdrawal for principal {0}")]
    NoPendingWithdrawal(PrincipalId),

    #[error("Pending withdrawal for principal {0} has expired")]
    PendingWithdrawalExpired(PrincipalId),

    // integrity
    #[error("Platform account is missing")]
    PlatformAccountMissing,

    #[error("Platform account already exists as account {0}")]
    PlatformAccountDuplicated(AccountId),

    #[error("Transaction reference {0} already exists")]
    ReferenceCollision(Reference),

    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(AccountId),

    #[error("Timed out acquiring locks on accounts {0:?}")]
    LockTimeout(Vec<AccountId>),

    #[error("Integrity violation: {0}")]
    Integrity(String),
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::IO(_)
            | Error::Csv(_)
            | Error::Json(_)
            | Error::Ingestion(_)
            | Error::Config(_)
            | Error::Delivery(_) => ErrorClass::Infrastructure,

            Error::InvalidAmount(_) | Error::MalformedLookupKey(_) | Error::InvalidPrincipal(_) => {
                ErrorClass::Validation
            }

            Error::PlatformAccountMissing
            | Error::PlatformAccountDuplicated(_)
            | Error::ReferenceCollision(_)
            | Error::BalanceOverflow(_)
            | Error::LockTimeout(_)
            | Error::Integrity(_) => ErrorClass::Integrity,

            _ => ErrorClass::Rejected,
        }
    }

    pub fn is_integrity(&self) -> bool {
        self.class() == ErrorClass::Integrity
    }
}
