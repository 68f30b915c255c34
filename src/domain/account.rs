use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AccountId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PrincipalId(pub u32);

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The end user owning at most one account.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub is_active: bool,
    /// Set once, by the provisioning step run at activation.
    pub account: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub principal: PrincipalId,
    pub balance: Money,
    pub is_suspended: bool,
    pub is_platform_account: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, principal: PrincipalId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            principal,
            balance: Money::ZERO,
            is_suspended: false,
            is_platform_account: false,
            created_at,
        }
    }

    pub fn platform(id: AccountId, principal: PrincipalId, created_at: DateTime<Utc>) -> Self {
        Self {
            is_platform_account: true,
            ..Self::new(id, principal, created_at)
        }
    }

    /// Returns whether the flag changed. The platform account is never suspended.
    pub fn suspend(&mut self) -> bool {
        if self.is_platform_account || self.is_suspended {
            return false;
        }
        self.is_suspended = true;
        true
    }

    pub fn reactivate(&mut self) -> bool {
        let changed = self.is_suspended;
        self.is_suspended = false;
        changed
    }
}

/// Why an account may not take part in a balance-mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotOperable {
    Suspended,
    PrincipalInactive,
}

impl core::fmt::Display for NotOperable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NotOperable::Suspended => write!(f, "account is suspended"),
            NotOperable::PrincipalInactive => write!(f, "account owner is not activated"),
        }
    }
}
