use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::PrincipalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    AccountActivation,
    WithdrawalConfirmation,
}

impl core::fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CodePurpose::AccountActivation => write!(f, "account activation"),
            CodePurpose::WithdrawalConfirmation => write!(f, "withdrawal confirmation"),
        }
    }
}

/// Opaque handle on an issued code, safe to hand back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeliveryToken(pub Uuid);

impl core::fmt::Display for DeliveryToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct OneTimeCode {
    pub token: DeliveryToken,
    pub principal: PrincipalId,
    pub code: String,
    pub purpose: CodePurpose,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }
}
