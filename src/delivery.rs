use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{
    CodeDelivery, CodePurpose, DeliveryToken, Error, OneTimeCode, Principal, PrincipalId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredCode {
    pub token: DeliveryToken,
    pub principal: PrincipalId,
    pub recipient: String,
    pub purpose: CodePurpose,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// In-memory mailbox standing in for the email/SMS transport. Holds the
/// latest code per (principal, purpose).
#[derive(Debug, Default)]
pub struct Inbox {
    messages: Mutex<Vec<DeliveredCode>>,
    failing: AtomicBool,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn messages(&self) -> MutexGuard<'_, Vec<DeliveredCode>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Most recent code sent to `principal` for `purpose`.
    pub fn latest(&self, principal: PrincipalId, purpose: CodePurpose) -> Option<DeliveredCode> {
        self.messages()
            .iter()
            .rev()
            .find(|m| m.principal == principal && m.purpose == purpose)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulates a transport outage.
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl CodeDelivery for Inbox {
    fn deliver(&self, principal: &Principal, code: &OneTimeCode) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Delivery(format!(
                "transport unavailable for {}",
                principal.email
            )));
        }
        let mut messages = self.messages();
        // a newer code replaces the previous one in the same mailbox slot
        messages.retain(|m| !(m.principal == principal.id && m.purpose == code.purpose));
        messages.push(DeliveredCode {
            token: code.token,
            principal: principal.id,
            recipient: principal.email.clone(),
            purpose: code.purpose,
            code: code.code.clone(),
            expires_at: code.expires_at,
        });
        drop(messages);
        info!(to = %principal.email, purpose = %code.purpose, "code delivered");
        Ok(())
    }
}
