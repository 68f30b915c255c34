use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::domain::{
    AccountId, Clock, CodeDelivery, CodePurpose, DeliveryToken, Error, Ledger, Money, PrincipalId,
};
use crate::engine::{Engine, WithdrawalQuote, WithdrawalReceipt};
use crate::otp::CodeVerifier;

/// A withdrawal waiting for its confirmation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWithdrawal {
    pub principal: PrincipalId,
    pub account: AccountId,
    pub requested_amount: Money,
    pub description: Option<String>,
    pub quote: WithdrawalQuote,
    pub issued_code_ref: DeliveryToken,
    pub expires_at: DateTime<Utc>,
}

/// Two-step withdrawal: request (issues a code) then confirm (consumes it and
/// runs the engine). Pending requests are keyed by principal and expire on
/// their own clock, independent of any caller session.
pub struct WithdrawalDesk<L, D>
where
    L: Ledger,
    D: CodeDelivery,
{
    engine: Arc<Engine<L>>,
    verifier: Arc<CodeVerifier<D>>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
    pending: Mutex<HashMap<PrincipalId, PendingWithdrawal>>,
}

impl<L, D> WithdrawalDesk<L, D>
where
    L: Ledger,
    D: CodeDelivery,
{
    pub fn new(
        engine: Arc<Engine<L>>,
        verifier: Arc<CodeVerifier<D>>,
        clock: Arc<dyn Clock>,
        lifetime: Duration,
    ) -> Self {
        Self {
            engine,
            verifier,
            clock,
            lifetime,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PrincipalId, PendingWithdrawal>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pending(&self, principal: PrincipalId) -> Option<PendingWithdrawal> {
        self.table().get(&principal).cloned()
    }

    /// Pre-checks the withdrawal, sends a confirmation code and parks the
    /// request. A newer request replaces an older one.
    pub async fn request(
        &self,
        principal: PrincipalId,
        amount: Money,
        description: Option<&str>,
    ) -> Result<PendingWithdrawal, Error> {
        let accounts = self.engine.accounts();
        let owner = accounts.principal(principal)?;
        let account_id = owner.account.ok_or(Error::NoAccount(principal))?;
        let account = accounts.account(account_id).await?;

        accounts.check_operable(&account)?;
        if !amount.is_positive() {
            return Err(Error::InvalidAmount(amount));
        }
        if account.balance < amount {
            return Err(Error::InsufficientBalance {
                account: account_id,
                available: account.balance,
                requested: amount,
            });
        }
        let quote = self.engine.fees().quote(amount)?;

        let token = self
            .verifier
            .issue_code(&owner, CodePurpose::WithdrawalConfirmation)?;
        let pending = PendingWithdrawal {
            principal,
            account: account_id,
            requested_amount: amount,
            description: description.map(str::to_string),
            quote,
            issued_code_ref: token,
            expires_at: self.clock.now() + self.lifetime,
        };
        self.table().insert(principal, pending.clone());
        info!(
            principal = %principal,
            account = %account_id,
            requested = %amount,
            fee = %quote.fee_amount,
            "withdrawal awaiting confirmation"
        );
        Ok(pending)
    }

    /// Verifies the code issued for the pending request and runs the
    /// withdrawal. A wrong code keeps the request pending so the user can try
    /// again; a code issued for any other request is rejected untouched.
    pub async fn confirm(
        &self,
        principal: PrincipalId,
        code: &str,
    ) -> Result<WithdrawalReceipt, Error> {
        let pending = {
            let mut table = self.table();
            let pending = self.live(&mut table, principal)?;
            self.verifier.verify_issued_code(
                principal,
                code,
                CodePurpose::WithdrawalConfirmation,
                pending.issued_code_ref,
            )?;
            table.remove(&principal);
            pending
        };

        self.engine
            .withdraw(
                pending.account,
                pending.requested_amount,
                pending.description.as_deref(),
            )
            .await
    }

    /// Sends a fresh code and restarts the pending request's lifetime.
    pub fn resend(&self, principal: PrincipalId) -> Result<DeliveryToken, Error> {
        self.live(&mut self.table(), principal)?;
        let owner = self.engine.accounts().principal(principal)?;
        let token = self
            .verifier
            .resend_code(&owner, CodePurpose::WithdrawalConfirmation)?;

        let expires_at = self.clock.now() + self.lifetime;
        if let Some(pending) = self.table().get_mut(&principal) {
            pending.issued_code_ref = token;
            pending.expires_at = expires_at;
        }
        Ok(token)
    }

    /// Drops the pending request and revokes its code.
    pub fn cancel(&self, principal: PrincipalId) -> bool {
        let Some(pending) = self.table().remove(&principal) else {
            return false;
        };
        self.verifier.revoke_code(pending.issued_code_ref);
        info!(principal = %principal, "pending withdrawal cancelled");
        true
    }

    /// The pending request, dropping it first if it has expired.
    fn live(
        &self,
        table: &mut HashMap<PrincipalId, PendingWithdrawal>,
        principal: PrincipalId,
    ) -> Result<PendingWithdrawal, Error> {
        let now = self.clock.now();
        let pending = table
            .get(&principal)
            .cloned()
            .ok_or(Error::NoPendingWithdrawal(principal))?;
        if now >= pending.expires_at {
            table.remove(&principal);
            warn!(principal = %principal, "pending withdrawal expired");
            return Err(Error::PendingWithdrawalExpired(principal));
        }
        Ok(pending)
    }
}
