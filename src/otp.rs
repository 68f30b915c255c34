use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OtpConfig;
use crate::domain::{
    Clock, CodeDelivery, CodePurpose, DeliveryToken, Error, OneTimeCode, Principal, PrincipalId,
};

/// Issues and checks short-lived single-use numeric codes.
///
/// Per (principal, purpose) a code moves `Active -> Consumed | Expired`; issuing
/// a new one marks every older unused code of that purpose as used.
pub struct CodeVerifier<D>
where
    D: CodeDelivery,
{
    settings: OtpConfig,
    delivery: D,
    clock: Arc<dyn Clock>,
    codes: Mutex<Vec<OneTimeCode>>,
}

impl<D> core::fmt::Debug for CodeVerifier<D>
where
    D: CodeDelivery,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CodeVerifier")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<D> CodeVerifier<D>
where
    D: CodeDelivery,
{
    pub fn new(settings: OtpConfig, delivery: D, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            delivery,
            clock,
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    fn codes(&self) -> MutexGuard<'_, Vec<OneTimeCode>> {
        self.codes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generate_code(&self) -> String {
        let modulus = 10u128.pow(self.settings.code_length as u32);
        let value = Uuid::new_v4().as_u128() % modulus;
        format!("{:0width$}", value, width = self.settings.code_length)
    }

    /// Invalidates any active code for (principal, purpose), stores a new one
    /// and hands it to the delivery collaborator.
    pub fn issue_code(
        &self,
        principal: &Principal,
        purpose: CodePurpose,
    ) -> Result<DeliveryToken, Error> {
        let now = self.clock.now();
        let code = OneTimeCode {
            token: DeliveryToken(Uuid::new_v4()),
            principal: principal.id,
            code: self.generate_code(),
            purpose,
            used: false,
            expires_at: now + self.settings.lifetime(purpose),
            created_at: now,
        };

        {
            let mut codes = self.codes();
            codes.retain(|c| now < c.expires_at);
            codes
                .iter_mut()
                .filter(|c| c.principal == principal.id && c.purpose == purpose && !c.used)
                .for_each(|c| c.used = true);
            codes.push(code.clone());
        }

        // delivery runs outside the code table lock
        if let Err(e) = self.delivery.deliver(principal, &code) {
            warn!(principal = %principal.id, %purpose, error = %e, "code delivery failed");
            self.revoke_code(code.token);
            return Err(e);
        }

        info!(
            principal = %principal.id,
            %purpose,
            expires_at = %code.expires_at,
            "one-time code issued"
        );
        Ok(code.token)
    }

    /// Same as [`issue_code`](Self::issue_code); the previous code stops working.
    pub fn resend_code(
        &self,
        principal: &Principal,
        purpose: CodePurpose,
    ) -> Result<DeliveryToken, Error> {
        info!(principal = %principal.id, %purpose, "one-time code resend requested");
        self.issue_code(principal, purpose)
    }

    /// Consumes the code on success and returns the token it was issued under.
    pub fn verify_code(
        &self,
        principal: PrincipalId,
        submitted_code: &str,
        purpose: CodePurpose,
    ) -> Result<DeliveryToken, Error> {
        self.consume(principal, submitted_code, purpose, None)
    }

    /// Accepts only the code issued under `token`. A live code issued under
    /// any other token is reported as invalid and left untouched.
    pub fn verify_issued_code(
        &self,
        principal: PrincipalId,
        submitted_code: &str,
        purpose: CodePurpose,
        token: DeliveryToken,
    ) -> Result<(), Error> {
        self.consume(principal, submitted_code, purpose, Some(token))
            .map(|_| ())
    }

    fn consume(
        &self,
        principal: PrincipalId,
        submitted_code: &str,
        purpose: CodePurpose,
        expected: Option<DeliveryToken>,
    ) -> Result<DeliveryToken, Error> {
        let submitted = submitted_code.trim();
        if submitted.len() != self.settings.code_length
            || !submitted.bytes().all(|b| b.is_ascii_digit())
        {
            warn!(principal = %principal, %purpose, "malformed one-time code submitted");
            return Err(Error::InvalidCode);
        }

        let now = self.clock.now();
        let mut codes = self.codes();
        let code = codes
            .iter_mut()
            .rev()
            .find(|c| c.principal == principal && c.purpose == purpose && c.code == submitted)
            .ok_or_else(|| {
                warn!(principal = %principal, %purpose, "invalid one-time code submitted");
                Error::InvalidCode
            })?;

        if !code.used && expected.is_some_and(|token| code.token != token) {
            warn!(principal = %principal, %purpose, "one-time code issued under another token");
            return Err(Error::InvalidCode);
        }
        if code.used {
            warn!(principal = %principal, %purpose, "one-time code reused");
            return Err(Error::CodeAlreadyUsed);
        }
        if now >= code.expires_at {
            warn!(principal = %principal, %purpose, "expired one-time code submitted");
            return Err(Error::CodeExpired);
        }

        code.used = true;
        info!(principal = %principal, %purpose, "one-time code verified");
        Ok(code.token)
    }

    /// Whether (principal, purpose) currently has a usable code.
    pub fn has_active_code(&self, principal: PrincipalId, purpose: CodePurpose) -> bool {
        let now = self.clock.now();
        self.codes()
            .iter()
            .any(|c| c.principal == principal && c.purpose == purpose && c.is_active(now))
    }

    /// Marks the code issued under `token` as used. Returns whether it was
    /// still usable.
    pub fn revoke_code(&self, token: DeliveryToken) -> bool {
        match self.codes().iter_mut().find(|c| c.token == token) {
            Some(code) if !code.used => {
                code.used = true;
                true
            }
            _ => false,
        }
    }
}
