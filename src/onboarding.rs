use std::sync::Arc;

use tracing::info;

use crate::account_store::AccountStore;
use crate::domain::{AccountId, CodeDelivery, CodePurpose, DeliveryToken, Error, PrincipalId};
use crate::otp::CodeVerifier;

/// Sign-up and activation. The account is provisioned once, when the
/// activation code is verified.
pub struct Onboarding<D>
where
    D: CodeDelivery,
{
    accounts: Arc<AccountStore>,
    verifier: Arc<CodeVerifier<D>>,
}

impl<D> Onboarding<D>
where
    D: CodeDelivery,
{
    pub fn new(accounts: Arc<AccountStore>, verifier: Arc<CodeVerifier<D>>) -> Self {
        Self { accounts, verifier }
    }

    pub fn sign_up(
        &self,
        username: &str,
        email: &str,
        phone_number: &str,
    ) -> Result<(PrincipalId, DeliveryToken), Error> {
        let principal = self
            .accounts
            .register_principal(username, email, phone_number)?;
        let token = self
            .verifier
            .issue_code(&principal, CodePurpose::AccountActivation)?;
        info!(principal = %principal.id, "sign-up awaiting activation");
        Ok((principal.id, token))
    }

    pub fn activate(&self, principal: PrincipalId, code: &str) -> Result<AccountId, Error> {
        let owner = self.accounts.principal(principal)?;
        if owner.account.is_some() {
            return Err(Error::AccountAlreadyProvisioned(principal));
        }
        if owner.is_active {
            return Err(Error::PrincipalAlreadyActive(principal));
        }
        self.verifier
            .verify_code(principal, code, CodePurpose::AccountActivation)?;
        self.accounts.activate_principal(principal)
    }

    pub fn resend_activation(&self, principal: PrincipalId) -> Result<DeliveryToken, Error> {
        let owner = self.accounts.principal(principal)?;
        if owner.is_active {
            return Err(Error::PrincipalAlreadyActive(principal));
        }
        self.verifier
            .resend_code(&owner, CodePurpose::AccountActivation)
    }
}
