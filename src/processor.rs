use std::sync::Arc;

use futures::StreamExt;
use tracing::info;

use crate::bank::Bank;
use crate::delivery::Inbox;
use crate::domain::{
    AccountId, CodePurpose, CommandStream, DeadLetterQueue, Error, Operation, OperationKind,
    PrincipalId,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub applied: usize,
    pub failed: usize,
}

/// Replays a stream of operations against a bank. Codes are read back from
/// the in-memory inbox, so sign-ups and withdrawals confirm themselves.
pub struct BatchProcessor<I, D>
where
    I: CommandStream,
    D: DeadLetterQueue,
{
    ingestion: I,
    bank: Bank<Arc<Inbox>>,
    dlq: D,
}

impl<I, D> BatchProcessor<I, D>
where
    I: CommandStream,
    D: DeadLetterQueue,
{
    pub fn new(ingestion: I, bank: Bank<Arc<Inbox>>, dlq: D) -> Self {
        Self {
            ingestion,
            bank,
            dlq,
        }
    }

    pub fn bank(&self) -> &Bank<Arc<Inbox>> {
        &self.bank
    }

    pub fn dlq(&self) -> &D {
        &self.dlq
    }

    pub async fn process(&mut self) -> Result<BatchStats, Error> {
        let mut res = self.ingestion.stream();
        let mut stats = BatchStats::default();

        while let Some(op) = res.next().await {
            match op {
                Ok(op) => match self.apply_operation(&op).await {
                    Ok(()) => stats.applied += 1,
                    Err(e) => {
                        stats.failed += 1;
                        self.dlq.report(Some(&op), &e);
                    }
                },
                Err(e) => {
                    stats.failed += 1;
                    self.dlq.report(None, &e);
                }
            }
        }

        info!(applied = stats.applied, failed = stats.failed, "batch processed");
        Ok(stats)
    }

    fn inbox(&self) -> &Arc<Inbox> {
        self.bank.verifier().delivery()
    }

    fn principal_of(&self, username: &str) -> Result<PrincipalId, Error> {
        Ok(self.bank.accounts().principal_by_username(username)?.id)
    }

    fn account_of(&self, username: &str) -> Result<AccountId, Error> {
        let principal = self.principal_of(username)?;
        self.bank.accounts().account_of(principal)
    }

    fn latest_code(&self, principal: PrincipalId, purpose: CodePurpose) -> Result<String, Error> {
        self.inbox()
            .latest(principal, purpose)
            .map(|m| m.code)
            .ok_or_else(|| Error::Delivery(format!("no {} code in inbox", purpose)))
    }

    async fn apply_operation(&self, op: &Operation) -> Result<(), Error> {
        let description = op.description.as_deref();
        match &op.kind {
            OperationKind::SignUp {
                phone_number,
                email,
            } => {
                let onboarding = self.bank.onboarding();
                let (principal, _) = onboarding.sign_up(&op.user, email, phone_number)?;
                let code = self.latest_code(principal, CodePurpose::AccountActivation)?;
                onboarding.activate(principal, &code)?;
            }
            OperationKind::Deposit { amount } => {
                let account = self.account_of(&op.user)?;
                self.bank
                    .engine()
                    .deposit(account, *amount, description)
                    .await?;
            }
            OperationKind::Transfer { recipient, amount } => {
                let account = self.account_of(&op.user)?;
                self.bank
                    .engine()
                    .transfer(account, recipient, *amount, description)
                    .await?;
            }
            OperationKind::Withdraw { amount } => {
                let principal = self.principal_of(&op.user)?;
                let desk = self.bank.withdrawals();
                desk.request(principal, *amount, description).await?;
                let code = self.latest_code(principal, CodePurpose::WithdrawalConfirmation)?;
                desk.confirm(principal, &code).await?;
            }
            OperationKind::Suspend => {
                let account = self.account_of(&op.user)?;
                self.bank.accounts().suspend(account).await?;
            }
            OperationKind::Reactivate => {
                let account = self.account_of(&op.user)?;
                self.bank.accounts().reactivate(account).await?;
            }
        }
        Ok(())
    }
}
