use std::sync::Arc;

use tracing::info;

use crate::account_store::AccountStore;
use crate::config::Config;
use crate::domain::{
    AccountId, Clock, CodeDelivery, Error, Ledger, Money, Page, Transaction, TransactionKind,
};
use crate::engine::{Engine, FeeSchedule};
use crate::ledger::InMemoryLedger;
use crate::onboarding::Onboarding;
use crate::otp::CodeVerifier;
use crate::withdrawal::WithdrawalDesk;

/// Figures shown on the administration dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub total_fees: Money,
    pub total_volume: Money,
    pub completed_transactions: usize,
    pub by_kind: Vec<(TransactionKind, usize)>,
    pub active_accounts: usize,
    pub suspended_accounts: usize,
}

/// Wires every component from one [`Config`] and provisions the platform account.
pub struct Bank<D>
where
    D: CodeDelivery,
{
    config: Config,
    accounts: Arc<AccountStore>,
    ledger: Arc<InMemoryLedger>,
    engine: Arc<Engine<InMemoryLedger>>,
    verifier: Arc<CodeVerifier<D>>,
    withdrawals: WithdrawalDesk<InMemoryLedger, D>,
    onboarding: Onboarding<D>,
    platform: AccountId,
}

impl<D> Bank<D>
where
    D: CodeDelivery,
{
    pub fn bootstrap(config: Config, delivery: D, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        config.validate()?;

        let accounts = Arc::new(AccountStore::new(clock.clone(), config.lock_timeout()));
        let platform = accounts.provision_platform(&config.platform)?;
        let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
        let engine = Arc::new(Engine::new(
            accounts.clone(),
            ledger.clone(),
            FeeSchedule::new(config.fee_percentage),
        ));
        let verifier = Arc::new(CodeVerifier::new(
            config.otp.clone(),
            delivery,
            clock.clone(),
        ));
        let withdrawals = WithdrawalDesk::new(
            engine.clone(),
            verifier.clone(),
            clock,
            config.pending_withdrawal_lifetime(),
        );
        let onboarding = Onboarding::new(accounts.clone(), verifier.clone());

        info!(
            platform = %platform,
            fee_percentage = %config.fee_percentage,
            "bank bootstrapped"
        );
        Ok(Self {
            config,
            accounts,
            ledger,
            engine,
            verifier,
            withdrawals,
            onboarding,
            platform,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    pub fn engine(&self) -> &Arc<Engine<InMemoryLedger>> {
        &self.engine
    }

    pub fn verifier(&self) -> &Arc<CodeVerifier<D>> {
        &self.verifier
    }

    pub fn withdrawals(&self) -> &WithdrawalDesk<InMemoryLedger, D> {
        &self.withdrawals
    }

    pub fn onboarding(&self) -> &Onboarding<D> {
        &self.onboarding
    }

    pub fn platform_account(&self) -> AccountId {
        self.platform
    }

    pub fn total_fees(&self) -> Result<Money, Error> {
        self.ledger.total_fees()
    }

    pub fn total_volume_completed(&self) -> Result<Money, Error> {
        self.ledger.total_volume_completed()
    }

    pub fn history(&self, account: AccountId, page: Page) -> Vec<Transaction> {
        self.ledger.history(account, page)
    }

    pub async fn summary(&self) -> Result<LedgerSummary, Error> {
        let stats = self.accounts.stats().await?;
        Ok(LedgerSummary {
            total_fees: self.ledger.total_fees()?,
            total_volume: self.ledger.total_volume_completed()?,
            completed_transactions: self.ledger.completed_count(),
            by_kind: TransactionKind::ALL
                .iter()
                .map(|kind| (*kind, self.ledger.count_by_kind(*kind)))
                .collect(),
            active_accounts: stats.active,
            suspended_accounts: stats.suspended,
        })
    }
}
