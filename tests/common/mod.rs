#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use wallet_ledger::bank::Bank;
use wallet_ledger::clock::ManualClock;
use wallet_ledger::config::Config;
use wallet_ledger::delivery::Inbox;
use wallet_ledger::domain::{AccountId, CodePurpose, PrincipalId};
use wallet_ledger::Money;

pub struct Harness {
    pub bank: Arc<Bank<Arc<Inbox>>>,
    pub inbox: Arc<Inbox>,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    harness_with(Config::default())
}

pub fn harness_with(config: Config) -> Harness {
    let inbox = Arc::new(Inbox::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let bank = Bank::bootstrap(config, inbox.clone(), clock.clone()).unwrap();
    Harness {
        bank: Arc::new(bank),
        inbox,
        clock,
    }
}

pub fn money(units: i64) -> Money {
    Money::from_major(units).unwrap()
}

impl Harness {
    /// Signs up, activates and optionally funds a user.
    pub async fn user(&self, name: &str, phone: &str, funds: i64) -> (PrincipalId, AccountId) {
        let onboarding = self.bank.onboarding();
        let (principal, _) = onboarding
            .sign_up(name, &format!("{}@example.com", name), phone)
            .unwrap();
        let code = self.code(principal, CodePurpose::AccountActivation);
        let account = onboarding.activate(principal, &code).unwrap();
        if funds > 0 {
            self.bank
                .engine()
                .deposit(account, money(funds), Some("initial funds"))
                .await
                .unwrap();
        }
        (principal, account)
    }

    pub fn code(&self, principal: PrincipalId, purpose: CodePurpose) -> String {
        self.inbox.latest(principal, purpose).unwrap().code
    }

    pub async fn balance(&self, account: AccountId) -> Money {
        self.bank.accounts().account(account).await.unwrap().balance
    }

    pub fn rows(&self) -> usize {
        use wallet_ledger::domain::Ledger;
        self.bank.ledger().len()
    }
}
