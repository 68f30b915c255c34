mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{harness, money};
use proptest::prelude::*;
use wallet_ledger::account_store::AccountStore;
use wallet_ledger::clock::SystemClock;
use wallet_ledger::domain::{
    AccountId, Error, Ledger, Money, NewTransaction, NotOperable, Page, Reference, Transaction,
    TransactionKind, TransactionStatus,
};
use wallet_ledger::{Engine, FeeSchedule, InMemoryLedger};

#[tokio::test]
async fn scenario_a_deposit_onto_empty_account() {
    let h = harness();
    let (_, account) = h.user("ama", "+22890000001", 0).await;

    let txn = h
        .bank
        .engine()
        .deposit(account, money(10_000), None)
        .await
        .unwrap();

    assert_eq!(h.balance(account).await, money(10_000));
    assert_eq!(h.balance(account).await.to_string(), "10000.00");
    assert_eq!(txn.kind, TransactionKind::Deposit);
    assert_eq!(txn.status, TransactionStatus::Completed);
    assert_eq!(txn.sender, account);
    assert_eq!(txn.receiver, Some(account));
    assert_eq!(h.rows(), 1);
    assert_eq!(h.bank.ledger().count_by_kind(TransactionKind::Deposit), 1);
}

#[tokio::test]
async fn scenario_b_transfer_between_accounts() {
    let h = harness();
    let (_, a) = h.user("ama", "+22890000001", 50_000).await;
    let (_, b) = h.user("kofi", "+22890000002", 0).await;
    let before = h.rows();

    let txn = h
        .bank
        .engine()
        .transfer(a, "+22890000002", money(10_000), Some("rent"))
        .await
        .unwrap();

    assert_eq!(h.balance(a).await, money(40_000));
    assert_eq!(h.balance(b).await, money(10_000));
    assert_eq!(txn.kind, TransactionKind::Transfer);
    assert_eq!(txn.receiver, Some(b));
    assert_eq!(txn.description, "rent");
    assert_eq!(h.rows(), before + 1);
}

#[tokio::test]
async fn scenario_c_withdrawal_charges_platform_fee() {
    let h = harness();
    let (_, account) = h.user("ama", "+22890000001", 50_000).await;
    let platform = h.bank.platform_account();
    let before = h.rows();

    let receipt = h
        .bank
        .engine()
        .withdraw(account, money(10_000), None)
        .await
        .unwrap();

    assert_eq!(receipt.withdrawal_amount, money(9_800));
    assert_eq!(receipt.fee_amount, money(200));
    assert_eq!(h.balance(account).await, money(40_000));
    assert_eq!(h.balance(platform).await, money(200));
    assert_eq!(h.rows(), before + 2);

    assert_eq!(receipt.withdrawal.kind, TransactionKind::Withdrawal);
    assert_eq!(receipt.withdrawal.receiver, None);
    assert_eq!(receipt.fee.kind, TransactionKind::Fee);
    assert_eq!(receipt.fee.receiver, Some(platform));
    assert_ne!(receipt.withdrawal.reference, receipt.fee.reference);
    assert_eq!(h.bank.total_fees().unwrap(), money(200));
    assert_eq!(h.bank.total_volume_completed().unwrap(), money(50_000 + 9_800));
}

#[tokio::test]
async fn scenario_d_withdrawal_beyond_balance() {
    let h = harness();
    let (_, account) = h.user("ama", "+22890000001", 50_000).await;
    let before = h.rows();

    let err = h
        .bank
        .engine()
        .withdraw(account, money(999_999), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientBalance { .. }));
    assert_eq!(h.rows(), before);
    assert_eq!(h.balance(account).await, money(50_000));
    assert_eq!(h.balance(h.bank.platform_account()).await, Money::ZERO);
}

#[tokio::test]
async fn scenario_e_transfer_to_self() {
    let h = harness();
    let (_, account) = h.user("ama", "+22890000001", 10_000).await;
    let before = h.rows();

    let err = h
        .bank
        .engine()
        .transfer(account, "+22890000001", money(1_000), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SelfTransferForbidden(id) if id == account));
    assert_eq!(h.balance(account).await, money(10_000));
    assert_eq!(h.rows(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_f_concurrent_withdrawals() {
    let h = harness();
    let (_, account) = h.user("ama", "+22890000001", 50_000).await;

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let bank = h.bank.clone();
            tokio::spawn(async move { bank.engine().withdraw(account, money(30_000), None).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut insufficient = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(Error::InsufficientBalance { .. }) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!((succeeded, insufficient), (1, 1));
    assert_eq!(h.balance(account).await, money(20_000));
    assert_eq!(h.balance(h.bank.platform_account()).await, money(600));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_transfers_do_not_deadlock() {
    let h = harness();
    let (_, a) = h.user("ama", "+22890000001", 1_000).await;
    let (_, b) = h.user("kofi", "+22890000002", 1_000).await;

    let mut tasks = Vec::new();
    for i in 0..100 {
        let bank = h.bank.clone();
        let (from, to) = if i % 2 == 0 {
            (a, "+22890000002")
        } else {
            (b, "+22890000001")
        };
        tasks.push(tokio::spawn(async move {
            bank.engine().transfer(from, to, money(10), None).await
        }));
    }
    let all = futures::future::join_all(tasks);
    let results = tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("transfers deadlocked");

    for result in results {
        result.unwrap().unwrap();
    }
    assert_eq!(h.balance(a).await, money(1_000));
    assert_eq!(h.balance(b).await, money(1_000));
}

#[tokio::test]
async fn rejected_operations_leave_no_trace() {
    let h = harness();
    let (_, a) = h.user("ama", "+22890000001", 5_000).await;
    let (_, b) = h.user("kofi", "+22890000002", 0).await;
    let engine = h.bank.engine();
    let before = h.rows();

    assert!(matches!(
        engine.deposit(a, Money::ZERO, None).await,
        Err(Error::InvalidAmount(_))
    ));
    assert!(matches!(
        engine.transfer(a, "+22890000002", Money(-100), None).await,
        Err(Error::InvalidAmount(_))
    ));
    assert!(matches!(
        engine.transfer(a, "+22899999999", money(10), None).await,
        Err(Error::RecipientNotFound(_))
    ));
    assert!(matches!(
        engine.transfer(a, "nobody", money(10), None).await,
        Err(Error::MalformedLookupKey(_))
    ));

    h.bank.accounts().suspend(b).await.unwrap();
    assert!(matches!(
        engine.transfer(a, "+22890000002", money(10), None).await,
        Err(Error::RecipientSuspended(id)) if id == b
    ));
    assert!(matches!(
        engine.deposit(b, money(10), None).await,
        Err(Error::AccountNotOperable { reason: NotOperable::Suspended, .. })
    ));

    h.bank.accounts().suspend(a).await.unwrap();
    assert!(matches!(
        engine.withdraw(a, money(100), None).await,
        Err(Error::AccountNotOperable { .. })
    ));

    assert_eq!(h.rows(), before);
    assert_eq!(h.balance(a).await, money(5_000));
    assert_eq!(h.balance(b).await, Money::ZERO);
}

#[tokio::test]
async fn balance_check_precedes_recipient_resolution() {
    let h = harness();
    let (_, a) = h.user("ama", "+22890000001", 100).await;

    assert!(matches!(
        h.bank
            .engine()
            .transfer(a, "+22899999999", money(1_000), None)
            .await,
        Err(Error::InsufficientBalance { .. })
    ));
}

#[tokio::test]
async fn missing_platform_account_is_an_integrity_error() {
    let clock = Arc::new(SystemClock);
    let accounts = Arc::new(AccountStore::new(clock.clone(), Duration::from_secs(1)));
    let ledger = Arc::new(InMemoryLedger::new(clock));
    let engine = Engine::new(
        accounts.clone(),
        ledger.clone(),
        FeeSchedule::new(rust_decimal::Decimal::new(2, 0)),
    );

    let principal = accounts
        .register_principal("ama", "ama@example.com", "+22890000001")
        .unwrap();
    let account = accounts.activate_principal(principal.id).unwrap();
    engine.deposit(account, money(1_000), None).await.unwrap();

    let err = engine.withdraw(account, money(100), None).await.unwrap_err();
    assert!(matches!(err, Error::PlatformAccountMissing));
    assert!(err.is_integrity());
    assert_eq!(ledger.len(), 1);
    assert_eq!(accounts.account(account).await.unwrap().balance, money(1_000));
}

/// Accepts queries but refuses every write, as a store with a clashing reference would.
struct CollidingLedger(InMemoryLedger);

impl Ledger for CollidingLedger {
    fn next_reference(&self) -> Reference {
        self.0.next_reference()
    }

    fn record(&self, entries: Vec<NewTransaction>) -> Result<Vec<Transaction>, Error> {
        Err(Error::ReferenceCollision(entries[0].reference.clone()))
    }

    fn find(&self, reference: &Reference) -> Option<Transaction> {
        self.0.find(reference)
    }

    fn history(&self, account: AccountId, page: Page) -> Vec<Transaction> {
        self.0.history(account, page)
    }

    fn recent(&self, limit: usize) -> Vec<Transaction> {
        self.0.recent(limit)
    }

    fn total_fees(&self) -> Result<Money, Error> {
        self.0.total_fees()
    }

    fn total_volume_completed(&self) -> Result<Money, Error> {
        self.0.total_volume_completed()
    }

    fn completed_count(&self) -> usize {
        self.0.completed_count()
    }

    fn count_by_kind(&self, kind: TransactionKind) -> usize {
        self.0.count_by_kind(kind)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[tokio::test]
async fn ledger_failure_rolls_back_balance_changes() {
    let clock = Arc::new(SystemClock);
    let accounts = Arc::new(AccountStore::new(clock.clone(), Duration::from_secs(1)));
    let platform = accounts
        .provision_platform(&wallet_ledger::config::PlatformConfig::default())
        .unwrap();
    let a = {
        let p = accounts
            .register_principal("ama", "ama@example.com", "+22890000001")
            .unwrap();
        accounts.activate_principal(p.id).unwrap()
    };
    let b = {
        let p = accounts
            .register_principal("kofi", "kofi@example.com", "+22890000002")
            .unwrap();
        accounts.activate_principal(p.id).unwrap()
    };

    // fund through a working engine first
    let funding = Engine::new(
        accounts.clone(),
        Arc::new(InMemoryLedger::new(clock.clone())),
        FeeSchedule::new(rust_decimal::Decimal::new(2, 0)),
    );
    funding.deposit(a, money(1_000), None).await.unwrap();

    let engine = Engine::new(
        accounts.clone(),
        Arc::new(CollidingLedger(InMemoryLedger::new(clock))),
        FeeSchedule::new(rust_decimal::Decimal::new(2, 0)),
    );

    let err = engine
        .transfer(a, "+22890000002", money(400), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReferenceCollision(_)));

    let err = engine.withdraw(a, money(500), None).await.unwrap_err();
    assert!(err.is_integrity());

    assert_eq!(accounts.account(a).await.unwrap().balance, money(1_000));
    assert_eq!(accounts.account(b).await.unwrap().balance, Money::ZERO);
    assert_eq!(accounts.account(platform).await.unwrap().balance, Money::ZERO);
    assert!(engine.ledger().is_empty());
}

#[tokio::test]
async fn history_and_summary_reflect_activity() {
    let h = harness();
    let (_, a) = h.user("ama", "+22890000001", 50_000).await;
    let (_, b) = h.user("kofi", "+22890000002", 0).await;
    let engine = h.bank.engine();
    engine
        .transfer(a, "+22890000002", money(10_000), None)
        .await
        .unwrap();
    engine.withdraw(a, money(10_000), None).await.unwrap();
    h.bank.accounts().suspend(b).await.unwrap();

    let history = h.bank.history(a, Page::first(10));
    let kinds: Vec<_> = history.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Fee,
            TransactionKind::Withdrawal,
            TransactionKind::Transfer,
            TransactionKind::Deposit,
        ]
    );
    assert_eq!(h.bank.history(b, Page::first(10)).len(), 1);
    assert_eq!(h.bank.history(a, Page { number: 2, size: 3 }).len(), 1);

    let summary = h.bank.summary().await.unwrap();
    assert_eq!(summary.total_fees, money(200));
    assert_eq!(summary.total_volume, money(50_000 + 10_000 + 9_800));
    assert_eq!(summary.completed_transactions, 4);
    assert!(summary.by_kind.contains(&(TransactionKind::Fee, 1)));
    assert_eq!(summary.active_accounts, 1);
    assert_eq!(summary.suspended_accounts, 1);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Property: a transfer either moves money without creating or destroying
    /// any, or changes nothing at all.
    #[test]
    fn transfers_conserve_money(
        funds in 0i64..1_000_000,
        amount in -100i64..2_000_000,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let h = harness();
            let (_, a) = h.user("ama", "+22890000001", 0).await;
            let (_, b) = h.user("kofi", "+22890000002", 0).await;
            if funds > 0 {
                h.bank.engine().deposit(a, Money(funds), None).await.unwrap();
            }
            let rows_before = h.rows();

            let result = h
                .bank
                .engine()
                .transfer(a, "+22890000002", Money(amount), None)
                .await;

            let (after_a, after_b) = (h.balance(a).await, h.balance(b).await);
            assert_eq!(after_a.checked_add(after_b), Some(Money(funds)));
            match result {
                Ok(_) => {
                    assert_eq!(after_b, Money(amount));
                    assert_eq!(h.rows(), rows_before + 1);
                }
                Err(_) => {
                    assert_eq!(after_a, Money(funds));
                    assert_eq!(h.rows(), rows_before);
                }
            }
            assert!(after_a >= Money::ZERO);
        });
    }
}
