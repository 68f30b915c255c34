use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::account_store::AccountStore;
use crate::domain::{
    AccountId, Error, ErrorClass, Ledger, Money, NewTransaction, Transaction, TransactionKind,
    TransactionStatus,
};

/// Amounts of a withdrawal before it runs. `withdrawal_amount + fee_amount == requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalQuote {
    pub requested: Money,
    pub withdrawal_amount: Money,
    pub fee_amount: Money,
}

#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    pub withdrawal_amount: Money,
    pub fee_amount: Money,
    pub withdrawal: Transaction,
    pub fee: Transaction,
}

/// Percentage withdrawal fee, rounded half to even to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    percentage: Decimal,
}

impl FeeSchedule {
    pub fn new(percentage: Decimal) -> Self {
        Self { percentage }
    }

    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    /// The fee is rounded first and the net amount derived by subtraction,
    /// so the two always add back up to `requested`.
    pub fn quote(&self, requested: Money) -> Result<WithdrawalQuote, Error> {
        if !requested.is_positive() {
            return Err(Error::InvalidAmount(requested));
        }
        let raw_fee = requested
            .to_decimal()
            .checked_mul(self.percentage)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(Error::InvalidAmount(requested))?;
        let fee_amount = Money::from_decimal(raw_fee).ok_or(Error::InvalidAmount(requested))?;
        let withdrawal_amount = requested
            .checked_sub(fee_amount)
            .ok_or(Error::InvalidAmount(requested))?;

        // both ledger rows must carry a positive amount
        if !fee_amount.is_positive() || !withdrawal_amount.is_positive() {
            return Err(Error::InvalidAmount(requested));
        }
        Ok(WithdrawalQuote {
            requested,
            withdrawal_amount,
            fee_amount,
        })
    }
}

/// Deposit, transfer and withdrawal as single all-or-nothing units of work.
#[derive(Debug)]
pub struct Engine<L>
where
    L: Ledger,
{
    accounts: Arc<AccountStore>,
    ledger: Arc<L>,
    fees: FeeSchedule,
}

impl<L> Engine<L>
where
    L: Ledger,
{
    pub fn new(accounts: Arc<AccountStore>, ledger: Arc<L>, fees: FeeSchedule) -> Self {
        Self {
            accounts,
            ledger,
            fees,
        }
    }

    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub async fn deposit(
        &self,
        account: AccountId,
        amount: Money,
        description: Option<&str>,
    ) -> Result<Transaction, Error> {
        observe("deposit", self.apply_deposit(account, amount, description).await)
    }

    pub async fn transfer(
        &self,
        sender: AccountId,
        receiver_lookup_key: &str,
        amount: Money,
        description: Option<&str>,
    ) -> Result<Transaction, Error> {
        observe(
            "transfer",
            self.apply_transfer(sender, receiver_lookup_key, amount, description)
                .await,
        )
    }

    /// The caller must already have consumed a withdrawal confirmation code.
    pub async fn withdraw(
        &self,
        account: AccountId,
        requested: Money,
        description: Option<&str>,
    ) -> Result<WithdrawalReceipt, Error> {
        observe(
            "withdraw",
            self.apply_withdrawal(account, requested, description).await,
        )
    }

    fn validate_amount(amount: Money) -> Result<(), Error> {
        if !amount.is_positive() {
            return Err(Error::InvalidAmount(amount));
        }
        Ok(())
    }

    fn ensure_covers(account: AccountId, available: Money, requested: Money) -> Result<(), Error> {
        if available < requested {
            return Err(Error::InsufficientBalance {
                account,
                available,
                requested,
            });
        }
        Ok(())
    }

    fn negate(account: AccountId, amount: Money) -> Result<Money, Error> {
        amount.checked_neg().ok_or(Error::BalanceOverflow(account))
    }

    async fn apply_deposit(
        &self,
        account: AccountId,
        amount: Money,
        description: Option<&str>,
    ) -> Result<Transaction, Error> {
        let mut uow = self.accounts.begin(&[account]).await?;
        self.accounts.check_operable(uow.account(account)?)?;
        Self::validate_amount(amount)?;

        let entry = NewTransaction {
            reference: self.ledger.next_reference(),
            kind: TransactionKind::Deposit,
            amount,
            sender: account,
            receiver: Some(account),
            description: description.unwrap_or("Deposit").to_string(),
            status: TransactionStatus::Completed,
        };

        let balance = uow.apply_delta(account, amount)?;
        let mut written = self.ledger.record(vec![entry])?;
        uow.commit();

        let transaction = written
            .pop()
            .ok_or_else(|| Error::Integrity("ledger returned no deposit row".to_string()))?;
        info!(
            account = %account,
            amount = %amount,
            balance = %balance,
            reference = %transaction.reference,
            "deposit completed"
        );
        Ok(transaction)
    }

    async fn apply_transfer(
        &self,
        sender: AccountId,
        receiver_lookup_key: &str,
        amount: Money,
        description: Option<&str>,
    ) -> Result<Transaction, Error> {
        // Resolved up front so both accounts can be locked in id order; a
        // resolution failure is only reported after the sender-side checks.
        let recipient = self.accounts.resolve_recipient(receiver_lookup_key);

        let mut ids = vec![sender];
        if let Ok(receiver) = &recipient {
            ids.push(*receiver);
        }
        let mut uow = self.accounts.begin(&ids).await?;

        self.accounts.check_operable(uow.account(sender)?)?;
        Self::validate_amount(amount)?;
        Self::ensure_covers(sender, uow.account(sender)?.balance, amount)?;

        let receiver = recipient?;
        if receiver == sender {
            return Err(Error::SelfTransferForbidden(sender));
        }
        if uow.account(receiver)?.is_suspended {
            return Err(Error::RecipientSuspended(receiver));
        }

        let entry = NewTransaction {
            reference: self.ledger.next_reference(),
            kind: TransactionKind::Transfer,
            amount,
            sender,
            receiver: Some(receiver),
            description: description.unwrap_or("Transfer").to_string(),
            status: TransactionStatus::Completed,
        };

        uow.apply_delta(sender, Self::negate(sender, amount)?)?;
        uow.apply_delta(receiver, amount)?;
        let mut written = self.ledger.record(vec![entry])?;
        uow.commit();

        let transaction = written
            .pop()
            .ok_or_else(|| Error::Integrity("ledger returned no transfer row".to_string()))?;
        info!(
            sender = %sender,
            receiver = %receiver,
            amount = %amount,
            reference = %transaction.reference,
            "transfer completed"
        );
        Ok(transaction)
    }

    async fn apply_withdrawal(
        &self,
        account: AccountId,
        requested: Money,
        description: Option<&str>,
    ) -> Result<WithdrawalReceipt, Error> {
        let platform = self.accounts.get_platform_account();

        let mut ids = vec![account];
        if let Ok(platform) = &platform {
            ids.push(*platform);
        }
        let mut uow = self.accounts.begin(&ids).await?;

        self.accounts.check_operable(uow.account(account)?)?;
        Self::validate_amount(requested)?;
        Self::ensure_covers(account, uow.account(account)?.balance, requested)?;

        let quote = self.fees.quote(requested)?;
        let platform = platform?;

        let description = description.unwrap_or("Withdrawal");
        let entries = vec![
            NewTransaction {
                reference: self.ledger.next_reference(),
                kind: TransactionKind::Withdrawal,
                amount: quote.withdrawal_amount,
                sender: account,
                receiver: None,
                description: format!("{} - amount withdrawn", description),
                status: TransactionStatus::Completed,
            },
            NewTransaction {
                reference: self.ledger.next_reference(),
                kind: TransactionKind::Fee,
                amount: quote.fee_amount,
                sender: account,
                receiver: Some(platform),
                description: format!(
                    "{} - platform fee ({}%)",
                    description,
                    self.fees.percentage()
                ),
                status: TransactionStatus::Completed,
            },
        ];

        let balance = uow.apply_delta(account, Self::negate(account, requested)?)?;
        uow.apply_delta(platform, quote.fee_amount)?;
        let written = self.ledger.record(entries)?;
        uow.commit();

        let [withdrawal, fee] = <[Transaction; 2]>::try_from(written).map_err(|rows| {
            Error::Integrity(format!(
                "ledger returned {} rows for a withdrawal",
                rows.len()
            ))
        })?;
        info!(
            account = %account,
            requested = %requested,
            withdrawn = %quote.withdrawal_amount,
            fee = %quote.fee_amount,
            balance = %balance,
            reference = %withdrawal.reference,
            "withdrawal completed"
        );
        Ok(WithdrawalReceipt {
            withdrawal_amount: quote.withdrawal_amount,
            fee_amount: quote.fee_amount,
            withdrawal,
            fee,
        })
    }
}

/// Logs a failed operation at the severity its class deserves.
fn observe<T>(operation: &'static str, result: Result<T, Error>) -> Result<T, Error> {
    if let Err(e) = &result {
        match e.class() {
            ErrorClass::Integrity | ErrorClass::Infrastructure => {
                error!(operation, error = %e, "operation aborted")
            }
            ErrorClass::Rejected => warn!(operation, error = %e, "operation rejected"),
            ErrorClass::Validation => debug!(operation, error = %e, "operation refused"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_percent() -> FeeSchedule {
        FeeSchedule::new(Decimal::new(2, 0))
    }

    #[test]
    fn quote_for_ten_thousand() {
        let quote = two_percent()
            .quote(Money::from_major(10_000).unwrap())
            .unwrap();
        assert_eq!(quote.withdrawal_amount, Money::from_major(9_800).unwrap());
        assert_eq!(quote.fee_amount, Money::from_major(200).unwrap());
    }

    #[test]
    fn quote_rounds_half_to_even() {
        // 0.75 * 2% = 0.015 -> 0.02
        let quote = two_percent().quote(Money(75)).unwrap();
        assert_eq!(quote.fee_amount, Money(2));
        assert_eq!(quote.withdrawal_amount, Money(73));
        // 1.25 * 2% = 0.025 -> 0.02
        let quote = two_percent().quote(Money(125)).unwrap();
        assert_eq!(quote.fee_amount, Money(2));
    }

    #[test]
    fn quote_refuses_amounts_with_zero_fee() {
        assert!(matches!(
            two_percent().quote(Money(25)),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            two_percent().quote(Money::ZERO),
            Err(Error::InvalidAmount(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: fee + net always equals the requested amount exactly.
        #[test]
        fn withdrawal_identity_holds(
            minor in 1i64..10_000_000_000i64,
            basis_points in 1i64..9_999i64,
        ) {
            let fees = FeeSchedule::new(Decimal::new(basis_points, 2));
            if let Ok(quote) = fees.quote(Money(minor)) {
                prop_assert_eq!(
                    quote.withdrawal_amount.checked_add(quote.fee_amount),
                    Some(Money(minor))
                );
                prop_assert!(quote.fee_amount.is_positive());
                prop_assert!(quote.withdrawal_amount.is_positive());
            }
        }
    }
}
