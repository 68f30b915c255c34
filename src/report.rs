use std::io::Write;

use crate::bank::Bank;
use crate::domain::{CodeDelivery, Error, Money};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub account: u32,
    pub user: String,
    pub balance: Money,
    pub suspended: bool,
    pub platform: bool,
}

/// End-of-batch view: one line per account, then the ledger totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub lines: Vec<BalanceLine>,
    pub total_fees: Money,
    pub total_volume: Money,
}

impl BalanceReport {
    pub async fn collect<D>(bank: &Bank<D>) -> Result<Self, Error>
    where
        D: CodeDelivery,
    {
        let accounts = bank.accounts();
        let mut lines = Vec::new();
        for account in accounts.accounts().await? {
            let principal = accounts.principal(account.principal)?;
            lines.push(BalanceLine {
                account: account.id.0,
                user: principal.username,
                balance: account.balance,
                suspended: account.is_suspended,
                platform: account.is_platform_account,
            });
        }
        Ok(Self {
            lines,
            total_fees: bank.total_fees()?,
            total_volume: bank.total_volume_completed()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        wtr.write_record(["account", "user", "balance", "suspended", "platform"])?;
        for line in &self.lines {
            wtr.write_record([
                line.account.to_string(),
                line.user.clone(),
                line.balance.to_string(),
                line.suspended.to_string(),
                line.platform.to_string(),
            ])?;
        }
        wtr.write_record(["total_fees".to_string(), self.total_fees.to_string()])?;
        wtr.write_record(["total_volume".to_string(), self.total_volume.to_string()])?;
        wtr.flush()?;
        Ok(())
    }
}
