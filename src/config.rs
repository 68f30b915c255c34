use std::{fs, path::Path, time::Duration as StdDuration};

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CodePurpose, Error};

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    pub code_length: usize,
    pub activation_minutes: i64,
    pub withdrawal_minutes: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            activation_minutes: 10,
            withdrawal_minutes: 5,
        }
    }
}

impl OtpConfig {
    pub fn lifetime(&self, purpose: CodePurpose) -> Duration {
        match purpose {
            CodePurpose::AccountActivation => Duration::minutes(self.activation_minutes),
            CodePurpose::WithdrawalConfirmation => Duration::minutes(self.withdrawal_minutes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub username: String,
    pub email: String,
    pub phone_number: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            username: "platform".to_string(),
            email: "platform@wallet.local".to_string(),
            phone_number: "+000000000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Withdrawal fee, in percent of the requested amount.
    pub fee_percentage: Decimal,
    pub otp: OtpConfig,
    pub pending_withdrawal_minutes: i64,
    pub lock_timeout_ms: u64,
    pub platform: PlatformConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fee_percentage: Decimal::new(2, 0),
            otp: OtpConfig::default(),
            pending_withdrawal_minutes: 10,
            lock_timeout_ms: 2_000,
            platform: PlatformConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Reads a JSON file when given, otherwise uses defaults. Always validated.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.fee_percentage <= Decimal::ZERO || self.fee_percentage >= Decimal::ONE_HUNDRED {
            return Err(Error::Config(format!(
                "fee_percentage must be within (0, 100), got {}",
                self.fee_percentage
            )));
        }
        if !(4..=10).contains(&self.otp.code_length) {
            return Err(Error::Config(format!(
                "otp.code_length must be within 4..=10, got {}",
                self.otp.code_length
            )));
        }
        if self.otp.activation_minutes <= 0 || self.otp.withdrawal_minutes <= 0 {
            return Err(Error::Config("otp lifetimes must be positive".to_string()));
        }
        if self.pending_withdrawal_minutes <= 0 {
            return Err(Error::Config(
                "pending_withdrawal_minutes must be positive".to_string(),
            ));
        }
        if self.lock_timeout_ms == 0 {
            return Err(Error::Config("lock_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.lock_timeout_ms)
    }

    pub fn pending_withdrawal_lifetime(&self) -> Duration {
        Duration::minutes(self.pending_withdrawal_minutes)
    }
}
