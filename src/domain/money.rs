use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point amount held as minor units with two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(pub i64);

impl Money {
    pub const SCALE: i64 = 100; // 2 decimal places
    pub const TARGET_DECIMALS: u32 = 2;
    pub const ZERO: Money = Money(0);

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn as_minor(&self) -> i64 {
        self.0
    }

    /// Whole units, e.g. `Money::from_major(10_000)` is `10000.00`.
    pub fn from_major(units: i64) -> Option<Self> {
        units.checked_mul(Self::SCALE).map(Self)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    pub fn checked_neg(self) -> Option<Money> {
        self.0.checked_neg().map(Money)
    }

    /// Rounds half to even when `scale` exceeds two decimals.
    pub fn from_scaled_i128(value: i128, scale: u32) -> Option<Self> {
        if scale == Self::TARGET_DECIMALS {
            if value < i128::from(i64::MIN) || value > i128::from(i64::MAX) {
                return None;
            }
            return Some(Self(value as i64));
        }
        if scale < Self::TARGET_DECIMALS {
            let diff = Self::TARGET_DECIMALS - scale;
            let factor = 10i128.pow(diff);
            let widened = value.checked_mul(factor)?;
            if widened < i128::from(i64::MIN) || widened > i128::from(i64::MAX) {
                return None;
            }
            return Some(Self(widened as i64));
        }
        // scale > TARGET_DECIMALS: need rounding
        let diff = scale - Self::TARGET_DECIMALS;
        let factor = 10i128.checked_pow(diff)?;
        let div = value / factor; // truncated toward zero
        let rem = value % factor;
        if rem == 0 {
            if div < i128::from(i64::MIN) || div > i128::from(i64::MAX) {
                return None;
            }
            return Some(Self(div as i64));
        }
        let half = factor / 2;
        let abs_rem = rem.abs();
        let mut adjusted = div;
        if abs_rem > half {
            adjusted += if value.is_negative() { -1 } else { 1 };
        } else if abs_rem == half {
            // tie -> bankers (round half to even)
            if div & 1 != 0 {
                adjusted += if value.is_negative() { -1 } else { 1 };
            }
        }
        if adjusted < i128::from(i64::MIN) || adjusted > i128::from(i64::MAX) {
            return None;
        }
        Some(Self(adjusted as i64))
    }

    pub fn from_decimal(value: Decimal) -> Option<Self> {
        Self::from_scaled_i128(value.mantissa(), value.scale())
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, Self::TARGET_DECIMALS)
    }

    pub fn from_decimal_str(s: &str) -> Option<Self> {
        let s = s.trim();

        if s.is_empty() {
            return None;
        }
        let neg = s.starts_with('-');
        let body = s.strip_prefix('-').unwrap_or(s);
        let mut parts = body.split('.');
        let int_part = parts.next()?;
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let int_val: i128 = int_part.parse().ok()?;
        let frac_opt = parts.next();
        if parts.next().is_some() {
            return None;
        }
        let (raw, scale) = match frac_opt {
            Some(frac) if !frac.is_empty() => {
                if !frac.bytes().all(|b| b.is_ascii_digit()) || frac.len() > 18 {
                    return None;
                }
                let scale = frac.len() as u32;
                (
                    int_val
                        .checked_mul(10i128.pow(scale))?
                        .checked_add(frac.parse::<i128>().ok()?)?,
                    scale,
                )
            }
            _ => (int_val, 0),
        };
        let signed = if neg { -raw } else { raw };
        Money::from_scaled_i128(signed, scale)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let minor = self.0;
        let neg = minor < 0;
        let abs = minor.unsigned_abs();
        let int_part = abs / Self::SCALE as u64;
        let frac_part = abs % Self::SCALE as u64;
        if neg {
            write!(f, "-{}.{:02}", int_part, frac_part)
        } else {
            write!(f, "{}.{:02}", int_part, frac_part)
        }
    }
}

impl core::str::FromStr for Money {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_decimal_str(s).ok_or_else(|| format!("Invalid Money format: {}", s))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_decimal_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid Money format: {}", s)))
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
