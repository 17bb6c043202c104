//! Amount entry and validation.
//!
//! Raw input goes through two gates: [`is_acceptable_input`] filters keystrokes at the input
//! layer, and [`AmountValidator::validate`] checks the submitted value again before a payment
//! request is created.

use std::{fmt::Display, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

static AMOUNT_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]*\.?[0-9]{0,2}$").expect("amount pattern is valid"));

const PAISE_PER_RUPEE: u64 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Please enter a valid amount.")]
    NotANumber,

    #[error("Amount must be greater than 0.")]
    NotPositive,

    #[error("Amount cannot exceed ₹1,00,000.")]
    ExceedsMaximum,
}

/// A payable amount in INR, stored as whole paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    /// ₹1,00,000.00
    pub const MAX: Self = Self(100_000 * PAISE_PER_RUPEE);

    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    pub const fn paise(&self) -> u64 {
        self.0
    }

    pub const fn whole_rupees(&self) -> u64 {
        self.0 / PAISE_PER_RUPEE
    }

    pub const fn fraction_paise(&self) -> u64 {
        self.0 % PAISE_PER_RUPEE
    }

    pub fn as_rupees(&self) -> f64 {
        self.0 as f64 / PAISE_PER_RUPEE as f64
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.whole_rupees(), self.fraction_paise())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AmountValidator::validate(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_rupees())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rupees = f64::deserialize(deserializer)?;
        if !rupees.is_finite() || rupees < 0.0 {
            return Err(de::Error::custom(format!("invalid amount {rupees}")));
        }
        Ok(Self((rupees * PAISE_PER_RUPEE as f64).round() as u64))
    }
}

/// Input-layer filter: digits with at most one decimal point and two fractional digits.
///
/// The empty string passes so a field can be cleared while typing.
pub fn is_acceptable_input(raw: &str) -> bool {
    AMOUNT_INPUT.is_match(raw)
}

pub struct AmountValidator;

impl AmountValidator {
    pub fn validate(raw: &str) -> Result<Amount, AmountError> {
        let raw = raw.trim();
        if !is_acceptable_input(raw) {
            return Err(AmountError::NotANumber);
        }
        // a blank field reads as zero
        if raw.is_empty() {
            return Err(AmountError::NotPositive);
        }

        let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountError::NotANumber);
        }

        let whole = if whole.is_empty() {
            0
        } else {
            // the filter guarantees digits only, so a parse failure can only be overflow
            whole.parse::<u64>().map_err(|_| AmountError::ExceedsMaximum)?
        };
        let fraction = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| AmountError::NotANumber)? * 10,
            _ => fraction.parse::<u64>().map_err(|_| AmountError::NotANumber)?,
        };

        let paise = whole
            .checked_mul(PAISE_PER_RUPEE)
            .and_then(|p| p.checked_add(fraction))
            .ok_or(AmountError::ExceedsMaximum)?;

        match Amount(paise) {
            amount if amount.paise() == 0 => Err(AmountError::NotPositive),
            amount if amount > Amount::MAX => Err(AmountError::ExceedsMaximum),
            amount => Ok(amount),
        }
    }
}
