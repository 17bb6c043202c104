//! UPI deep-link generation and parsing.
//!
//! ## URI Format
//!
//! ```text
//! upi://pay?pa=merchant@upi&pn=Asha%20Stores&am=150.00&cu=INR&tn=Payment%20to%20Asha%20Stores
//! ```
//!
//! Name and note are percent-encoded with the same unreserved set as JavaScript's
//! `encodeURIComponent`, so links are byte-identical to the ones payment apps already accept.

use std::{fmt::Display, str::FromStr};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{amount::Amount, error::InstapayCoreError, payee::Payee};

pub const UPI_PREFIX: &str = "upi://pay?";
pub const CURRENCY: &str = "INR";

/// `encodeURIComponent` leaves `A-Z a-z 0-9 - _ . ! ~ * ' ( )` untouched.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUri {
    payee: Payee,
    amount: Amount,
    note: String,
}

impl PaymentUri {
    pub fn new(payee: &Payee, amount: Amount) -> Self {
        Self {
            payee: payee.clone(),
            amount,
            note: payee.note(),
        }
    }

    pub fn payee(&self) -> &Payee {
        &self.payee
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn to_uri_string(&self) -> String {
        format!(
            "{UPI_PREFIX}pa={}&pn={}&am={}&cu={CURRENCY}&tn={}",
            self.payee.id,
            encode_component(&self.payee.name),
            self.amount,
            encode_component(&self.note),
        )
    }
}

impl Display for PaymentUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri_string())
    }
}

impl FromStr for PaymentUri {
    type Err = InstapayCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let query = s
            .strip_prefix(UPI_PREFIX)
            .ok_or_else(|| InstapayCoreError::InvalidUri(format!("not a upi pay link: {s}")))?;

        let mut id = None;
        let mut name = None;
        let mut amount = None;
        let mut note = None;

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| InstapayCoreError::InvalidUri(format!("malformed pair: {pair}")))?;
            let value = percent_decode_str(value)
                .decode_utf8()
                .map_err(|e| InstapayCoreError::InvalidUri(e.to_string()))?
                .into_owned();
            match key {
                "pa" => id = Some(value),
                "pn" => name = Some(value),
                "am" => amount = Some(value.parse::<Amount>()?),
                "tn" => note = Some(value),
                "cu" if value != CURRENCY => {
                    return Err(InstapayCoreError::InvalidUri(format!(
                        "unsupported currency: {value}"
                    )))
                }
                _ => {}
            }
        }

        let payee = Payee::new(
            id.ok_or(InstapayCoreError::MissingParameter("pa"))?,
            name.ok_or(InstapayCoreError::MissingParameter("pn"))?,
        )?;
        let amount = amount.ok_or(InstapayCoreError::MissingParameter("am"))?;
        let note = note.unwrap_or_else(|| payee.note());

        Ok(Self {
            payee,
            amount,
            note,
        })
    }
}
