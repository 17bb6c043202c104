//! Payment requests and the history records derived from them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{amount::Amount, error::InstapayCoreError, payee::Payee, uri::PaymentUri};

/// Renders a timestamp the way `Date.prototype.toISOString` does: millisecond precision, `Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Created once per successful submission and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    amount: Amount,
    created_at: DateTime<Utc>,
    payee: Payee,
}

impl PaymentRequest {
    pub fn new(amount: Amount, payee: Payee) -> Self {
        Self::with_timestamp(amount, payee, Utc::now())
    }

    pub const fn with_timestamp(amount: Amount, payee: Payee, created_at: DateTime<Utc>) -> Self {
        Self {
            amount,
            created_at,
            payee,
        }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn payee(&self) -> &Payee {
        &self.payee
    }

    pub fn uri(&self) -> PaymentUri {
        PaymentUri::new(&self.payee, self.amount)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub amount: Amount,
    pub date: String,
}

impl HistoryEntry {
    pub fn timestamp(&self) -> Result<DateTime<Utc>, InstapayCoreError> {
        Ok(DateTime::parse_from_rfc3339(&self.date)?.with_timezone(&Utc))
    }
}

impl From<&PaymentRequest> for HistoryEntry {
    fn from(request: &PaymentRequest) -> Self {
        let created_at = iso_timestamp(request.created_at());
        Self {
            id: created_at.clone(),
            amount: request.amount(),
            date: created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::{HistoryEntry, PaymentRequest};
    use crate::{amount::Amount, payee::Payee};

    #[test]
    fn test_history_entry_from_request() -> anyhow::Result<()> {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap();
        let request = PaymentRequest::with_timestamp(
            Amount::from_paise(15_050),
            Payee::new("merchant@upi", "Asha Stores")?,
            at,
        );
        let entry = HistoryEntry::from(&request);
        assert_eq!("2024-05-01T10:20:30.000Z", entry.id);
        assert_eq!(entry.id, entry.date);
        assert_eq!(at, entry.timestamp()?);
        Ok(())
    }

    #[test]
    fn test_serialize_history_entry() -> anyhow::Result<()> {
        let entry = HistoryEntry {
            id: "2024-05-01T10:20:30.000Z".to_owned(),
            amount: Amount::from_paise(15_050),
            date: "2024-05-01T10:20:30.000Z".to_owned(),
        };
        assert_eq!(
            r#"{"id":"2024-05-01T10:20:30.000Z","amount":150.5,"date":"2024-05-01T10:20:30.000Z"}"#,
            serde_json::to_string(&entry)?
        );
        Ok(())
    }
}
