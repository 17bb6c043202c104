use serde::{Deserialize, Serialize};

use crate::error::InstapayCoreError;

/// The static receiving party. Supplied by configuration, never by the payer.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Payee {
    /// settlement identifier (VPA or mobile number)
    pub id: String,
    pub name: String,
}

impl Payee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, InstapayCoreError> {
        let id = id.into().trim().to_owned();
        let name = name.into().trim().to_owned();
        if id.is_empty() {
            return Err(InstapayCoreError::InvalidPayee("settlement id is empty".to_owned()));
        }
        if id.chars().any(|c| c.is_whitespace() || c == '&' || c == '?') {
            return Err(InstapayCoreError::InvalidPayee(format!(
                "settlement id contains reserved characters: {id}"
            )));
        }
        if name.is_empty() {
            return Err(InstapayCoreError::InvalidPayee("name is empty".to_owned()));
        }
        Ok(Self { id, name })
    }

    pub fn note(&self) -> String {
        format!("Payment to {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::Payee;

    #[test]
    fn test_payee_validation() {
        assert!(Payee::new("merchant@upi", "Asha Stores").is_ok());
        assert!(Payee::new("", "Asha Stores").is_err());
        assert!(Payee::new("merchant@upi", "  ").is_err());
        assert!(Payee::new("merchant@upi&am=1", "Asha").is_err());
    }

    #[test]
    fn test_note() -> anyhow::Result<()> {
        let payee = Payee::new("merchant@upi", "Asha Stores")?;
        assert_eq!("Payment to Asha Stores", payee.note());
        Ok(())
    }
}
