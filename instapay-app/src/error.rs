use instapay_core::error::InstapayCoreError;
use thiserror::Error;

pub const GENERIC_SHARE_FAILURE: &str = "Could not share the QR code.";

#[derive(Error, Debug)]
pub enum InstapayError {
    #[error("{0}")]
    Core(#[from] InstapayCoreError),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to fetch QR code image. {0}")]
    QrFetch(#[from] reqwest::Error),

    #[error("Failed to fetch QR code image. Status {0}")]
    QrStatus(reqwest::StatusCode),

    #[error("QR endpoint returned a non-image response: {0}")]
    NotAnImage(String),

    #[error("Could not prepare share image: {0}")]
    SharePreparation(String),

    #[error("{0}")]
    ShareFailed(String),

    #[error("No active payment request")]
    NoActiveRequest,

    #[error("{0} is required")]
    MissingComponent(&'static str),

    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Url error {0}")]
    Url(#[from] url::ParseError),
}

impl InstapayError {
    /// Collapses any failure in the share pipeline into a single share failure that carries the
    /// cause's message, or a generic one when the cause has none.
    pub fn into_share_failure(self) -> Self {
        let message = match self {
            Self::ShareFailed(message) => message,
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            Self::ShareFailed(GENERIC_SHARE_FAILURE.to_owned())
        } else {
            Self::ShareFailed(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{InstapayError, GENERIC_SHARE_FAILURE};

    #[test]
    fn test_share_failure_keeps_cause() {
        let err = InstapayError::NotAnImage("text/html".to_owned()).into_share_failure();
        assert_eq!(
            "QR endpoint returned a non-image response: text/html",
            err.to_string()
        );
    }

    #[test]
    fn test_share_failure_generic() {
        let err = InstapayError::ShareFailed(String::new()).into_share_failure();
        assert_eq!(GENERIC_SHARE_FAILURE, err.to_string());
    }
}
