use thiserror::Error;

use crate::amount::AmountError;

#[derive(Error, Debug)]
pub enum InstapayCoreError {
    #[error("{0}")]
    Amount(#[from] AmountError),

    #[error("Invalid payee: {0}")]
    InvalidPayee(String),

    #[error("Invalid payment uri: {0}")]
    InvalidUri(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("QR error {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("Image error {0}")]
    Image(#[from] image::ImageError),

    #[error("Serde error {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid timestamp {0}")]
    Timestamp(#[from] chrono::ParseError),
}
