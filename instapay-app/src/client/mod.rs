pub mod crossplatform;

use async_trait::async_trait;

use instapay_core::qr::QrImage;
#[cfg(test)]
use mockall::automock;

use crate::error::InstapayError;

/// Turns a QR image reference into encoded image bytes.
///
/// This is the only place a QR reference touches the network, both for display and for the
/// share card.
#[cfg_attr(test, automock)]
#[async_trait(?Send)]
pub trait QrImageLoader {
    async fn load(&self, image: &QrImage) -> Result<Vec<u8>, InstapayError>;
}
