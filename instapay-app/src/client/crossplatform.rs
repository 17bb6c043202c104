use async_trait::async_trait;
use instapay_core::qr::QrImage;

use crate::{error::InstapayError, http::CrossPlatformHttpClient};

use super::QrImageLoader;

#[async_trait(?Send)]
impl QrImageLoader for CrossPlatformHttpClient {
    async fn load(&self, image: &QrImage) -> Result<Vec<u8>, InstapayError> {
        match image {
            QrImage::Remote(url) => self.get_image(url).await,
            QrImage::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}
