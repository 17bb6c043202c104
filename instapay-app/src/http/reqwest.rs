use reqwest::{header::CONTENT_TYPE, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::error::InstapayError;

use super::CrossPlatformHttpClient;

impl CrossPlatformHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn extract_image_data(response: Response) -> Result<Vec<u8>, InstapayError> {
        match response.status() {
            StatusCode::OK => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                if !content_type.starts_with("image/") {
                    return Err(InstapayError::NotAnImage(if content_type.is_empty() {
                        "missing content type".to_owned()
                    } else {
                        content_type
                    }));
                }
                Ok(response.bytes().await?.to_vec())
            }
            status => Err(InstapayError::QrStatus(status)),
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn get_image(&self, url: &Url) -> Result<Vec<u8>, InstapayError> {
        let resp = self.client.get(url.clone()).send().await?;
        let bytes = Self::extract_image_data(resp).await?;
        debug!("fetched {} bytes", bytes.len());
        Ok(bytes)
    }
}
