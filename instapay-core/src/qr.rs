//! Mapping a payment link to a QR image reference.
//!
//! [`QrImageResolver`] only builds a reference to an external rendering endpoint; fetching the
//! bytes is the loader's job. [`LocalQrRenderer`] is the offline alternative that renders the
//! image in-process.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{render::unicode, QrCode};
use tracing::debug;
use url::Url;

use crate::{error::InstapayCoreError, uri::encode_component, uri::PaymentUri};

pub const DEFAULT_QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrRenderOptions {
    /// edge length in pixels
    pub size: u32,
    /// quiet zone in modules
    pub quiet_zone: u32,
    /// extra margin in pixels
    pub margin: u32,
}

impl Default for QrRenderOptions {
    fn default() -> Self {
        Self {
            size: 300,
            quiet_zone: 1,
            margin: 10,
        }
    }
}

/// A QR image valid for a single payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrImage {
    Remote(Url),
    Inline(Vec<u8>),
}

impl QrImage {
    pub fn describe(&self) -> String {
        match self {
            Self::Remote(url) => url.to_string(),
            Self::Inline(bytes) => format!("inline png ({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QrImageResolver {
    endpoint: Url,
    options: QrRenderOptions,
}

impl QrImageResolver {
    pub const fn new(endpoint: Url, options: QrRenderOptions) -> Self {
        Self { endpoint, options }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn options(&self) -> &QrRenderOptions {
        &self.options
    }

    pub fn resolve(&self, uri: &PaymentUri) -> QrImage {
        let QrRenderOptions {
            size,
            quiet_zone,
            margin,
        } = self.options;
        let params = format!(
            "size={size}x{size}&data={}&qzone={quiet_zone}&margin={margin}",
            encode_component(&uri.to_uri_string())
        );
        let mut url = self.endpoint.clone();
        // keep parameters already on the endpoint, such as an api key
        match self.endpoint.query().filter(|q| !q.is_empty()) {
            Some(existing) => url.set_query(Some(&format!("{existing}&{params}"))),
            None => url.set_query(Some(&params)),
        }
        debug!("resolved qr image: {}", url);
        QrImage::Remote(url)
    }
}

impl Default for QrImageResolver {
    fn default() -> Self {
        Self::new(
            Url::parse(DEFAULT_QR_ENDPOINT).expect("default endpoint is a valid url"),
            QrRenderOptions::default(),
        )
    }
}

/// Renders QR codes in-process instead of calling the rendering endpoint.
#[derive(Debug, Clone, Default)]
pub struct LocalQrRenderer {
    options: QrRenderOptions,
}

impl LocalQrRenderer {
    pub const fn new(options: QrRenderOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, uri: &PaymentUri) -> Result<QrImage, InstapayCoreError> {
        let code = QrCode::new(uri.to_uri_string().as_bytes())?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(self.options.quiet_zone > 0)
            .min_dimensions(self.options.size, self.options.size)
            .build();

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(QrImage::Inline(bytes))
    }
}

pub fn render_terminal(uri: &PaymentUri) -> Result<String, InstapayCoreError> {
    Ok(QrCode::new(uri.to_uri_string().as_bytes())?
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}
