//! Shareable payment card.
//!
//! The card is composed on an offscreen canvas that is never shown: a title, the QR code in a
//! dark frame, the amount and the payee. Composition only starts once the QR image has been
//! fully loaded and decoded, so a slow endpoint can never produce a card with a blank code.

use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS, GREEK_FONTS, LATIN_FONTS};
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use instapay_core::{format::format_inr, primitives::PaymentRequest, qr::QrImage};
use tracing::{debug, instrument};

use crate::{client::QrImageLoader, error::InstapayError};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const NEUTRAL_200: Rgba<u8> = Rgba([229, 229, 229, 255]);
const NEUTRAL_500: Rgba<u8> = Rgba([115, 115, 115, 255]);
const NEUTRAL_800: Rgba<u8> = Rgba([38, 38, 38, 255]);
const NEUTRAL_900: Rgba<u8> = Rgba([23, 23, 23, 255]);

/// Glyphs are 8x8 font pixels.
const GLYPH: u32 = 8;

/// Card geometry in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLayout {
    pub width: u32,
    pub outer_padding: u32,
    pub inner_padding: u32,
    pub gap: u32,
    pub qr_size: u32,
    pub qr_padding: u32,
    pub qr_frame: u32,
    /// device pixels per logical pixel
    pub scale: u32,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            width: 400,
            outer_padding: 16,
            inner_padding: 24,
            gap: 16,
            qr_size: 250,
            qr_padding: 16,
            qr_frame: 4,
            scale: 2,
        }
    }
}

impl CardLayout {
    /// Largest supported pixel density.
    pub const MAX_SCALE: u32 = 4;

    fn content_width(&self) -> u32 {
        self.width - 2 * (self.outer_padding + 1 + self.inner_padding)
    }

    fn qr_box(&self) -> u32 {
        self.qr_size + 2 * (self.qr_padding + self.qr_frame)
    }
}

/// PNG bytes of a rasterized card plus its device pixel size.
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CardRenderer {
    layout: CardLayout,
}

impl CardRenderer {
    pub const fn new(layout: CardLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    #[instrument(level = "debug", skip_all, fields(amount = %request.amount()))]
    pub async fn render<C: QrImageLoader>(
        &self,
        loader: &C,
        image: &QrImage,
        request: &PaymentRequest,
    ) -> Result<RenderedCard, InstapayError> {
        let bytes = loader.load(image).await.map_err(prepare_failed)?;
        let qr = image::load_from_memory(&bytes)
            .map_err(|e| InstapayError::SharePreparation(e.to_string()))?;
        if qr.width() == 0 || qr.height() == 0 {
            return Err(InstapayError::SharePreparation(
                "qr image is empty".to_owned(),
            ));
        }

        let canvas = self.compose(&qr, request)?;
        let (width, height) = canvas.dimensions();

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| InstapayError::SharePreparation(e.to_string()))?;
        debug!("rasterized card {}x{} ({} bytes)", width, height, png.len());

        Ok(RenderedCard { png, width, height })
    }

    fn compose(
        &self,
        qr: &DynamicImage,
        request: &PaymentRequest,
    ) -> Result<RgbaImage, InstapayError> {
        let l = self.layout;
        if l.scale == 0 || l.scale > CardLayout::MAX_SCALE {
            return Err(InstapayError::SharePreparation(format!(
                "card scale must be between 1 and {}, got {}",
                CardLayout::MAX_SCALE,
                l.scale
            )));
        }
        let content = l.content_width();
        let amount = format_inr(&request.amount());
        let amount_px = fit_font_px(&amount, content, 5);
        let payee = payee_label(request);
        let payee_px = fit_font_px(payee, content, 2);

        let height = 2 * (l.outer_padding + 1 + l.inner_padding)
            + 3 * GLYPH
            + l.gap
            + l.qr_box()
            + l.gap
            + 2 * GLYPH
            + 8
            + amount_px * GLYPH
            + l.gap
            + 1
            + 12
            + 2 * GLYPH
            + 8
            + payee_px.max(1) * GLYPH;

        let mut canvas = Canvas::new(l.width, height, l.scale)?;
        let center = l.width / 2;

        // panel border
        let panel_x = l.outer_padding;
        let panel_w = l.width - 2 * l.outer_padding;
        let panel_h = height - 2 * l.outer_padding;
        canvas.fill(panel_x, l.outer_padding, panel_w, panel_h, NEUTRAL_200);
        canvas.fill(panel_x + 1, l.outer_padding + 1, panel_w - 2, panel_h - 2, WHITE);

        let mut y = l.outer_padding + 1 + l.inner_padding;
        canvas.text_centered("Scan & Pay", center, y, 3, NEUTRAL_800);
        y += 3 * GLYPH + l.gap;

        let box_x = center - l.qr_box() / 2;
        canvas.fill(box_x, y, l.qr_box(), l.qr_box(), NEUTRAL_800);
        canvas.fill(
            box_x + l.qr_frame,
            y + l.qr_frame,
            l.qr_box() - 2 * l.qr_frame,
            l.qr_box() - 2 * l.qr_frame,
            WHITE,
        );
        canvas.image(
            qr,
            box_x + l.qr_frame + l.qr_padding,
            y + l.qr_frame + l.qr_padding,
            l.qr_size,
        );
        y += l.qr_box() + l.gap;

        canvas.text_centered("Amount (INR)", center, y, 2, NEUTRAL_500);
        y += 2 * GLYPH + 8;
        canvas.text_centered(&amount, center, y, amount_px, NEUTRAL_900);
        y += amount_px * GLYPH + l.gap;

        canvas.fill(
            l.outer_padding + 1 + l.inner_padding,
            y,
            content,
            1,
            NEUTRAL_200,
        );
        y += 1 + 12;

        canvas.text_centered("Paying to", center, y, 2, NEUTRAL_500);
        y += 2 * GLYPH + 8;
        let name = truncate_to_fit(payee, content, payee_px.max(1));
        canvas.text_centered(&name, center, y, payee_px.max(1), NEUTRAL_800);

        Ok(canvas.into_inner())
    }
}

fn prepare_failed(e: InstapayError) -> InstapayError {
    match e {
        InstapayError::SharePreparation(_) => e,
        other => InstapayError::SharePreparation(other.to_string()),
    }
}

fn glyph(c: char) -> Option<[u8; 8]> {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| GREEK_FONTS.get(c))
}

fn is_drawable(text: &str) -> bool {
    text.chars().all(|c| glyph(c).is_some())
}

/// Payee line of the card. Names in a script the bitmap font cannot draw fall back to the
/// settlement identifier so the payer still sees who is paid.
fn payee_label(request: &PaymentRequest) -> &str {
    let payee = request.payee();
    if !is_drawable(&payee.name) && is_drawable(&payee.id) {
        debug!("payee name has no glyphs, showing the payee id");
        return &payee.id;
    }
    &payee.name
}

/// Largest font pixel size up to `max` that fits `text` in `width`, at least 1.
fn fit_font_px(text: &str, width: u32, max: u32) -> u32 {
    let chars = text.chars().count().max(1) as u32;
    (1..=max)
        .rev()
        .find(|px| chars * GLYPH * px <= width)
        .unwrap_or(1)
}

fn truncate_to_fit(text: &str, width: u32, px: u32) -> String {
    let max_chars = (width / (GLYPH * px)) as usize;
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{kept}..")
}

/// Offscreen drawing surface addressed in logical pixels.
struct Canvas {
    img: RgbaImage,
    scale: u32,
}

impl Canvas {
    fn new(width: u32, height: u32, scale: u32) -> Result<Self, InstapayError> {
        let (Some(w), Some(h)) = (width.checked_mul(scale), height.checked_mul(scale)) else {
            return Err(InstapayError::SharePreparation(format!(
                "card of {width}x{height} at scale {scale} is too large"
            )));
        };
        Ok(Self {
            img: RgbaImage::from_pixel(w, h, WHITE),
            scale,
        })
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
        let s = self.scale;
        let (max_x, max_y) = self.img.dimensions();
        for py in (y * s)..((y + h) * s).min(max_y) {
            for px in (x * s)..((x + w) * s).min(max_x) {
                self.img.put_pixel(px, py, color);
            }
        }
    }

    fn image(&mut self, source: &DynamicImage, x: u32, y: u32, size: u32) {
        let side = size * self.scale;
        let resized = imageops::resize(
            &source.to_rgba8(),
            side,
            side,
            imageops::FilterType::Nearest,
        );
        imageops::overlay(
            &mut self.img,
            &resized,
            i64::from(x * self.scale),
            i64::from(y * self.scale),
        );
    }

    fn text_centered(&mut self, text: &str, center: u32, y: u32, px: u32, color: Rgba<u8>) {
        let width = text.chars().count() as u32 * GLYPH * px;
        let mut x = center.saturating_sub(width / 2);
        for c in text.chars() {
            let glyph = glyph(c).or_else(|| glyph('?')).unwrap_or([0; 8]);
            for (row, bits) in glyph.iter().enumerate() {
                for bit in 0..GLYPH {
                    if bits & (1 << bit) != 0 {
                        self.fill(x + bit * px, y + row as u32 * px, px, px, color);
                    }
                }
            }
            x += GLYPH * px;
        }
    }

    fn into_inner(self) -> RgbaImage {
        self.img
    }
}

#[cfg(test)]
mod tests {
    use instapay_core::{
        amount::Amount,
        payee::Payee,
        primitives::PaymentRequest,
        qr::{LocalQrRenderer, QrImage},
    };
    use pretty_assertions::assert_eq;

    use super::{fit_font_px, is_drawable, truncate_to_fit, Canvas, CardLayout, CardRenderer};
    use crate::{client::MockQrImageLoader, error::InstapayError};

    fn request() -> anyhow::Result<PaymentRequest> {
        Ok(PaymentRequest::new(
            Amount::from_paise(15_050),
            Payee::new("merchant@upi", "Asha Stores")?,
        ))
    }

    #[tokio::test]
    async fn test_render_waits_for_loaded_qr() -> anyhow::Result<()> {
        let request = request()?;
        let qr = LocalQrRenderer::default().render(&request.uri())?;
        let QrImage::Inline(bytes) = qr.clone() else {
            panic!("expected inline image");
        };

        let mut loader = MockQrImageLoader::new();
        loader
            .expect_load()
            .times(1)
            .returning(move |_| Ok(bytes.clone()));

        let renderer = CardRenderer::default();
        let card = renderer.render(&loader, &qr, &request).await?;
        assert_eq!(800, card.width);

        let decoded = image::load_from_memory(&card.png)?.to_rgba8();
        assert_eq!((card.width, card.height), decoded.dimensions());
        // qr frame starts right below the title
        let layout = CardLayout::default();
        let frame_y = (layout.outer_padding + 1 + layout.inner_padding + 24 + layout.gap + 1) * 2;
        assert_eq!([38, 38, 38, 255], decoded.get_pixel(400, frame_y).0);
        Ok(())
    }

    #[tokio::test]
    async fn test_render_upscales() -> anyhow::Result<()> {
        let request = request()?;
        let qr = LocalQrRenderer::default().render(&request.uri())?;
        let mut loader = MockQrImageLoader::new();
        let QrImage::Inline(bytes) = qr.clone() else {
            panic!("expected inline image");
        };
        loader.expect_load().returning(move |_| Ok(bytes.clone()));

        let single = CardRenderer::new(CardLayout {
            scale: 1,
            ..CardLayout::default()
        })
        .render(&loader, &qr, &request)
        .await?;
        let triple = CardRenderer::new(CardLayout {
            scale: 3,
            ..CardLayout::default()
        })
        .render(&loader, &qr, &request)
        .await?;
        assert_eq!(single.width * 3, triple.width);
        assert_eq!(single.height * 3, triple.height);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_failure_is_preparation_error() -> anyhow::Result<()> {
        let mut loader = MockQrImageLoader::new();
        loader
            .expect_load()
            .returning(|_| Err(InstapayError::NotAnImage("text/html".to_owned())));
        let result = CardRenderer::default()
            .render(&loader, &QrImage::Inline(vec![]), &request()?)
            .await;
        assert!(matches!(result, Err(InstapayError::SharePreparation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_undecodable_image_is_preparation_error() -> anyhow::Result<()> {
        let mut loader = MockQrImageLoader::new();
        loader
            .expect_load()
            .returning(|_| Ok(b"<html>".to_vec()));
        let result = CardRenderer::default()
            .render(&loader, &QrImage::Inline(vec![]), &request()?)
            .await;
        assert!(matches!(result, Err(InstapayError::SharePreparation(_))));
        Ok(())
    }

    async fn render_for(name: &str) -> anyhow::Result<Vec<u8>> {
        let request = request()?;
        let qr = LocalQrRenderer::default().render(&request.uri())?;
        let QrImage::Inline(bytes) = qr.clone() else {
            panic!("expected inline image");
        };
        let mut loader = MockQrImageLoader::new();
        loader.expect_load().returning(move |_| Ok(bytes.clone()));

        let named = PaymentRequest::with_timestamp(
            request.amount(),
            Payee::new("merchant@upi", name)?,
            *request.created_at(),
        );
        let card = CardRenderer::default().render(&loader, &qr, &named).await?;
        Ok(card.png)
    }

    #[tokio::test]
    async fn test_accented_payee_is_drawn() -> anyhow::Result<()> {
        assert!(is_drawable("José Müller"));
        assert_ne!(render_for("José").await?, render_for("Jos?").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_undrawable_payee_falls_back_to_id() -> anyhow::Result<()> {
        assert!(!is_drawable("आशा"));
        let devanagari = render_for("आशा").await?;
        assert_ne!(devanagari, render_for("???").await?);
        assert_eq!(devanagari, render_for("मीरा").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_scale_is_preparation_error() -> anyhow::Result<()> {
        let mut loader = MockQrImageLoader::new();
        let request = request()?;
        let qr = LocalQrRenderer::default().render(&request.uri())?;
        let QrImage::Inline(bytes) = qr.clone() else {
            panic!("expected inline image");
        };
        loader.expect_load().returning(move |_| Ok(bytes.clone()));

        for scale in [0, CardLayout::MAX_SCALE + 1, 20_000_000] {
            let result = CardRenderer::new(CardLayout {
                scale,
                ..CardLayout::default()
            })
            .render(&loader, &qr, &request)
            .await;
            assert!(matches!(result, Err(InstapayError::SharePreparation(_))));
        }
        assert!(Canvas::new(400, 1_000, u32::MAX).is_err());
        Ok(())
    }

    #[test]
    fn test_text_fitting() {
        assert_eq!(3, fit_font_px("1,00,000.00", 304, 5));
        assert_eq!(1, fit_font_px(&"x".repeat(100), 304, 5));
        assert_eq!("abcdef..", truncate_to_fit(&"abcdefghijkl".repeat(10), 64, 1));
        assert_eq!("short", truncate_to_fit("short", 304, 2));
    }
}
