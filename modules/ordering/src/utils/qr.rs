use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("failed to encode qr code: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Turns payment content into an image payload clients can display directly.
pub trait QrRenderer: Send + Sync + 'static {
    fn render(&self, content: &str) -> Result<String, QrError>;
}

/// SVG rendering wrapped in a `data:image/svg+xml;base64,` URL.
#[derive(Debug, Clone, Copy)]
pub struct SvgQrRenderer {
    pub min_dimension: u32,
}

impl Default for SvgQrRenderer {
    fn default() -> Self {
        Self { min_dimension: 240 }
    }
}

impl QrRenderer for SvgQrRenderer {
    fn render(&self, content: &str) -> Result<String, QrError> {
        let code = QrCode::new(content.as_bytes())?;
        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .quiet_zone(true)
            .build();
        Ok(format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(image.as_bytes())
        ))
    }
}

/// Text encoded in a payment QR code.
pub fn payment_content(
    qr_reference: &str,
    amount: rust_decimal::Decimal,
    order_number: &str,
) -> String {
    format!("PAGO|{qr_reference}|Bs.{amount}|{order_number}")
}
