//! QR rendering of payment URIs.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;

use crate::error::PayError;

/// Minimum rendered dimension in pixels.
const MIN_DIMENSIONS: u32 = 240;

/// Renders a payment URI as an SVG image wrapped in a data URL.
///
/// The result can be dropped straight into an `<img src=...>` tag by the
/// checkout page.
pub fn qr_svg_data_url(data: &str) -> Result<String, PayError> {
    let code = QrCode::new(data.as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSIONS, MIN_DIMENSIONS)
        .quiet_zone(true)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        BASE64_STANDARD.encode(image.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_data_url() {
        let url = qr_svg_data_url("weixin://wxpay/bizpayurl?pr=abc123").unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_payload_is_valid_base64_svg() {
        let url = qr_svg_data_url("https://pay.example/order/1").unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let decoded = BASE64_STANDARD.decode(encoded).unwrap();
        let svg_text = String::from_utf8(decoded).unwrap();
        assert!(svg_text.contains("<svg"));
    }

    #[test]
    fn test_different_inputs_differ() {
        let a = qr_svg_data_url("order-a").unwrap();
        let b = qr_svg_data_url("order-b").unwrap();
        assert_ne!(a, b);
    }
}
