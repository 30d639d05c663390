//! Error types for the payment gateway adapter.

/// Errors surfaced by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum PayError {
    /// HTTP-level failure talking to the gateway (timeout, DNS, TLS).
    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered but refused the request.
    #[error("gateway rejected request: {code}: {message}")]
    Rejected { code: String, message: String },

    /// A notification's signature did not match the shared API key.
    #[error("invalid notification signature")]
    BadSignature,

    /// The gateway payload was missing required fields or unparseable.
    #[error("malformed gateway payload: {0}")]
    Malformed(String),

    /// The payment URI could not be encoded as a QR code.
    #[error("QR encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),
}
