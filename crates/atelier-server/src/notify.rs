//! Delivery-notification worker.
//!
//! Consumes [`PlatformEvent`]s from the bus and emails buyers their
//! download links when an order is paid. Every failure here is logged
//! and swallowed: the money has already moved, so nothing on this path
//! may propagate back into the payment confirmation.

use tokio::sync::broadcast;

use crate::config::SmtpConfig;
use crate::events::{PlatformEvent, ORDER_PAID};

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// Sends delivery emails via SMTP.
pub struct DeliveryMailer {
    config: SmtpConfig,
}

impl DeliveryMailer {
    /// Create a mailer with the given configuration.
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Send a delivery email for a paid order.
    pub async fn deliver(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
                .port(self.config.port);

        if let (Some(user), Some(pass)) = (&self.config.user, &self.config.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, "Delivery email sent");
        Ok(())
    }
}

/// Notification worker consuming the event bus.
pub struct Notifier {
    mailer: Option<DeliveryMailer>,
}

impl Notifier {
    /// Create a worker; without SMTP configuration it only logs events.
    pub fn new(smtp: Option<SmtpConfig>) -> Self {
        Self {
            mailer: smtp.map(DeliveryMailer::new),
        }
    }

    /// Run until the bus is closed.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification worker lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::info!("Notification worker stopped");
    }

    async fn handle(&self, event: PlatformEvent) {
        if event.event_type != ORDER_PAID {
            return;
        }

        let Some(buyer_email) = event.payload["buyerEmail"].as_str() else {
            tracing::warn!(event_type = %event.event_type, "Paid-order event without buyerEmail");
            return;
        };

        let Some(mailer) = &self.mailer else {
            tracing::info!(
                order_no = event.payload["orderNo"].as_str().unwrap_or_default(),
                "SMTP not configured; skipping delivery email"
            );
            return;
        };

        let subject = format!(
            "Your download is ready: {}",
            event.payload["workTitle"].as_str().unwrap_or("your purchase")
        );
        let body = render_delivery_body(&event.payload);

        // Fire-and-forget by contract: a failed email never fails the
        // payment that triggered it.
        if let Err(e) = mailer.deliver(buyer_email, &subject, &body).await {
            tracing::warn!(
                to = buyer_email,
                error = %e,
                "Delivery email failed; payment remains confirmed"
            );
        }
    }
}

/// Renders the plain-text delivery email body from an order.paid payload.
fn render_delivery_body(payload: &serde_json::Value) -> String {
    let mut lines = vec![format!(
        "Thanks for your purchase ({}).",
        payload["orderNo"].as_str().unwrap_or("order")
    )];
    if let Some(version) = payload["version"].as_str() {
        lines.push(format!("Version: {}", version));
    }
    if let Some(figma) = payload["figmaUrl"].as_str() {
        lines.push(format!("Figma source: {}", figma));
    }
    if let Some(delivery) = payload["deliveryUrl"].as_str() {
        lines.push(format!("Download: {}", delivery));
    }
    lines.push("Keep this email; the links stay valid for your version.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_body_includes_links() {
        let body = render_delivery_body(&json!({
            "orderNo": "ATL-20260101-DEADBEEF",
            "version": "2.0",
            "figmaUrl": "https://figma.com/file/abc",
            "deliveryUrl": "https://cdn.example/v2.zip"
        }));
        assert!(body.contains("ATL-20260101-DEADBEEF"));
        assert!(body.contains("Version: 2.0"));
        assert!(body.contains("https://figma.com/file/abc"));
        assert!(body.contains("https://cdn.example/v2.zip"));
    }

    #[test]
    fn test_render_body_without_links() {
        let body = render_delivery_body(&json!({ "orderNo": "ATL-1" }));
        assert!(body.contains("ATL-1"));
        assert!(!body.contains("Figma source"));
        assert!(!body.contains("Download:"));
    }

    #[tokio::test]
    async fn test_unrelated_events_are_ignored() {
        // A notifier without SMTP must consume arbitrary events quietly.
        let notifier = Notifier::new(None);
        notifier
            .handle(PlatformEvent::new("work.created"))
            .await;
    }

    #[tokio::test]
    async fn test_paid_event_without_email_is_swallowed() {
        let notifier = Notifier::new(None);
        notifier
            .handle(PlatformEvent::new(ORDER_PAID).with_payload(json!({"orderNo": "ATL-1"})))
            .await;
    }

    #[test]
    fn test_email_error_display() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
