pub mod smtp;

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// Stands in when no SMTP server is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, subject = %subject, "email delivery disabled, not sent");
        Ok(())
    }
}

pub const BOOKING_SUBJECT: &str = "Appointment Request Confirmation";

pub fn booking_email_body(consent_form_url: &str, appointment_id: &Uuid, client_id: &Uuid) -> String {
    format!(
        r#"<p>Your appointment request has been successfully created! Thank you for trusting us with your skin :)</p>
<p>If you have not done so already, please fill out a consent form <a href="{consent_form_url}?appointmentId={appointment_id}&clientId={client_id}">here.</a></p>"#
    )
}

/// Sends the booking confirmation. Failures are logged and reported as
/// `false`; they never affect the booking itself.
pub async fn send_booking_confirmation(
    notifier: &dyn Notifier,
    consent_form_url: &str,
    to: &str,
    appointment_id: &Uuid,
    client_id: &Uuid,
) -> bool {
    let body = booking_email_body(consent_form_url, appointment_id, client_id);
    match notifier.send(to, BOOKING_SUBJECT, &body).await {
        Ok(()) => {
            tracing::info!(to = %to, appointment_id = %appointment_id, "booking confirmation sent");
            true
        }
        Err(e) => {
            tracing::error!(to = %to, error = %e, "failed to send booking confirmation");
            false
        }
    }
}
