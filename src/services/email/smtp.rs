use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::Notifier;

pub struct SmtpNotifier {
    server: String,
    port: u16,
    credentials: Credentials,
    from: String,
}

impl SmtpNotifier {
    pub fn new(
        server: String,
        port: u16,
        username: String,
        password: String,
        from_email: String,
        from_name: String,
    ) -> Self {
        Self {
            server,
            port,
            credentials: Credentials::new(username, password),
            from: format!("{from_name} <{from_email}>"),
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse().context("invalid sender address")?)
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("failed to build email")?;

        let mailer = SmtpTransport::starttls_relay(&self.server)
            .context("failed to configure SMTP relay")?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build();

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .context("email task failed")?
            .context("SMTP server rejected email")?;

        Ok(())
    }
}
