//! SMTP alert transport

use super::{Alert, Notifier, NotifyError};
use crate::config::EmailConfig;
use crate::system_info::SystemInfo;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends one plain-text email per recipient
pub struct SmtpNotifier {
    from: Mailbox,
    recipients: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| {
            NotifyError(format!("invalid address '{}': {}", address, e))
        })
}

impl SmtpNotifier {
    /// Build a transport from `[email]` settings
    ///
    /// Returns `Ok(None)` when email delivery is not enabled.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, NotifyError> {
        if !config.is_enabled() {
            return Ok(None);
        }

        let server = config
            .smtp_server
            .as_deref()
            .ok_or_else(|| NotifyError("email.smtp_server is not set".to_string()))?;
        let sender = config
            .sender_email
            .as_deref()
            .ok_or_else(|| NotifyError("email.sender_email is not set".to_string()))?;
        let password = config.sender_password.clone().unwrap_or_default();

        let from = parse_mailbox(sender)?;
        let recipients = config
            .recipient_emails
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;

        let builder = if config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
                .map_err(|e| NotifyError(format!("invalid SMTP relay '{}': {}", server, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(sender.to_string(), password))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Some(Self {
            from,
            recipients,
            transport,
        }))
    }

    fn message(
        &self,
        to: &Mailbox,
        alert: &Alert,
        system: &SystemInfo,
    ) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body(system))
            .map_err(|e| NotifyError(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), NotifyError> {
        for recipient in &self.recipients {
            let email = self.message(recipient, alert, system)?;
            self.transport
                .send(email)
                .await
                .map_err(|e| NotifyError(format!("SMTP send to {} failed: {}", recipient, e)))?;
        }

        tracing::debug!(
            service = %alert.service,
            recipients = self.recipients.len(),
            "SMTP alert sent"
        );
        Ok(())
    }
}
