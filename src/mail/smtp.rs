//! SMTP delivery through a pooled `lettre` transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use super::{MailError, Mailer, OutgoingMail};
use crate::config::MailConfig;

/// Implicit TLS port; every other port negotiates STARTTLS.
const SMTPS_PORT: u16 = 465;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport })
    }

    /// Probes the relay once. Only logs; an unreachable relay does not stop startup.
    pub async fn probe(&self) {
        match self.transport.test_connection().await {
            Ok(true) => info!("smtp relay reachable"),
            Ok(false) => warn!("smtp relay did not accept the connection"),
            Err(e) => warn!(error = %e, "smtp relay probe failed"),
        }
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

pub(super) fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(mail.html.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(port: u16) -> MailConfig {
        MailConfig {
            host: "localhost".into(),
            port,
            username: "user".into(),
            password: "pass".into(),
        }
    }

    // The pooled transport spawns onto the runtime when dropped.
    #[tokio::test]
    async fn builds_for_implicit_tls_and_starttls() {
        assert!(SmtpMailer::new(&config(465)).is_ok());
        assert!(SmtpMailer::new(&config(587)).is_ok());
    }

    #[test]
    fn rejects_bad_recipient() {
        let mail = OutgoingMail {
            from: "noreply@example.com".into(),
            to: "not-an-address".into(),
            subject: "s".into(),
            html: "<p></p>".into(),
        };
        assert!(matches!(
            build_message(&mail),
            Err(MailError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn builds_html_message() {
        let mail = OutgoingMail {
            from: "noreply@example.com".into(),
            to: "ann@x.com".into(),
            subject: "Verify".into(),
            html: "<p>hello</p>".into(),
        };
        let message = build_message(&mail).expect("message");
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Verify"));
        assert!(raw.contains("text/html"));
    }
}
