//! Outbound email.
//!
//! Delivery is fire-and-forget: [`dispatch`] makes one attempt on a detached
//! task and only logs the outcome.

mod smtp;
mod templates;

pub use smtp::SmtpMailer;
pub use templates::verification_email;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("failed to send email: {0}")]
    Send(String),
    #[error("invalid transport configuration: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// One delivery attempt, no retry.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Hands `mail` to a background task. Callers must not depend on the result.
pub fn dispatch(mailer: Arc<dyn Mailer>, mail: OutgoingMail) -> JoinHandle<()> {
    tokio::spawn(async move {
        match mailer.send(&mail).await {
            Ok(()) => info!(to = %mail.to, subject = %mail.subject, "email sent"),
            Err(e) => error!(error = %e, to = %mail.to, "email delivery failed"),
        }
    })
}
