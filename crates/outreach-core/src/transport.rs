use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid recipient address '{0}'")]
    InvalidRecipient(String),

    #[error("send failed: {0}")]
    Send(String),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Outbound mail settings. The credential is passed through opaquely; the
/// core never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub server: String,
    pub port: u16,
    pub sender: String,
    #[serde(skip_serializing)]
    pub credential: String,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// The seam the dispatch engine talks through: one message at a time over an
/// already established session.
pub trait Transport {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// SMTP implementation: STARTTLS relay with one authenticated session
/// verified up front and reused for the whole batch.
pub struct SmtpMailer {
    mailer: lettre::SmtpTransport,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
        let sender: Mailbox = config.sender.parse().map_err(|e| {
            TransportError::Connect(format!("invalid sender address '{}': {e}", config.sender))
        })?;
        let credentials = Credentials::new(config.sender.clone(), config.credential.clone());
        let mailer = lettre::SmtpTransport::starttls_relay(&config.server)
            .map_err(|e| TransportError::Connect(e.to_string()))?
            .port(config.port)
            .credentials(credentials)
            .build();
        // Verify connectivity and auth now so a dead server fails the run
        // before any per-record attempt.
        match mailer.test_connection() {
            Ok(true) => Ok(Self { mailer, sender }),
            Ok(false) => Err(TransportError::Connect(
                "server did not respond".to_string(),
            )),
            Err(e) => Err(TransportError::Connect(e.to_string())),
        }
    }
}

impl Transport for SmtpMailer {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|_| TransportError::InvalidRecipient(to.to_string()))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.mailer
            .send(&message)
            .map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DryRunMailer
// ---------------------------------------------------------------------------

/// Accepts anything with a plausible address and records it instead of
/// sending. Backs `send --dry-run` and tests.
#[derive(Debug, Default)]
pub struct DryRunMailer {
    pub sent: Vec<(String, String)>,
}

impl Transport for DryRunMailer {
    fn send(&mut self, to: &str, subject: &str, _body: &str) -> Result<(), TransportError> {
        if to.trim().is_empty() || !to.contains('@') {
            return Err(TransportError::InvalidRecipient(to.to_string()));
        }
        tracing::info!(to, subject, "dry run, message not sent");
        self.sent.push((to.to_string(), subject.to_string()));
        Ok(())
    }
}
