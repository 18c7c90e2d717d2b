use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};

use super::notifier::{DeliveryError, Notifier};

/// Structure to hold SMTP credentials
#[derive(Serialize, Deserialize, Clone)]
pub struct SmtpCredentials {
    // The email address/username for SMTP authentication
    pub username: String,
    // The password or app-specific password for SMTP
    pub password: String,
    // SMTP server hostname (e.g., smtp.gmail.com)
    pub host: String,
    // SMTP server port (typically 587 for TLS)
    pub port: u16,
}

impl SmtpCredentials {
    /// Function to read credentials from SMTP_USERNAME, SMTP_PASSWORD,
    /// SMTP_HOST and SMTP_PORT (587 when unset)
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("SMTP_USERNAME").ok()?;
        let password = std::env::var("SMTP_PASSWORD").ok()?;
        let host = std::env::var("SMTP_HOST").ok()?;
        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        Some(Self {
            username,
            password,
            host,
            port,
        })
    }
}

/// Notifier that sends messages through an authenticated SMTP relay
pub struct SmtpNotifier {
    credentials: SmtpCredentials,
    sender_name: String,
}

impl SmtpNotifier {
    pub fn new(credentials: SmtpCredentials) -> Self {
        Self {
            credentials,
            sender_name: "Two-To-Enter".to_string(),
        }
    }
}

impl Notifier for SmtpNotifier {
    fn deliver(&self, destination: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let creds = &self.credentials;

        let email = Message::builder()
            .from(
                format!("{} <{}>", self.sender_name, creds.username)
                    .parse()
                    .map_err(|e| DeliveryError::Address(format!("invalid from address: {}", e)))?,
            )
            .to(destination
                .parse()
                .map_err(|e| DeliveryError::Address(format!("invalid to address: {}", e)))?)
            .subject(subject)
            .header(lettre::message::header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DeliveryError::Message(e.to_string()))?;

        let tls_parameters = TlsParameters::builder(creds.host.clone())
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to build TLS parameters: {}", e)))?;

        let mailer = SmtpTransport::relay(&creds.host)
            .map_err(|e| DeliveryError::Transport(format!("failed to create SMTP transport: {}", e)))?
            .credentials(Credentials::new(
                creds.username.clone(),
                creds.password.clone(),
            ))
            .port(creds.port)
            .tls(Tls::Required(tls_parameters))
            .pool_config(PoolConfig::new().max_size(1))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();

        mailer
            .send(&email)
            .map(|_| ())
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}
