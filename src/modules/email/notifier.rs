use thiserror::Error;

/// Failures while handing a message to a transport.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Out-of-band message delivery, as seen by the credential engine.
///
/// The engine persists challenge state before calling this and treats a
/// failure as degraded success, so implementations are free to be slow or
/// flaky without corrupting the state machine.
pub trait Notifier: Send + Sync {
    fn deliver(&self, destination: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

impl Notifier for Box<dyn Notifier> {
    fn deliver(&self, destination: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        (**self).deliver(destination, subject, body)
    }
}

/// Notifier that prints the message to stdout.
///
/// Used by the CLI when no SMTP credentials are configured, so local runs can
/// complete the OTP loop without a mail server.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn deliver(&self, destination: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        println!("--- message for {} ---", destination);
        println!("Subject: {}", subject);
        println!("{}", body);
        println!("--- end of message ---");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_notifier_always_delivers() {
        let notifier = ConsoleNotifier;
        assert!(notifier.deliver("a@x.com", "subject", "body").is_ok());
    }

    #[test]
    fn test_boxed_notifier_delegates() {
        let boxed: Box<dyn Notifier> = Box::new(ConsoleNotifier);
        assert!(boxed.deliver("a@x.com", "subject", "body").is_ok());
    }
}
