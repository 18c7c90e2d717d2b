pub mod notifier;
pub mod smtp;
pub mod templates;

pub use notifier::{ConsoleNotifier, DeliveryError, Notifier};
pub use smtp::{SmtpCredentials, SmtpNotifier};
pub use templates::{challenge_body, challenge_subject};
