use env_logger::{Builder, WriteStyle};
use log::{info, warn, LevelFilter};
use std::fs::OpenOptions;

/// Initialize the logging system with file output
pub fn initialize_logging(log_file: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Create or append to log file with proper permissions
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    // Configure the logging system
    Builder::new()
        // Set default log level
        .filter_level(LevelFilter::Info)
        // Enable timestamps
        .format_timestamp_secs()
        // Enable module path in logs
        .format_module_path(true)
        // Set colored output for console
        .write_style(WriteStyle::Auto)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    info!("Logging system initialized");
    Ok(())
}

/// Helper function to format sensitive data for logging
fn format_sensitive(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..2].iter().collect();
    let suffix: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", prefix, suffix)
}

/// Add structured logging for authentication events
///
/// Identities are masked; codes, passwords and proofs must never reach this.
pub fn log_auth_event(event_type: &str, identity: &str, success: bool, details: Option<&str>) {
    if success {
        info!(
            "Auth event: type={}, identity={}, success=true, details={:?}",
            event_type,
            format_sensitive(identity),
            details
        );
    } else {
        warn!(
            "Auth event: type={}, identity={}, success=false, details={:?}",
            event_type,
            format_sensitive(identity),
            details
        );
    }
}
