use chrono::Utc;
use clap::{Arg, Command};

use two_to_enter::auth::{
    validate_password, CredentialEngine, DeliveryStatus, JsonFileStore, PasswordError,
};
use two_to_enter::email::{ConsoleNotifier, Notifier, SmtpCredentials, SmtpNotifier};
use two_to_enter::utils::logging;

fn main() {
    if let Err(e) = logging::initialize_logging(two_to_enter::LOG_FILE) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    // Define the command-line interface using clap
    let matches = Command::new("two-to-enter")
        .about("Password-plus-one-time-code authentication CLI")
        .subcommand(
            Command::new("register")
                .about("Register a new account and email a verification code")
                .arg(Arg::new("username").help("Username for the new account").required(true))
                .arg(Arg::new("email").help("Email address to verify").required(true)),
        )
        .subcommand(
            Command::new("login")
                .about("Check a password and email a login code")
                .arg(Arg::new("username").help("Username of the account").required(true)),
        )
        .subcommand(
            Command::new("verify")
                .about("Submit a one-time code for a pending challenge")
                .arg(Arg::new("user-id").help("User id from register/login/request-reset").required(true))
                .arg(Arg::new("code").help("The 6-digit code that was delivered").required(true)),
        )
        .subcommand(
            Command::new("request-reset")
                .about("Email a password-reset code")
                .arg(Arg::new("email").help("Email address of the account").required(true)),
        )
        .subcommand(
            Command::new("change-password")
                .about("Change the password using a verified reset proof")
                .arg(Arg::new("user-id").help("User id of the account").required(true))
                .arg(Arg::new("proof").help("Proof token printed by a successful verify").required(true)),
        )
        .get_matches();

    // File-backed store next to the binary; SMTP if configured, otherwise the
    // code is printed to the console.
    let store = JsonFileStore::open(two_to_enter::USERS_FILE);
    let notifier: Box<dyn Notifier> = match SmtpCredentials::from_env() {
        Some(creds) => Box::new(SmtpNotifier::new(creds)),
        None => {
            println!("Note: no SMTP credentials in the environment; codes are printed below.");
            Box::new(ConsoleNotifier)
        }
    };
    let engine = CredentialEngine::new(store, notifier);

    // Handle the "register" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("register") {
        let username = sub_matches.get_one::<String>("username").unwrap();
        let email = sub_matches.get_one::<String>("email").unwrap();

        let password = match prompt_new_password() {
            Some(password) => password,
            None => return,
        };

        match engine.register(username, email, &password) {
            Ok(receipt) => {
                println!("Registered. Your user id is {}", receipt.user_id);
                report_delivery(&receipt.delivery, &receipt.email);
                println!("Run `two-to-enter verify {} <code>` to finish.", receipt.user_id);
            }
            Err(e) => println!("Registration failed: {}", e),
        }
    }

    // Handle the "login" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("login") {
        let username = sub_matches.get_one::<String>("username").unwrap();

        println!("Password:");
        let password = match rpassword::read_password() {
            Ok(password) => password,
            Err(e) => {
                println!("Failed to read password: {}", e);
                return;
            }
        };

        match engine.login(username, &password) {
            Ok(receipt) => {
                report_delivery(&receipt.delivery, &receipt.email);
                println!("Run `two-to-enter verify {} <code>` to finish.", receipt.user_id);
            }
            Err(e) => println!("Login failed: {}", e),
        }
    }

    // Handle the "verify" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("verify") {
        let user_id = sub_matches.get_one::<String>("user-id").unwrap();
        let code = sub_matches.get_one::<String>("code").unwrap();

        match engine.verify_otp(user_id, code, Utc::now()) {
            Ok(verification) => {
                println!("Code verified for the {} flow.", verification.purpose.as_str());
                println!("Proof token (valid briefly, single use): {}", verification.proof);
            }
            Err(e) => println!("Verification failed: {}", e),
        }
    }

    // Handle the "request-reset" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("request-reset") {
        let email = sub_matches.get_one::<String>("email").unwrap();

        match engine.request_password_reset(email) {
            Ok(receipt) => {
                report_delivery(&receipt.delivery, &receipt.email);
                println!(
                    "Run `two-to-enter verify {} <code>` and then `change-password` with the proof.",
                    receipt.user_id
                );
            }
            Err(e) => println!("Reset request failed: {}", e),
        }
    }

    // Handle the "change-password" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("change-password") {
        let user_id = sub_matches.get_one::<String>("user-id").unwrap();
        let proof = sub_matches.get_one::<String>("proof").unwrap();

        let password = match prompt_new_password() {
            Some(password) => password,
            None => return,
        };

        match engine.change_password(user_id, proof, &password) {
            Ok(()) => println!("Password changed."),
            Err(e) => println!("Password change failed: {}", e),
        }
    }
}

/// Function to prompt for a new password and enforce the strength policy
fn prompt_new_password() -> Option<String> {
    println!("Choose a password (min 8 chars, upper, lower, digit, special):");
    let password = match rpassword::read_password() {
        Ok(password) => password,
        Err(e) => {
            println!("Failed to read password: {}", e);
            return None;
        }
    };

    if let Err(e) = validate_password(&password) {
        println!("Password rejected: {}", password_policy_message(&e));
        return None;
    }
    Some(password)
}

fn password_policy_message(error: &PasswordError) -> &'static str {
    match error {
        PasswordError::TooShort => "must be at least 8 characters",
        PasswordError::NoUppercase => "must contain an uppercase letter",
        PasswordError::NoLowercase => "must contain a lowercase letter",
        PasswordError::NoNumber => "must contain a digit",
        PasswordError::NoSpecialChar => "must contain a special character",
    }
}

fn report_delivery(delivery: &DeliveryStatus, email: &str) {
    match delivery {
        DeliveryStatus::Delivered => println!("A code was sent to {}.", email),
        DeliveryStatus::Undelivered => {
            println!("The code could not be delivered; request a fresh one and try again.")
        }
    }
}
