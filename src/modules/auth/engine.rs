use chrono::{DateTime, Utc};
use log::warn;

use crate::modules::email::notifier::Notifier;
use crate::modules::email::templates;
use crate::modules::utils::logging::log_auth_event;

use super::error::{AuthError, StoreError};
use super::otp::{self, ChallengePurpose};
use super::password;
use super::store::{RecordStore, UserRecord};
use super::tokens::ProofToken;

/// Whether the one-time code reached the notifier's transport.
///
/// Challenge state is always persisted before delivery is attempted, so a
/// failed delivery still leaves a valid challenge behind; the user can ask
/// for a fresh code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Undelivered,
}

/// Returned by the operations that put a challenge in flight.
#[derive(Debug, Clone)]
pub struct ChallengeReceipt {
    pub user_id: String,
    pub email: String,
    pub delivery: DeliveryStatus,
}

/// Returned by a successful `verify_otp`.
///
/// `proof` is the opaque server-issued token a caller must present to
/// privileged operations; it is the only thing `change_password` trusts.
#[derive(Debug, Clone)]
pub struct Verification {
    pub user_id: String,
    pub purpose: ChallengePurpose,
    pub proof: String,
}

/// Single source of truth for the credential and challenge state machine.
///
/// All mutating operations go through the store's atomic per-record `update`,
/// so concurrent calls for one user serialize and a code can only be consumed
/// once. Delivery happens after the mutation commits, outside any lock.
pub struct CredentialEngine<S, N> {
    store: S,
    notifier: N,
}

impl<S: RecordStore, N: Notifier> CredentialEngine<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Function to register a new user and put a registration challenge in
    /// flight
    ///
    /// The record is persisted before delivery is attempted and is not rolled
    /// back if delivery fails.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<ChallengeReceipt, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(AuthError::Validation("username"));
        }
        if email.is_empty() {
            return Err(AuthError::Validation("email"));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password"));
        }

        if self.store.find_by_email(email)?.is_some()
            || self.store.find_by_username(username)?.is_some()
        {
            log_auth_event("register", username, false, Some("identity already registered"));
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = password::hash(password)?;
        let now = Utc::now();
        let challenge = otp::issue(ChallengePurpose::Registration, now);
        let code = challenge.code.clone();

        let mut record = UserRecord::new(username, email, password_hash, now);
        record.pending_challenge = Some(challenge);

        // The store re-checks uniqueness under its own lock; a racing
        // duplicate surfaces as a conflict here.
        let record = self.store.create(record).map_err(|e| match e {
            StoreError::Conflict => AuthError::DuplicateIdentity,
            other => AuthError::Store(other),
        })?;

        log_auth_event("register", username, true, None);
        let delivery = self.deliver_code(&record.email, ChallengePurpose::Registration, &code);
        Ok(ChallengeReceipt {
            user_id: record.id,
            email: record.email,
            delivery,
        })
    }

    /// Function to check a password and put a login challenge in flight
    ///
    /// A correct password does not grant access by itself; the caller still
    /// has to come back through `verify_otp` with the delivered code.
    pub fn login(&self, username: &str, password: &str) -> Result<ChallengeReceipt, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::Validation("username"));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password"));
        }

        let record = match self.store.find_by_username(username)? {
            Some(record) => record,
            None => {
                log_auth_event("login", username, false, Some("unknown username"));
                return Err(AuthError::InvalidCredentials);
            }
        };
        if !password::verify(password, &record.password_hash) {
            log_auth_event("login", username, false, Some("password mismatch"));
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let challenge = otp::issue(ChallengePurpose::Login, now);
        let code = challenge.code.clone();

        let updated = self.store.update(&record.id, &mut |record| {
            // Only one code is live at a time; any pending challenge is
            // silently replaced.
            record.pending_challenge = Some(challenge.clone());
            Ok(())
        })?;

        log_auth_event("login", username, true, Some("challenge issued"));
        let delivery = self.deliver_code(&updated.email, ChallengePurpose::Login, &code);
        Ok(ChallengeReceipt {
            user_id: updated.id,
            email: updated.email,
            delivery,
        })
    }

    /// Function to check a submitted code against the pending challenge
    ///
    /// Compare-and-clear happens inside one atomic store update, so two
    /// concurrent submissions of the same code succeed at most once. Success
    /// consumes the challenge, marks the record verified, and mints the proof
    /// token returned to the caller.
    pub fn verify_otp(
        &self,
        user_id: &str,
        submitted_code: &str,
        now: DateTime<Utc>,
    ) -> Result<Verification, AuthError> {
        let submitted = submitted_code.trim();
        let mut minted: Option<ProofToken> = None;

        let result = self.store.update(user_id, &mut |record| {
            let challenge = match &record.pending_challenge {
                Some(challenge) => challenge,
                None => return Err(AuthError::NoChallenge),
            };
            // Exact string compare, digits only, no case folding
            if challenge.code != submitted {
                return Err(AuthError::IncorrectCode);
            }
            if challenge.is_expired(now) {
                return Err(AuthError::ChallengeExpired);
            }

            let proof = ProofToken::mint(challenge.purpose, now);
            minted = Some(proof.clone());
            record.pending_challenge = None;
            record.verified = true;
            record.reset_proof = Some(proof);
            Ok(())
        });

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                log_auth_event("verify_otp", user_id, false, Some("challenge check failed"));
                return Err(e);
            }
        };
        let proof = match minted {
            Some(proof) => proof,
            // The update only commits after minting, so this arm is dead
            None => return Err(AuthError::NoChallenge),
        };

        log_auth_event("verify_otp", &updated.username, true, Some(proof.purpose.as_str()));
        Ok(Verification {
            user_id: updated.id,
            purpose: proof.purpose,
            proof: proof.token,
        })
    }

    /// Function to put a password-reset challenge in flight for an email
    pub fn request_password_reset(&self, email: &str) -> Result<ChallengeReceipt, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("email"));
        }

        let record = match self.store.find_by_email(email)? {
            Some(record) => record,
            None => {
                log_auth_event("request_password_reset", email, false, Some("unknown email"));
                return Err(AuthError::NotFound);
            }
        };

        let now = Utc::now();
        let challenge = otp::issue(ChallengePurpose::PasswordReset, now);
        let code = challenge.code.clone();

        let updated = self.store.update(&record.id, &mut |record| {
            record.pending_challenge = Some(challenge.clone());
            Ok(())
        })?;

        log_auth_event("request_password_reset", &updated.username, true, None);
        let delivery = self.deliver_code(&updated.email, ChallengePurpose::PasswordReset, &code);
        Ok(ChallengeReceipt {
            user_id: updated.id,
            email: updated.email,
            delivery,
        })
    }

    /// Function to replace a user's password hash
    ///
    /// Requires the proof token minted by a verified password-reset
    /// challenge; holding a user id alone authorizes nothing. The proof is
    /// consumed whether or not another change follows.
    pub fn change_password(
        &self,
        user_id: &str,
        proof: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.is_empty() {
            return Err(AuthError::Validation("password"));
        }
        if proof.trim().is_empty() {
            return Err(AuthError::ProofRequired);
        }

        // Hash outside the per-record critical section; the cost function is
        // deliberately slow.
        let password_hash = password::hash(new_password)?;
        let now = Utc::now();

        let updated = self.store.update(user_id, &mut |record| {
            let authorized = record
                .reset_proof
                .as_ref()
                .map(|p| p.authorizes(proof, ChallengePurpose::PasswordReset, now))
                .unwrap_or(false);
            if !authorized {
                return Err(AuthError::ProofRequired);
            }
            record.reset_proof = None;
            record.password_hash = password_hash.clone();
            Ok(())
        })?;

        log_auth_event("change_password", &updated.username, true, None);
        Ok(())
    }

    fn deliver_code(&self, email: &str, purpose: ChallengePurpose, code: &str) -> DeliveryStatus {
        let subject = templates::challenge_subject(purpose);
        let body = templates::challenge_body(purpose, code);
        match self.notifier.deliver(email, subject, &body) {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                warn!("failed to deliver {} code: {}", purpose.as_str(), e);
                DeliveryStatus::Undelivered
            }
        }
    }
}
