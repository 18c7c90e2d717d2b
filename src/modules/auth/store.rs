use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest;

use super::error::{AuthError, StoreError};
use super::otp::Challenge;
use super::tokens::ProofToken;

/// Represents a single user with their credential and challenge state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub pending_challenge: Option<Challenge>,
    pub reset_proof: Option<ProofToken>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Function to build a new, unverified record with a generated id
    pub fn new(username: &str, email: &str, password_hash: String, created_at: DateTime<Utc>) -> Self {
        let username = username.trim().to_string();
        let id = generate_record_id(&username, email, created_at);
        Self {
            id,
            username,
            email: email.trim().to_string(),
            password_hash,
            verified: false,
            pending_challenge: None,
            reset_proof: None,
            created_at,
        }
    }
}

/// Function to generate an opaque, stable record identifier
///
/// Hashes the identity fields together with the creation instant and keeps
/// the first 8 bytes as hex. Identity fields are unique, so the digest is too.
fn generate_record_id(username: &str, email: &str, created_at: DateTime<Utc>) -> String {
    let unique = format!(
        "{}:{}:{}",
        username,
        email,
        created_at.timestamp_nanos_opt().unwrap_or_default()
    );
    let digest = sha2::Sha256::digest(unique.as_bytes());
    hex::encode(&digest[..8])
}

/// Atomic read-modify-write body passed to `RecordStore::update`.
///
/// The store runs it while holding that record's critical section; the
/// mutation commits only when the closure returns `Ok`.
pub type UpdateFn<'a> = &'a mut dyn FnMut(&mut UserRecord) -> Result<(), AuthError>;

/// Durable keyed storage of user records, consumed by the credential engine.
///
/// `create` enforces the unique-username/unique-email invariant; `update` is
/// atomic per record id so same-user operations never interleave, while
/// different users may proceed in parallel.
pub trait RecordStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;
    fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError>;
    fn update(&self, id: &str, apply: UpdateFn) -> Result<UserRecord, AuthError>;
}

/// In-memory record store.
///
/// Keeps one mutex per record under a shared map, so updates for the same
/// user serialize and updates for different users run concurrently.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Arc<Mutex<UserRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn scan(&self, pred: impl Fn(&UserRecord) -> bool) -> Result<Option<UserRecord>, StoreError> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        for entry in map.values() {
            let record = entry.lock().map_err(|_| StoreError::Poisoned)?;
            if pred(&record) {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }
}

impl RecordStore for MemoryStore {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let needle = email.trim();
        self.scan(|r| r.email == needle)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        // Lookups are case-insensitive on username
        let needle = username.trim().to_lowercase();
        self.scan(|r| r.username.to_lowercase() == needle)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        match map.get(id) {
            Some(entry) => {
                let record = entry.lock().map_err(|_| StoreError::Poisoned)?;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let mut map = self.records.write().map_err(|_| StoreError::Poisoned)?;

        // Uniqueness check happens under the write lock so two racing
        // registrations cannot both pass it.
        let username_lower = record.username.to_lowercase();
        for entry in map.values() {
            let existing = entry.lock().map_err(|_| StoreError::Poisoned)?;
            if existing.email == record.email || existing.username.to_lowercase() == username_lower {
                return Err(StoreError::Conflict);
            }
        }
        if map.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }

        map.insert(record.id.clone(), Arc::new(Mutex::new(record.clone())));
        Ok(record)
    }

    fn update(&self, id: &str, apply: UpdateFn) -> Result<UserRecord, AuthError> {
        let entry = {
            let map = self
                .records
                .read()
                .map_err(|_| AuthError::Store(StoreError::Poisoned))?;
            match map.get(id) {
                Some(entry) => Arc::clone(entry),
                None => return Err(AuthError::NotFound),
            }
        };

        let mut record = entry
            .lock()
            .map_err(|_| AuthError::Store(StoreError::Poisoned))?;

        // Work on a draft so a rejected update leaves the record untouched
        let mut draft = record.clone();
        apply(&mut draft)?;
        *record = draft;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sample_record(username: &str, email: &str) -> UserRecord {
        UserRecord::new(username, email, "$pbkdf2-sha256$fake".to_string(), Utc::now())
    }

    #[test]
    fn test_create_and_find() {
        let store = MemoryStore::new();
        let created = store.create(sample_record("TestUser", "test@example.com")).unwrap();

        assert!(!created.id.is_empty());
        assert!(!created.verified);
        assert!(created.pending_challenge.is_none());

        let by_id = store.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_email = store.find_by_email("test@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        // Username lookups are case-insensitive
        let by_username = store.find_by_username("testuser").unwrap().unwrap();
        assert_eq!(by_username.id, created.id);

        assert!(store.find_by_email("other@example.com").unwrap().is_none());
        assert!(store.find_by_id("no-such-id").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let store = MemoryStore::new();
        store.create(sample_record("u1", "a@x.com")).unwrap();

        // Same email, different username
        assert!(matches!(
            store.create(sample_record("u2", "a@x.com")),
            Err(StoreError::Conflict)
        ));

        // Same username (case-insensitive), different email
        assert!(matches!(
            store.create(sample_record("U1", "b@x.com")),
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn test_update_commits_only_on_ok() {
        let store = MemoryStore::new();
        let created = store.create(sample_record("u1", "a@x.com")).unwrap();

        let failed = store.update(&created.id, &mut |record| {
            record.verified = true;
            Err(AuthError::IncorrectCode)
        });
        assert!(failed.is_err());
        assert!(!store.find_by_id(&created.id).unwrap().unwrap().verified);

        let updated = store
            .update(&created.id, &mut |record| {
                record.verified = true;
                Ok(())
            })
            .unwrap();
        assert!(updated.verified);
        assert!(store.find_by_id(&created.id).unwrap().unwrap().verified);
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let result = store.update("missing", &mut |_| Ok(()));
        assert!(matches!(result, Err(AuthError::NotFound)));
    }

    #[test]
    fn test_parallel_updates_on_different_users() {
        let store = Arc::new(MemoryStore::new());
        let a = store.create(sample_record("u1", "a@x.com")).unwrap();
        let b = store.create(sample_record("u2", "b@x.com")).unwrap();

        let handles: Vec<_> = [a.id.clone(), b.id.clone()]
            .into_iter()
            .map(|id| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .update(&id, &mut |record| {
                                record.verified = !record.verified;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // An even number of toggles lands back on false for both users
        assert!(!store.find_by_id(&a.id).unwrap().unwrap().verified);
        assert!(!store.find_by_id(&b.id).unwrap().unwrap().verified);
    }

    #[test]
    fn test_record_ids_are_opaque_and_distinct() {
        let now = Utc::now();
        let a = UserRecord::new("u1", "a@x.com", "h".into(), now);
        let b = UserRecord::new("u2", "b@x.com", "h".into(), now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 16);
        assert!(a.id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
