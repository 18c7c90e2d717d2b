use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use super::error::{AuthError, StoreError};
use super::store::{RecordStore, UpdateFn, UserRecord};

/// Record store backed by a single JSON file.
///
/// The whole record map is rewritten on every mutation, which is plenty for a
/// CLI caller. All operations share one lock; the file write serializes them
/// anyway.
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<HashMap<String, UserRecord>>,
}

impl JsonFileStore {
    /// Function to open a store file, starting empty if it is missing or
    /// cannot be parsed
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    fn persist(&self, records: &HashMap<String, UserRecord>) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        let mut file = fs::File::create(&self.path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let needle = email.trim();
        Ok(records.values().find(|r| r.email == needle).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let needle = username.trim().to_lowercase();
        Ok(records
            .values()
            .find(|r| r.username.to_lowercase() == needle)
            .cloned())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn create(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;

        let username_lower = record.username.to_lowercase();
        let taken = records.values().any(|existing| {
            existing.email == record.email || existing.username.to_lowercase() == username_lower
        });
        if taken || records.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }

        records.insert(record.id.clone(), record.clone());
        if let Err(e) = self.persist(&records) {
            // Keep memory and file consistent on a failed write
            records.remove(&record.id);
            return Err(e);
        }
        Ok(record)
    }

    fn update(&self, id: &str, apply: UpdateFn) -> Result<UserRecord, AuthError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| AuthError::Store(StoreError::Poisoned))?;

        let record = match records.get(id) {
            Some(record) => record,
            None => return Err(AuthError::NotFound),
        };

        let mut draft = record.clone();
        apply(&mut draft)?;

        let previous = records.insert(id.to_string(), draft.clone());
        if let Err(e) = self.persist(&records) {
            if let Some(previous) = previous {
                records.insert(id.to_string(), previous);
            }
            return Err(AuthError::Store(e));
        }
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn sample_record(username: &str, email: &str) -> UserRecord {
        UserRecord::new(username, email, "$pbkdf2-sha256$fake".to_string(), Utc::now())
    }

    #[test]
    fn test_records_survive_reopen() {
        let file = NamedTempFile::new().unwrap();

        let created = {
            let store = JsonFileStore::open(file.path());
            let created = store.create(sample_record("TestUser", "test@example.com")).unwrap();
            store
                .update(&created.id, &mut |record| {
                    record.verified = true;
                    Ok(())
                })
                .unwrap();
            created
        };

        let reopened = JsonFileStore::open(file.path());
        let loaded = reopened.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(loaded.username, "TestUser");
        assert!(loaded.verified);
        assert!(reopened.find_by_username("testuser").unwrap().is_some());
    }

    #[test]
    fn test_unparseable_file_starts_empty() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), b"not json at all").unwrap();

        let store = JsonFileStore::open(file.path());
        assert!(store.find_by_email("test@example.com").unwrap().is_none());

        // And it is usable from there
        store.create(sample_record("u1", "a@x.com")).unwrap();
        assert!(store.find_by_email("a@x.com").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let store = JsonFileStore::open(file.path());
        store.create(sample_record("u1", "a@x.com")).unwrap();

        assert!(matches!(
            store.create(sample_record("u2", "a@x.com")),
            Err(StoreError::Conflict)
        ));
        assert!(matches!(
            store.create(sample_record("U1", "b@x.com")),
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn test_rejected_update_changes_nothing() {
        let file = NamedTempFile::new().unwrap();
        let store = JsonFileStore::open(file.path());
        let created = store.create(sample_record("u1", "a@x.com")).unwrap();

        let result = store.update(&created.id, &mut |record| {
            record.verified = true;
            Err(AuthError::IncorrectCode)
        });
        assert!(result.is_err());
        assert!(!store.find_by_id(&created.id).unwrap().unwrap().verified);
    }
}
