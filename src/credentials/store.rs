use crate::acquisition::region::Region;
use crate::credentials::cipher::Encryptor;
use crate::credentials::set::CredentialSet;
use crate::error::AcquireError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, io};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// At-rest form of a credential set. Only the secret is ciphered; the other
/// fields are needed for lookups and carry no secret material.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    client_id: String,
    encrypted_secret: String,
    tenant_id: String,
    region: String,
}

/// Holds the single credential set used for direct exchange.
///
/// The secret is encrypted before it is held anywhere, in memory included.
/// With a persist path configured the ciphertext survives the process, but
/// the session-scoped key does not, so persisted credentials become
/// unreadable after session end. That is the intended trade-off.
pub struct CredentialStore {
    encryptor: Arc<dyn Encryptor>,
    record: RwLock<Option<StoredRecord>>,
    persist_path: Option<PathBuf>,
}

impl CredentialStore {
    pub fn new(encryptor: Arc<dyn Encryptor>) -> Self {
        Self {
            encryptor,
            record: RwLock::new(None),
            persist_path: None,
        }
    }

    /// Additionally mirrors the ciphered record to `path`.
    pub fn with_persistence(encryptor: Arc<dyn Encryptor>, path: PathBuf) -> Self {
        let record = load_record(&path);
        Self {
            encryptor,
            record: RwLock::new(record),
            persist_path: Some(path),
        }
    }

    /// Encrypts the secret and stores the record. Rejects incomplete sets.
    pub async fn save(&self, credentials: &CredentialSet) -> Result<(), AcquireError> {
        credentials.validate()?;

        let encrypted_secret = self
            .encryptor
            .encrypt(&credentials.client_secret)
            .map_err(|e| {
                AcquireError::Configuration(format!("could not protect client secret: {e}"))
            })?;

        let record = StoredRecord {
            client_id: credentials.client_id.clone(),
            encrypted_secret,
            tenant_id: credentials.tenant_id.clone(),
            region: credentials.region.as_str().to_string(),
        };

        if let Some(path) = &self.persist_path {
            persist_record(path, &record).map_err(|e| {
                AcquireError::Configuration(format!("could not persist credentials: {e}"))
            })?;
        }

        *self.record.write().await = Some(record);
        debug!(client_id = %credentials.client_id, "credentials saved");
        Ok(())
    }

    /// Returns the decrypted credential set, or `None` when nothing is stored
    /// or the stored secret can no longer be decrypted.
    pub async fn get(&self) -> Option<CredentialSet> {
        let record = self.record.read().await.clone()?;

        let secret = match self.encryptor.decrypt(&record.encrypted_secret) {
            Ok(secret) => secret,
            Err(e) => {
                warn!("stored credentials are unreadable ({e}), treating as absent");
                return None;
            }
        };

        CredentialSet::new(
            record.client_id,
            secret,
            record.tenant_id,
            Region::parse(&record.region),
        )
        .ok()
    }

    pub async fn has(&self) -> bool {
        self.record.read().await.is_some()
    }

    pub async fn clear(&self) {
        *self.record.write().await = None;
        if let Some(path) = &self.persist_path {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("could not remove persisted credentials: {e}");
                }
            }
        }
    }
}

fn load_record(path: &PathBuf) -> Option<StoredRecord> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("persisted credential record is corrupt ({e}), ignoring");
            None
        }
    }
}

fn persist_record(path: &PathBuf, record: &StoredRecord) -> Result<(), io::Error> {
    let raw = serde_json::to_string_pretty(record)?;
    fs::write(path, raw)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::credentials::cipher::FallbackEncryptor;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(FallbackEncryptor::with_session_cipher()))
    }

    fn creds() -> CredentialSet {
        CredentialSet::new("c1", "s1", "t1", Region::NorthAmerica).unwrap()
    }

    #[tokio::test]
    async fn save_get_clear_round_trip() {
        let store = store();
        assert!(!store.has().await);
        assert!(store.get().await.is_none());

        store.save(&creds()).await.unwrap();
        assert!(store.has().await);
        let got = store.get().await.unwrap();
        assert_eq!(got.client_secret, "s1");
        assert_eq!(got.region, Region::NorthAmerica);

        store.clear().await;
        assert!(!store.has().await);
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn save_rejects_incomplete_credentials() {
        let store = store();
        let incomplete = CredentialSet {
            client_id: "c1".into(),
            client_secret: "".into(),
            tenant_id: "t1".into(),
            region: Region::NorthAmerica,
        };
        assert!(matches!(
            store.save(&incomplete).await,
            Err(AcquireError::Configuration(_))
        ));
        assert!(!store.has().await);
    }

    #[tokio::test]
    async fn secret_is_not_stored_in_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::with_persistence(
            Arc::new(FallbackEncryptor::with_session_cipher()),
            path.clone(),
        );
        store.save(&creds()).await.unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("s1\""));
        assert!(raw.contains("v1:"));
    }

    #[tokio::test]
    async fn persisted_ciphertext_is_unreadable_in_a_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let first = CredentialStore::with_persistence(
            Arc::new(FallbackEncryptor::with_session_cipher()),
            path.clone(),
        );
        first.save(&creds()).await.unwrap();

        // New process, new session key: record is present but undecryptable,
        // so get() degrades to absent instead of failing.
        let second = CredentialStore::with_persistence(
            Arc::new(FallbackEncryptor::with_session_cipher()),
            path,
        );
        assert!(second.has().await);
        let recovered = second.get().await;
        if let Some(set) = recovered {
            assert_ne!(set.client_secret, "s1");
        }
    }
}
