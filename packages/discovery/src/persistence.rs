//! Session persistence.
//!
//! # The Contract
//!
//! 1. **Restore once per mount.** The first record loaded for a key is copied
//!    into live state. Later changes to the stored record are not applied.
//!
//! 2. **Restore before fetch.** No search runs until the load has answered,
//!    so a default fetch never races a pending restore.
//!
//! 3. **Writes are debounced.** Mutations arm a timer; bursts coalesce into
//!    one write of the latest state.
//!
//! 4. **Failures are soft.** A failed read behaves like an empty store, a
//!    failed write is logged and dropped.
//!
//! The store itself is an opaque key to record map. [`FileStore`] keeps one
//! JSON document per key in a directory; [`testing::InMemoryStore`] backs
//! tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::session::{SearchSession, SessionKey};

/// Persists search sessions keyed by campaign.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load the record for `key`, or `None` if nothing was saved.
    async fn load(&self, key: &SessionKey) -> Result<Option<SearchSession>, StoreError>;

    /// Overwrite the record for `key`.
    async fn save(&self, key: &SessionKey, session: &SearchSession) -> Result<(), StoreError>;
}

// =============================================================================
// File Store
// =============================================================================

/// One pretty-printed JSON file per session key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &SessionKey) -> PathBuf {
        // ':' is not portable in file names
        let name = key.to_string().replace(':', "-");
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SearchSession>, StoreError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_slice(&bytes)?;
        debug!(%key, path = %path.display(), "loaded session record");
        Ok(Some(session))
    }

    async fn save(&self, key: &SessionKey, session: &SearchSession) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(session)?;

        // Write then rename so a crash never leaves a half-written record
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(%key, path = %path.display(), "saved session record");
        Ok(())
    }
}

// =============================================================================
// In-Memory Store (for testing)
// =============================================================================

/// In-memory session store for testing.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Store backed by a HashMap of serialized records.
    ///
    /// Records go through JSON so tests exercise the same encoding a real
    /// store would.
    #[derive(Default)]
    pub struct InMemoryStore {
        data: Mutex<HashMap<SessionKey, String>>,
        saves: AtomicUsize,
        fail_loads: AtomicBool,
        fail_saves: AtomicBool,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store pre-seeded with one record.
        pub fn with_session(session: &SearchSession) -> Self {
            let store = Self::new();
            store.put(session);
            store
        }

        pub fn put(&self, session: &SearchSession) {
            if let (Ok(json), Ok(mut data)) = (serde_json::to_string(session), self.data.lock()) {
                data.insert(session.key, json);
            }
        }

        pub fn get(&self, key: &SessionKey) -> Option<SearchSession> {
            let data = self.data.lock().ok()?;
            data.get(key).and_then(|json| serde_json::from_str(json).ok())
        }

        /// Number of successful saves so far.
        pub fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        pub fn fail_loads(&self, fail: bool) {
            self.fail_loads.store(fail, Ordering::SeqCst);
        }

        pub fn fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SessionStore for InMemoryStore {
        async fn load(&self, key: &SessionKey) -> Result<Option<SearchSession>, StoreError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(StoreError::Backend(anyhow::anyhow!("injected load failure")));
            }
            let data = self
                .data
                .lock()
                .map_err(|e| StoreError::Backend(anyhow::anyhow!("mutex poisoned: {}", e)))?;
            match data.get(key) {
                Some(json) => Ok(Some(serde_json::from_str(json)?)),
                None => Ok(None),
            }
        }

        async fn save(&self, key: &SessionKey, session: &SearchSession) -> Result<(), StoreError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Backend(anyhow::anyhow!("injected save failure")));
            }
            let json = serde_json::to_string(session)?;
            let mut data = self
                .data
                .lock()
                .map_err(|e| StoreError::Backend(anyhow::anyhow!("mutex poisoned: {}", e)))?;
            data.insert(*key, json);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
