// Session holder: the persisted bearer token plus the in-memory auth state
//
// The token lives in a TokenStore (cookie-like, survives restarts), the
// profile and state live in memory. Every mutation goes through the same
// lock so the token, profile and generation never disagree.

use crate::error::StoreError;
use crate::models::UserProfile;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// Persisted, cookie-like key/value storage with expiry
pub trait TokenStore: Send + Sync + 'static {
    // Expired entries read as absent
    fn get(&self, key: &str) -> Result<Option<StoredToken>, StoreError>;

    fn set(&self, key: &str, token: StoredToken) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<StoredToken>, StoreError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(token) if token.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(token) => Ok(Some(token.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, token: StoredToken) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), token);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON-file backed store. One file holds every key, rewritten on each change.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredToken>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(raw) if raw.is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    // Writers replace an unreadable file instead of failing forever on it
    fn load_for_write(&self) -> Result<HashMap<String, StoredToken>, StoreError> {
        match self.load() {
            Err(StoreError::Corrupt(reason)) => {
                warn!(path = %self.path.display(), reason = %reason, "discarding unreadable token file");
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    fn save(&self, entries: &HashMap<String, StoredToken>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<StoredToken>, StoreError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load()?;
        match entries.get(key) {
            Some(token) if token.is_expired() => {
                entries.remove(key);
                self.save(&entries)?;
                Ok(None)
            }
            Some(token) => Ok(Some(token.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, token: StoredToken) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load_for_write()?;
        entries.insert(key.to_string(), token);
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        match self.load() {
            Ok(mut entries) => {
                if entries.remove(key).is_some() {
                    self.save(&entries)?;
                }
                Ok(())
            }
            Err(StoreError::Corrupt(reason)) => {
                warn!(path = %self.path.display(), reason = %reason, "discarding unreadable token file");
                self.save(&HashMap::new())
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unknown,
    Anonymous,
    Authenticated(UserProfile),
}

// Token as read at dispatch time, tagged with the session generation
#[derive(Debug, Clone)]
pub struct TokenSnapshot {
    pub token: Option<String>,
    pub generation: u64,
}

// What a 401 did to the session it was sent under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    // The token the request carried was dropped
    Cleared,
    // Another call (or a logout) already dropped it
    AlreadyCleared,
    // A newer login replaced it; left untouched
    Superseded,
}

struct SessionCell {
    state: SessionState,
    generation: u64,
}

/// Shared session handle. Clone the `Arc` and hand it to every API module.
pub struct Session {
    store: Arc<dyn TokenStore>,
    key: String,
    cell: Mutex<SessionCell>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            cell: Mutex::new(SessionCell {
                state: SessionState::Unknown,
                generation: 0,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()), crate::config::AUTH_TOKEN_KEY)
    }

    pub fn state(&self) -> SessionState {
        self.cell.lock().state.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &self.cell.lock().state {
            SessionState::Authenticated(profile) => Some(profile.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.cell.lock().state, SessionState::Authenticated(_))
    }

    // Still waiting for the startup check
    pub fn is_loading(&self) -> bool {
        matches!(self.cell.lock().state, SessionState::Unknown)
    }

    pub fn generation(&self) -> u64 {
        self.cell.lock().generation
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(&self.key)?.map(|t| t.value))
    }

    pub fn stored_token(&self) -> Result<Option<StoredToken>, StoreError> {
        self.store.get(&self.key)
    }

    /// Token and generation as seen right now. An unreadable store reads as
    /// no token, so anonymous calls (login, public config) still go out.
    pub fn snapshot(&self) -> TokenSnapshot {
        let cell = self.cell.lock();
        let token = match self.store.get(&self.key) {
            Ok(token) => token.map(|t| t.value),
            Err(err) => {
                warn!(error = %err, "token store unreadable, continuing without a token");
                None
            }
        };
        TokenSnapshot {
            token,
            generation: cell.generation,
        }
    }

    /// Persist a token and mark the session authenticated.
    pub fn establish(
        &self,
        token: &str,
        profile: UserProfile,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut cell = self.cell.lock();
        self.store.set(&self.key, StoredToken::new(token, ttl))?;
        cell.generation += 1;
        info!(
            user_id = %profile.id,
            role = ?profile.role,
            ttl_hours = ttl.num_hours(),
            "session established"
        );
        cell.state = SessionState::Authenticated(profile);
        Ok(())
    }

    /// Swap in a freshly fetched profile, but only for the session it was
    /// fetched under. Returns false if a logout, 401 or new login came first.
    pub fn update_profile_if_current(&self, generation: u64, profile: UserProfile) -> bool {
        let mut cell = self.cell.lock();
        if cell.generation != generation {
            debug!(
                observed = generation,
                current = cell.generation,
                "dropping profile fetched for a replaced session"
            );
            return false;
        }
        cell.state = SessionState::Authenticated(profile);
        true
    }

    // Settle the startup check as anonymous unless a login landed meanwhile
    pub fn mark_anonymous_if_current(&self, generation: u64) -> bool {
        let mut cell = self.cell.lock();
        if cell.generation != generation {
            return false;
        }
        cell.state = SessionState::Anonymous;
        true
    }

    /// Drop the persisted token and the profile unconditionally.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut cell = self.cell.lock();
        let result = self.store.remove(&self.key);
        cell.generation += 1;
        cell.state = SessionState::Anonymous;
        debug!(generation = cell.generation, "session cleared");
        result
    }

    /// React to a 401 for a request sent under `generation`.
    ///
    /// Only a newer authenticated session is protected; anything else ends
    /// up anonymous with the token gone.
    pub fn invalidate(&self, generation: u64) -> Result<Invalidation, StoreError> {
        let mut cell = self.cell.lock();
        if cell.generation != generation {
            if matches!(cell.state, SessionState::Authenticated(_)) {
                warn!(
                    observed = generation,
                    current = cell.generation,
                    "ignoring 401 for a replaced session"
                );
                return Ok(Invalidation::Superseded);
            }
            return Ok(Invalidation::AlreadyCleared);
        }
        let result = self.store.remove(&self.key);
        cell.generation += 1;
        cell.state = SessionState::Anonymous;
        result.map(|_| Invalidation::Cleared)
    }
}
