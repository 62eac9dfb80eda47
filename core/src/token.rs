//! Bearer credential store.
//!
//! # Design
//! `TokenStore` is a cheap, cloneable handle: every clone shares the same
//! storage medium and the same broadcast channel. Persistence is best effort.
//! Storage failures are logged and read back as "no token", and they never
//! suppress the `AuthChanged` notification that follows every `set_token`.
//!
//! Subscribers may observe redundant notifications (clearing an already empty
//! slot still fires one) and must treat them as idempotent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::StorageError;

/// Name of the single persisted credential slot.
pub const TOKEN_SLOT: &str = "authToken";

const EVENT_CAPACITY: usize = 16;

/// Broadcast after every credential update. Carries no payload; read the
/// store to learn the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthChanged;

/// Durable medium backing a `TokenStore`.
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn save(&self, token: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local slot. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// One file named after `TOKEN_SLOT` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(TOKEN_SLOT),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Single source of truth for the current bearer credential.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn CredentialStorage>,
    events: broadcast::Sender<AuthChanged>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { storage, events }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// File-backed when the config names a token directory, memory otherwise.
    pub fn from_config(config: &ClientConfig) -> Self {
        match &config.token_dir {
            Some(dir) => Self::new(Arc::new(FileStorage::in_dir(dir))),
            None => Self::in_memory(),
        }
    }

    /// The stored credential, or an empty string when absent or unreadable.
    pub fn get_token(&self) -> String {
        match self.storage.load() {
            Ok(token) => token.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to read credential; treating as anonymous");
                String::new()
            }
        }
    }

    pub fn has_token(&self) -> bool {
        !self.get_token().is_empty()
    }

    /// Persist `token`, or remove the slot when `token` is empty. Always
    /// broadcasts one `AuthChanged`.
    pub fn set_token(&self, token: &str) {
        let result = if token.is_empty() {
            self.storage.clear()
        } else {
            self.storage.save(token)
        };
        if let Err(e) = result {
            warn!(error = %e, clearing = token.is_empty(), "failed to persist credential");
        }
        // No subscribers is not an error.
        let _ = self.events.send(AuthChanged);
        debug!(authenticated = !token.is_empty(), "auth changed");
    }

    pub fn clear(&self) {
        self.set_token("");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthChanged> {
        self.events.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
