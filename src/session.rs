//! Client session context.
//!
//! Holds the bearer token, the cached user name and the fitting-slot
//! assignment. A [`SessionStore`] mirrors it to durable storage on every
//! change; a [`LoginRedirect`] is notified when the backend rejects the token.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::services::slots::FittingSlots;

/// Everything the session persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub fitting_slots: FittingSlots,
}

/// Durable mirror of a [`SessionSnapshot`].
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<SessionSnapshot, SessionError>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError>;
}

/// Invoked when an authenticated call comes back 401.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Default redirect: log and let the caller notice the missing token.
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        tracing::warn!("Session rejected by backend, login required");
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    snapshot: Mutex<SessionSnapshot>,
}

impl MemorySessionStore {
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        Ok(())
    }
}

/// JSON file store. A missing or unreadable file loads as an empty session.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<SessionSnapshot, SessionError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionSnapshot::default())
            }
            Err(e) => return Err(SessionError::Io(e)),
        };

        match serde_json::from_slice(&raw) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok(SessionSnapshot::default())
            }
        }
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

struct SessionInner {
    state: RwLock<SessionSnapshot>,
    store: Box<dyn SessionStore>,
    redirect: Box<dyn LoginRedirect>,
}

/// Shared, cheaply cloneable session handle.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Load the session from `store`. Load failures start an empty session.
    pub fn load(store: impl SessionStore + 'static, redirect: impl LoginRedirect + 'static) -> Self {
        let snapshot = store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load session, starting empty");
            SessionSnapshot::default()
        });

        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(snapshot),
                store: Box::new(store),
                redirect: Box::new(redirect),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::load(MemorySessionStore::default(), LogRedirect)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|s| s.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.token.is_some())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.update(|s| s.token = Some(token));
    }

    pub fn clear_token(&self) {
        self.update(|s| s.token = None);
    }

    pub fn user_name(&self) -> Option<String> {
        self.read(|s| s.user_name.clone())
    }

    pub fn set_user_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|s| s.user_name = Some(name));
    }

    pub fn slots(&self) -> FittingSlots {
        self.read(|s| s.fitting_slots)
    }

    /// Mutate the slot assignment and persist it. Returns the new assignment.
    pub fn update_slots(&self, f: impl FnOnce(&mut FittingSlots)) -> FittingSlots {
        let mut result = FittingSlots::default();
        self.update(|s| {
            f(&mut s.fitting_slots);
            result = s.fitting_slots;
        });
        result
    }

    /// Drop everything the session holds (logout).
    pub fn clear(&self) {
        self.update(|s| *s = SessionSnapshot::default());
    }

    /// Handle a 401: forget the token, then fire the login redirect once.
    pub fn handle_unauthorized(&self) {
        self.clear_token();
        self.inner.redirect.redirect_to_login();
    }

    fn read<T>(&self, f: impl FnOnce(&SessionSnapshot) -> T) -> T {
        f(&self.inner.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    // The write lock is held across the save so the store sees updates in order.
    fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
        if let Err(e) = self.inner.store.save(&state) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
