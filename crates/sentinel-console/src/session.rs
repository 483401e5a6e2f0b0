//! Admin session store
//!
//! Persists the admin bearer token and mirrors it into the shared
//! [`Credentials`]. This is the only writer of those credentials.

use crate::api::{Credentials, SoarApi};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::{AdminIdentity, LoginResponse};
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Durable token storage
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> ConsoleResult<Option<String>>;
    fn store(&self, token: &str) -> ConsoleResult<()>;
    fn clear(&self) -> ConsoleResult<()>;
}

/// Token kept in a single file, `~/.sentinel/admin_token` by default
pub struct FileTokenStorage {
    path: Option<PathBuf>,
}

impl FileTokenStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Default location; unavailable when there is no home directory
    pub fn default_location() -> Self {
        Self {
            path: dirs::home_dir().map(|home| home.join(".sentinel").join("admin_token")),
        }
    }

    fn path(&self) -> ConsoleResult<&PathBuf> {
        self.path
            .as_ref()
            .ok_or_else(|| ConsoleError::Storage("no home directory for token storage".into()))
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> ConsoleResult<Option<String>> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(path)?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    fn store(&self, token: &str) -> ConsoleResult<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> ConsoleResult<()> {
        match &self.path {
            Some(path) if path.exists() => Ok(fs::remove_file(path)?),
            _ => Ok(()),
        }
    }
}

/// In-process storage (tests, ephemeral sessions)
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> ConsoleResult<Option<String>> {
        Ok(self.token.read().clone())
    }

    fn store(&self, token: &str) -> ConsoleResult<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ConsoleResult<()> {
        *self.token.write() = None;
        Ok(())
    }
}

/// Single source of truth for the admin bearer token
pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    credentials: Arc<Credentials>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn TokenStorage>, credentials: Arc<Credentials>) -> Self {
        Self { storage, credentials }
    }

    /// Persisted token, `None` when absent or storage is unavailable
    pub fn get_token(&self) -> Option<String> {
        match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to read admin token: {}", e);
                None
            }
        }
    }

    /// Persist (or delete) the token and update the request credentials
    pub fn apply_token(&self, token: Option<&str>) {
        match token {
            Some(token) => {
                if let Err(e) = self.storage.store(token) {
                    tracing::warn!("Failed to persist admin token: {}", e);
                }
                self.credentials.set(Some(token.to_string()));
            }
            None => {
                if let Err(e) = self.storage.clear() {
                    tracing::warn!("Failed to remove admin token: {}", e);
                }
                self.credentials.set(None);
            }
        }
    }

    /// Load the persisted token into the credentials without re-persisting it
    pub fn initialize_session(&self) -> Option<String> {
        let token = self.get_token();
        if let Some(token) = &token {
            self.credentials.set(Some(token.clone()));
        }
        token
    }

    pub async fn login(&self, api: &dyn SoarApi, username: &str, password: &str) -> ConsoleResult<LoginResponse> {
        let response = api.admin_login(username, password).await?;
        if response.token.is_empty() {
            return Err(ConsoleError::Decode("login response carried no token".into()));
        }
        self.apply_token(Some(&response.token));
        tracing::info!("Admin {} logged in", response.username);
        Ok(response)
    }

    pub fn logout(&self) {
        self.apply_token(None);
        tracing::info!("Admin session cleared");
    }

    /// Initialize from storage and validate against the server.
    ///
    /// A rejected token is cleared (forced logout). Transport failures keep
    /// the token and are returned to the caller.
    pub async fn restore(&self, api: &dyn SoarApi) -> ConsoleResult<Option<AdminIdentity>> {
        if self.initialize_session().is_none() {
            return Ok(None);
        }
        match api.admin_me().await {
            Ok(identity) => Ok(Some(identity)),
            Err(ConsoleError::Unauthorized) => {
                tracing::warn!("Stored admin token rejected, logging out");
                self.apply_token(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
