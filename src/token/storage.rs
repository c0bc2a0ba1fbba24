//! Token Storage
//!
//! Persistence for the current credential. The Graph client calls `save`
//! after every refresh and propagates its failure.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StorageError, TeamsError, TeamsResult};
use crate::types::TokenInfo;

/// Token storage interface.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist the credential, replacing any previous one.
    async fn save(&self, token: &TokenInfo) -> TeamsResult<()>;

    /// Load the persisted credential, if any.
    async fn load(&self) -> TeamsResult<Option<TokenInfo>>;

    /// Remove the persisted credential. Returns whether one existed.
    async fn clear(&self) -> TeamsResult<bool>;
}

/// In-memory token storage.
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<TokenInfo>>,
}

impl InMemoryTokenStore {
    /// Create new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage holding `token`.
    pub fn with_token(token: TokenInfo) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, token: &TokenInfo) -> TeamsResult<()> {
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    async fn load(&self) -> TeamsResult<Option<TokenInfo>> {
        Ok(self.token.read().clone())
    }

    async fn clear(&self) -> TeamsResult<bool> {
        Ok(self.token.write().take().is_some())
    }
}

/// JSON file token storage.
///
/// Parent directories are created on save. On Unix the file is created
/// with mode 0600 before any token bytes are written.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    async fn restrict_permissions(&self) -> TeamsResult<()> {
        use std::os::unix::fs::PermissionsExt;

        tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| write_failed(&self.path, e))
    }

    #[cfg(not(unix))]
    async fn restrict_permissions(&self) -> TeamsResult<()> {
        Ok(())
    }
}

fn write_failed(path: &Path, e: std::io::Error) -> TeamsError {
    TeamsError::Storage(StorageError::WriteFailed {
        message: format!("{}: {}", path.display(), e),
    })
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, token: &TokenInfo) -> TeamsResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(token).map_err(|e| {
            TeamsError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| write_failed(&self.path, e))?;
        // `mode` only applies on create; tighten a pre-existing file before writing.
        self.restrict_permissions().await?;
        file.write_all(&json)
            .await
            .map_err(|e| write_failed(&self.path, e))?;
        file.flush().await.map_err(|e| write_failed(&self.path, e))?;

        debug!(path = %self.path.display(), "Saved tokens");
        Ok(())
    }

    async fn load(&self) -> TeamsResult<Option<TokenInfo>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TeamsError::Storage(StorageError::ReadFailed {
                    message: format!("{}: {}", self.path.display(), e),
                }))
            }
        };

        let token = serde_json::from_slice(&bytes).map_err(|e| {
            TeamsError::Storage(StorageError::CorruptedData {
                message: format!("{}: {}", self.path.display(), e),
            })
        })?;

        Ok(Some(token))
    }

    async fn clear(&self) -> TeamsResult<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TeamsError::Storage(StorageError::DeleteFailed {
                message: format!("{}: {}", self.path.display(), e),
            })),
        }
    }
}

/// Mock token storage for testing.
#[derive(Default)]
pub struct MockTokenStore {
    token: RwLock<Option<TokenInfo>>,
    save_history: RwLock<Vec<TokenInfo>>,
    fail_next_save: RwLock<bool>,
}

impl MockTokenStore {
    /// Create new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save` fail with a write error.
    pub fn fail_next_save(&self) -> &Self {
        *self.fail_next_save.write() = true;
        self
    }

    /// Every token passed to `save`, in order.
    pub fn save_history(&self) -> Vec<TokenInfo> {
        self.save_history.read().clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_history.read().len()
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn save(&self, token: &TokenInfo) -> TeamsResult<()> {
        if std::mem::take(&mut *self.fail_next_save.write()) {
            return Err(TeamsError::Storage(StorageError::WriteFailed {
                message: "Mock save failure".to_string(),
            }));
        }

        self.save_history.write().push(token.clone());
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    async fn load(&self) -> TeamsResult<Option<TokenInfo>> {
        Ok(self.token.read().clone())
    }

    async fn clear(&self) -> TeamsResult<bool> {
        Ok(self.token.write().take().is_some())
    }
}
