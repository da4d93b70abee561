//! Attachment storage.
//!
//! Uploaded proof documents live in a flat directory keyed by their generated
//! name. Writes are two-phase: a file is first *staged* under `.staging/`, and
//! only *promoted* into the served directory once the database row that
//! references it has been committed. Anything left in `.staging/` after a crash
//! is resolved by reconciliation at startup.
//!
//! # Example
//!
//! ```ignore
//! use autoloan_core::file_storage::{AttachmentStorage, LocalAttachmentStorage};
//!
//! let storage = LocalAttachmentStorage::new("./uploads");
//! storage.prepare().await?;
//!
//! storage.stage("file-1700000000000-0a1b2c3d4e5f6789.pdf", &bytes).await?;
//! // ... commit the row ...
//! storage.promote("file-1700000000000-0a1b2c3d4e5f6789.pdf").await?;
//! ```

use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::anyhow;
use thiserror::Error;
use tokio::fs;

use crate::errors::AppError;

pub const STAGING_DIR: &str = ".staging";

pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Storage backend for loan-application attachments.
pub trait AttachmentStorage: Send + Sync + fmt::Debug {
    /// Create the backing directories if needed.
    fn prepare(&self) -> StorageFuture<'_, ()>;

    /// Write `content` into the staging area under `name`.
    fn stage<'a>(&'a self, name: &'a str, content: &'a [u8]) -> StorageFuture<'a, ()>;

    /// Move a staged file into the served directory.
    fn promote<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()>;

    /// Drop a staged file. A missing file is not an error.
    fn discard<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()>;

    /// Delete a promoted file. A missing file is not an error.
    fn remove<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()>;

    fn read<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Vec<u8>>;

    fn exists<'a>(&'a self, name: &'a str) -> StorageFuture<'a, bool>;

    /// Names of every file currently sitting in the staging area.
    fn staged(&self) -> StorageFuture<'_, Vec<String>>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("File not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(_) => AppError::bad_request(anyhow!(err.to_string())),
            StorageError::NotFound => AppError::not_found(anyhow!("File not found")),
            StorageError::Io(_) => AppError::internal(err),
        }
    }
}

/// Local filesystem storage rooted at a single upload directory.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStorage {
    base_dir: PathBuf,
}

impl LocalAttachmentStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn staging_dir(&self) -> PathBuf {
        self.base_dir.join(STAGING_DIR)
    }

    /// Attachment names are flat: no separators, no parent references, no dotfiles.
    pub fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.starts_with('.') || key.contains("..") {
            return Err(StorageError::InvalidKey(
                "Key must not be empty, start with '.', or contain '..'".to_string(),
            ));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(StorageError::InvalidKey(
                "Key contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    fn final_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate_key(key)?;
        Ok(self.base_dir.join(key))
    }

    fn staged_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate_key(key)?;
        Ok(self.staging_dir().join(key))
    }
}

async fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl AttachmentStorage for LocalAttachmentStorage {
    fn prepare(&self) -> StorageFuture<'_, ()> {
        Box::pin(async move {
            fs::create_dir_all(self.staging_dir()).await?;
            Ok(())
        })
    }

    fn stage<'a>(&'a self, name: &'a str, content: &'a [u8]) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let path = self.staged_path(name)?;
            fs::create_dir_all(self.staging_dir()).await?;
            fs::write(&path, content).await?;
            Ok(())
        })
    }

    fn promote<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let from = self.staged_path(name)?;
            let to = self.final_path(name)?;
            match fs::rename(&from, &to).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn discard<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move { remove_if_present(&self.staged_path(name)?).await })
    }

    fn remove<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move { remove_if_present(&self.final_path(name)?).await })
    }

    fn read<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let path = self.final_path(name)?;
            match fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn exists<'a>(&'a self, name: &'a str) -> StorageFuture<'a, bool> {
        Box::pin(async move {
            let path = self.final_path(name)?;
            Ok(fs::try_exists(&path).await?)
        })
    }

    fn staged(&self) -> StorageFuture<'_, Vec<String>> {
        Box::pin(async move {
            let mut names = Vec::new();
            let mut entries = match fs::read_dir(self.staging_dir()).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
            }

            names.sort();
            Ok(names)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalAttachmentStorage {
        let dir = std::env::temp_dir().join(format!("autoloan-storage-{}", uuid::Uuid::new_v4()));
        LocalAttachmentStorage::new(dir)
    }

    #[test]
    fn test_validate_key_accepts_generated_names() {
        assert!(LocalAttachmentStorage::validate_key("file-1700000000000-0a1b2c3d4e5f6789.pdf").is_ok());
        assert!(LocalAttachmentStorage::validate_key("proof-123.pdf").is_ok());
        assert!(LocalAttachmentStorage::validate_key("id_card.png").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_path_traversal() {
        assert!(LocalAttachmentStorage::validate_key("../../../etc/passwd").is_err());
        assert!(LocalAttachmentStorage::validate_key("..\\windows\\system32").is_err());
        assert!(LocalAttachmentStorage::validate_key("nested/proof.pdf").is_err());
        assert!(LocalAttachmentStorage::validate_key(".staging").is_err());
        assert!(LocalAttachmentStorage::validate_key("").is_err());
    }

    #[tokio::test]
    async fn test_stage_then_promote_makes_file_visible() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();

        storage.stage("proof-1.pdf", b"%PDF-1.4").await.unwrap();
        assert!(!storage.exists("proof-1.pdf").await.unwrap());
        assert_eq!(storage.staged().await.unwrap(), vec!["proof-1.pdf".to_string()]);

        storage.promote("proof-1.pdf").await.unwrap();
        assert!(storage.exists("proof-1.pdf").await.unwrap());
        assert!(storage.staged().await.unwrap().is_empty());
        assert_eq!(storage.read("proof-1.pdf").await.unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_promote_missing_file_is_not_found() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();

        let result = storage.promote("never-staged.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_remove_and_discard_tolerate_missing_files() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();

        assert!(storage.remove("gone.pdf").await.is_ok());
        assert!(storage.discard("gone.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_discard_drops_staged_file() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();

        storage.stage("proof-2.png", b"png").await.unwrap();
        storage.discard("proof-2.png").await.unwrap();
        assert!(storage.staged().await.unwrap().is_empty());
        assert!(matches!(
            storage.promote("proof-2.png").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let storage = temp_storage();
        storage.prepare().await.unwrap();

        assert!(matches!(
            storage.read("missing.pdf").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_staged_on_fresh_directory_is_empty() {
        let storage = temp_storage();
        assert!(storage.staged().await.unwrap().is_empty());
    }
}
