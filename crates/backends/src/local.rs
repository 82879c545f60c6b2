//! Local directory backend (`file://`)
//!
//! The container is a directory; its immediate children are the entries.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bt_core::{Backend, Error, FileEntry, Result};
use bytes::Bytes;

use crate::registry::BackendConfig;

pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let root = config
            .url
            .to_file_path()
            .map_err(|_| Error::InvalidUrl(format!("{}: not a local path", config.url)))?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` inside the container; names must not leave it
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(Error::User(format!("Invalid file name: '{name}'")));
        }
        Ok(self.root.join(name))
    }

    fn map_io(&self, e: std::io::Error, name: &str) -> Error {
        match e.kind() {
            ErrorKind::NotFound => Error::NotFound(name.to_string()),
            ErrorKind::PermissionDenied => Error::Auth(format!("{}: {e}", self.root.join(name).display())),
            _ => Error::Io(e),
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn protocol(&self) -> &str {
        "file"
    }

    fn display_name(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn list(&self) -> Result<Vec<FileEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::FolderMissing(self.root.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let metadata = item.metadata().await?;
            let name = item.file_name().to_string_lossy().into_owned();

            let mut entry = if metadata.is_dir() {
                FileEntry::folder(name)
            } else {
                FileEntry::file(name, i64::try_from(metadata.len()).unwrap_or(i64::MAX))
            };
            if let Some(modified) = metadata
                .modified()
                .ok()
                .and_then(|t| jiff::Timestamp::try_from(t).ok())
            {
                entry = entry.with_modified(modified);
            }
            entries.push(entry);
        }

        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn test(&self) -> Result<()> {
        match tokio::fs::metadata(&self.root).await {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(Error::User(format!(
                "{} exists but is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::FolderMissing(self.root.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_folder(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn get(&self, name: &str, local: &Path) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::copy(&path, local)
            .await
            .map_err(|e| self.map_io(e, name))?;
        Ok(())
    }

    async fn put(&self, name: &str, local: &Path) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::copy(local, &path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound if !self.root.exists() => {
                Error::FolderMissing(self.root.display().to_string())
            }
            _ => Error::Io(e),
        })?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| self.map_io(e, name))
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn get_bytes(&self, name: &str) -> Result<Bytes> {
        let path = self.resolve(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| self.map_io(e, name))?;
        Ok(Bytes::from(data))
    }

    async fn put_bytes(&self, name: &str, data: Bytes) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }
}
