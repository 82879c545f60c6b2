//! Backend capability trait
//!
//! The sync engine and the CLI commands only ever talk to storage through
//! [`Backend`]. Concrete protocols live in the bt-backends crate.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::entry::FileEntry;
use crate::error::{Error, Result};

/// A handle bound to one remote storage location (its "container")
///
/// Handles are released when dropped, so the owning scope decides their
/// lifetime on both success and failure paths.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Protocol key this handle was created for (e.g. "file", "s3")
    fn protocol(&self) -> &str;

    /// Location description safe to print (no credentials)
    fn display_name(&self) -> String;

    /// Enumerate the entries in the container
    async fn list(&self) -> Result<Vec<FileEntry>>;

    /// Probe that the container exists and is reachable
    ///
    /// Returns [`Error::FolderMissing`] when the container does not exist.
    async fn test(&self) -> Result<()>;

    /// Create the container
    async fn create_folder(&self) -> Result<()>;

    /// Download `name` into the local file at `local`
    async fn get(&self, name: &str, local: &Path) -> Result<()>;

    /// Upload the local file at `local` as `name`
    async fn put(&self, name: &str, local: &Path) -> Result<()>;

    /// Delete `name` from the container
    async fn delete(&self, name: &str) -> Result<()>;

    /// Whether this backend can move file contents through memory
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Read the whole of `name` into memory
    async fn get_bytes(&self, name: &str) -> Result<Bytes> {
        Err(Error::UnsupportedFeature(format!(
            "{} backend does not support streaming reads of {name}",
            self.protocol()
        )))
    }

    /// Store `data` as `name`
    async fn put_bytes(&self, name: &str, data: Bytes) -> Result<()> {
        let _ = data;
        Err(Error::UnsupportedFeature(format!(
            "{} backend does not support streaming writes of {name}",
            self.protocol()
        )))
    }
}
