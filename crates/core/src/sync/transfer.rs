//! Transfer strategy selection
//!
//! A file relayed from the source to the destination either passes through
//! memory (both backends stream) or through a temporary file on disk. The
//! choice is made once per run.

use std::path::{Path, PathBuf};

use crate::entry::FileEntry;
use crate::error::Result;
use crate::traits::Backend;

const SPOOL_PREFIX: &str = ".bt-spool-";

/// How file contents travel from source to destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStrategy {
    /// Whole file held in memory between fetch and store
    Streaming,
    /// File fetched into a temporary file, then uploaded from it
    Spooling { temp_dir: Option<PathBuf> },
}

impl TransferStrategy {
    /// Pick the strategy for a source/destination pair
    ///
    /// Streaming requires both backends to support it and `allow_streaming`.
    pub fn select(
        source: &dyn Backend,
        destination: &dyn Backend,
        allow_streaming: bool,
        temp_dir: Option<&Path>,
    ) -> Self {
        if allow_streaming && source.supports_streaming() && destination.supports_streaming() {
            TransferStrategy::Streaming
        } else {
            TransferStrategy::Spooling {
                temp_dir: temp_dir.map(Path::to_path_buf),
            }
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, TransferStrategy::Streaming)
    }

    /// Copy `entry` from `source` to `destination`
    pub async fn transfer(
        &self,
        source: &dyn Backend,
        destination: &dyn Backend,
        entry: &FileEntry,
    ) -> Result<()> {
        match self {
            TransferStrategy::Streaming => {
                let data = source.get_bytes(&entry.name).await?;
                tracing::trace!(name = %entry.name, bytes = data.len(), "Relaying in memory");
                destination.put_bytes(&entry.name, data).await
            }
            TransferStrategy::Spooling { temp_dir } => {
                // Removed on drop, whichever way this function returns.
                let spool = spool_file(temp_dir.as_deref())?;
                tracing::trace!(name = %entry.name, spool = %spool.path().display(), "Relaying via temp file");
                source.get(&entry.name, spool.path()).await?;
                destination.put(&entry.name, spool.path()).await
            }
        }
    }
}

fn spool_file(temp_dir: Option<&Path>) -> Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SPOOL_PREFIX);
    let file = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file)
}
