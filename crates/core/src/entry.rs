//! Remote file entries as returned by a backend listing

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Sentinel size for entries whose length the backend does not report
pub const UNKNOWN_SIZE: i64 = -1;

/// One remote object, snapshotted at listing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Name, unique within a listing; compared byte-wise
    pub name: String,

    /// Whether this entry is a folder (never transferred by sync)
    pub is_folder: bool,

    /// Size in bytes, negative when unknown
    pub size: i64,

    /// Last modification time, advisory only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl FileEntry {
    /// Create a file entry
    pub fn file(name: impl Into<String>, size: i64) -> Self {
        Self {
            name: name.into(),
            is_folder: false,
            size,
            last_modified: None,
        }
    }

    /// Create a folder entry
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_folder: true,
            size: UNKNOWN_SIZE,
            last_modified: None,
        }
    }

    /// Attach a modification time
    pub fn with_modified(mut self, modified: Timestamp) -> Self {
        self.last_modified = Some(modified);
        self
    }

    /// Size if the backend reported one
    pub fn known_size(&self) -> Option<u64> {
        u64::try_from(self.size).ok()
    }

    /// Human-readable size, empty when unknown
    pub fn size_human(&self) -> String {
        self.known_size()
            .map(|s| humansize::format_size(s, humansize::BINARY))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_folder_constructors() {
        let f = FileEntry::file("a.zip", 1024);
        assert!(!f.is_folder);
        assert_eq!(f.known_size(), Some(1024));
        assert_eq!(f.size_human(), "1 KiB");

        let d = FileEntry::folder("sub");
        assert!(d.is_folder);
        assert_eq!(d.known_size(), None);
        assert_eq!(d.size_human(), "");
    }

    #[test]
    fn test_serialization_skips_missing_timestamp() {
        let json = serde_json::to_string(&FileEntry::file("a", 1)).unwrap();
        assert!(!json.contains("last_modified"));
        assert!(json.contains("\"is_folder\":false"));
    }
}
