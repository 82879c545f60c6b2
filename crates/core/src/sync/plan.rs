//! Listing differ
//!
//! Partitions a source and a destination listing into the folders to
//! ignore, the files to skip, the files to copy and the files to delete.
//! A same-named file is considered unchanged when its size matches; the
//! modification time is not compared.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::entry::FileEntry;

/// Result of comparing two listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Source folders, only counted
    pub folders: Vec<FileEntry>,
    /// Source files already present at the destination with the same size
    pub skip: Vec<FileEntry>,
    /// Source files missing at the destination or with a different size
    pub copy: Vec<FileEntry>,
    /// Destination files with no same-named source entry
    pub delete: Vec<FileEntry>,
}

impl SyncPlan {
    /// Compare `source` against `destination`
    ///
    /// `copy` keeps the relative order of `source`, `delete` the relative
    /// order of `destination`. Destination folders are never deleted.
    pub fn build(source: &[FileEntry], destination: &[FileEntry]) -> Self {
        let dest_by_name: HashMap<&str, &FileEntry> = destination
            .iter()
            .map(|e| (e.name.as_str(), e))
            .collect();
        let mut source_names: HashSet<&str> = HashSet::with_capacity(source.len());

        let mut plan = SyncPlan {
            copy: Vec::with_capacity(source.len()),
            ..Default::default()
        };

        for entry in source {
            source_names.insert(entry.name.as_str());

            if entry.is_folder {
                plan.folders.push(entry.clone());
            } else if dest_by_name
                .get(entry.name.as_str())
                .is_some_and(|dest| dest.size == entry.size)
            {
                plan.skip.push(entry.clone());
            } else {
                plan.copy.push(entry.clone());
            }
        }

        plan.delete = destination
            .iter()
            .filter(|e| !e.is_folder && !source_names.contains(e.name.as_str()))
            .cloned()
            .collect();

        plan
    }

    pub fn copy_size(&self) -> u64 {
        total_size(&self.copy)
    }

    pub fn skip_size(&self) -> u64 {
        total_size(&self.skip)
    }

    pub fn delete_size(&self) -> u64 {
        total_size(&self.delete)
    }

    /// Whether the destination already mirrors the source
    pub fn is_in_sync(&self) -> bool {
        self.copy.is_empty() && self.delete.is_empty()
    }
}

/// Sum of the known sizes in `entries`; unknown sizes count as zero
pub fn total_size(entries: &[FileEntry]) -> u64 {
    entries.iter().filter_map(FileEntry::known_size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn scenario() -> (Vec<FileEntry>, Vec<FileEntry>) {
        let source = vec![
            FileEntry::file("a", 100),
            FileEntry::file("b", 200),
            FileEntry::folder("folder1"),
            FileEntry::file("c", 50),
        ];
        let destination = vec![
            FileEntry::file("a", 100),
            FileEntry::file("b", 150),
            FileEntry::file("d", 10),
        ];
        (source, destination)
    }

    #[test]
    fn test_reference_scenario() {
        let (source, destination) = scenario();
        let plan = SyncPlan::build(&source, &destination);

        assert_eq!(names(&plan.skip), vec!["a"]);
        assert_eq!(names(&plan.copy), vec!["b", "c"]);
        assert_eq!(names(&plan.delete), vec!["d"]);
        assert_eq!(names(&plan.folders), vec!["folder1"]);

        assert_eq!(plan.copy_size(), 250);
        assert_eq!(plan.skip_size(), 100);
        assert_eq!(plan.delete_size(), 10);
    }

    #[test]
    fn test_partition_covers_source_exactly_once() {
        let (source, destination) = scenario();
        let plan = SyncPlan::build(&source, &destination);

        let mut seen: Vec<&str> = names(&plan.folders);
        seen.extend(names(&plan.skip));
        seen.extend(names(&plan.copy));
        seen.sort_unstable();

        let mut expected = names(&source);
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_copy_preserves_source_order() {
        let source = vec![
            FileEntry::file("z", 1),
            FileEntry::file("m", 2),
            FileEntry::file("a", 3),
        ];
        let plan = SyncPlan::build(&source, &[]);
        assert_eq!(names(&plan.copy), vec!["z", "m", "a"]);
    }

    #[test]
    fn test_delete_preserves_destination_order_and_spares_folders() {
        let destination = vec![
            FileEntry::file("y", 1),
            FileEntry::folder("keep-me"),
            FileEntry::file("b", 2),
        ];
        let plan = SyncPlan::build(&[], &destination);
        assert_eq!(names(&plan.delete), vec!["y", "b"]);
    }

    #[test]
    fn test_size_change_moves_entry_to_copy() {
        let plan = SyncPlan::build(&[FileEntry::file("a", 101)], &[FileEntry::file("a", 100)]);
        assert!(plan.skip.is_empty());
        assert_eq!(names(&plan.copy), vec!["a"]);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_names_compare_case_sensitively() {
        let plan = SyncPlan::build(&[FileEntry::file("A", 1)], &[FileEntry::file("a", 1)]);
        assert_eq!(names(&plan.copy), vec!["A"]);
        assert_eq!(names(&plan.delete), vec!["a"]);
    }

    #[test]
    fn test_same_size_different_content_is_skipped() {
        // Only the length is compared, timestamps are ignored.
        let newer = FileEntry::file("a", 10).with_modified(jiff::Timestamp::from_second(2_000).unwrap());
        let older = FileEntry::file("a", 10).with_modified(jiff::Timestamp::from_second(1_000).unwrap());
        let plan = SyncPlan::build(&[newer], &[older]);
        assert_eq!(names(&plan.skip), vec!["a"]);
    }

    #[test]
    fn test_source_folder_matching_destination_file_is_not_deleted() {
        let plan = SyncPlan::build(&[FileEntry::folder("x")], &[FileEntry::file("x", 5)]);
        assert_eq!(names(&plan.folders), vec!["x"]);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let (source, destination) = scenario();
        let first = SyncPlan::build(&source, &destination);
        assert!(!first.is_in_sync());

        // Destination after the first run: skipped plus copied files.
        let mut synced: Vec<FileEntry> = first.skip.clone();
        synced.extend(first.copy.iter().cloned());

        let second = SyncPlan::build(&source, &synced);
        assert!(second.copy.is_empty());
        assert!(second.delete.is_empty());
        assert!(second.is_in_sync());
    }

    #[test]
    fn test_unknown_sizes_do_not_reduce_totals() {
        let plan = SyncPlan::build(&[FileEntry::file("a", -1), FileEntry::file("b", 7)], &[]);
        assert_eq!(plan.copy_size(), 7);
    }
}
