//! Progress reporting for sync runs
//!
//! The engine never prints. It reports [`SyncEvent`]s to a [`SyncObserver`]
//! in a deterministic order; the CLI turns them into text lines.

use std::fmt;

use serde::Serialize;

use crate::entry::FileEntry;
use crate::error::Error;
use crate::sync::plan::SyncPlan;

/// Width of the textual progress bar, in characters
pub const BAR_WIDTH: usize = 100;

/// States of a sync run, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Init,
    SourceListed,
    DestinationProbed,
    DestinationListed,
    Diffed,
    Copying,
    Deleting,
    Complete,
    Aborted,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Init => "init",
            SyncState::SourceListed => "source-listed",
            SyncState::DestinationProbed => "destination-probed",
            SyncState::DestinationListed => "destination-listed",
            SyncState::Diffed => "diffed",
            SyncState::Copying => "copying",
            SyncState::Deleting => "deleting",
            SyncState::Complete => "complete",
            SyncState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// What is being done to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Copy,
    Delete,
}

/// Bytes processed so far out of a group total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(done: u64, total: u64) -> Self {
        Self { done, total }
    }

    /// Completed fraction in `0.0..=1.0`, `None` when the total is zero
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.done as f64 / self.total as f64).clamp(0.0, 1.0))
    }

    /// `[====    ] 42.00%`, or `None` when there is nothing to measure against
    pub fn render(&self) -> Option<String> {
        let fraction = self.fraction()?;
        let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
        Some(format!(
            "[{:<width$}] {:.2}%",
            "=".repeat(filled),
            fraction * 100.0,
            width = BAR_WIDTH
        ))
    }
}

/// Event emitted by the sync engine
#[derive(Debug)]
pub enum SyncEvent<'a> {
    /// The run moved to a new state
    StateChanged { from: SyncState, to: SyncState },
    ListingSource,
    ProbingDestination,
    /// The destination container was missing and is being created
    CreatingDestination,
    /// Dry run only: the destination container is missing and would be created
    WouldCreateDestination,
    ListingDestination,
    /// Listings were compared
    Planned { plan: &'a SyncPlan },
    /// An attempt on an item is about to start; `attempt` is zero-based and
    /// `index` one-based
    ItemStarted {
        action: ItemAction,
        attempt: u32,
        index: usize,
        total: usize,
        entry: &'a FileEntry,
        progress: Progress,
    },
    /// An attempt failed and will be retried if budget remains
    AttemptFailed {
        action: ItemAction,
        attempt: u32,
        entry: &'a FileEntry,
        error: &'a Error,
    },
    Completed { report: &'a SyncReport },
}

/// Receiver of sync progress
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent<'_>);
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {
    fn on_event(&self, _event: &SyncEvent<'_>) {}
}

/// Summary of a finished sync run
///
/// For a dry run the copy and delete counts describe what would have been
/// done, and the planned names are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub source: String,
    pub destination: String,
    /// The destination container did not exist; created unless dry run
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub destination_missing: bool,
    pub folders_ignored: usize,
    pub copied: usize,
    pub copied_bytes: u64,
    pub skipped: usize,
    pub skipped_bytes: u64,
    pub deleted: usize,
    pub deleted_bytes: u64,
    /// Failed attempts that were followed by another attempt
    pub retries: u32,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub would_copy: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub would_delete: Vec<String>,
}
