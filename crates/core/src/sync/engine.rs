//! Sync orchestrator
//!
//! One-way, source-authoritative reconciliation of two backends:
//!
//! 1. list the source
//! 2. probe the destination, creating its container when missing
//! 3. list the destination
//! 4. build the [`SyncPlan`]
//! 5. copy new and changed files, one at a time, in source order
//! 6. delete destination files absent from the source, in destination order
//!
//! Every copy and delete runs under the retry policy. When one item uses up
//! its attempts the whole run aborts; items already transferred stay
//! transferred.
//!
//! A dry run stops after step 4 and never writes to the destination; a
//! missing destination is reported and treated as empty.

use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::sync::plan::SyncPlan;
use crate::sync::progress::{
    ItemAction, NullObserver, Progress, SyncEvent, SyncObserver, SyncReport, SyncState,
};
use crate::sync::transfer::TransferStrategy;
use crate::traits::Backend;

/// Knobs for a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub retry: RetryPolicy,
    /// Use in-memory transfers when both backends support them
    pub allow_streaming: bool,
    /// Where spooled transfers put their temporary files
    pub temp_dir: Option<PathBuf>,
    /// Stop after planning
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            allow_streaming: true,
            temp_dir: None,
            dry_run: false,
        }
    }
}

/// Drives a single sync run between two backends
pub struct SyncEngine<'a> {
    source: &'a dyn Backend,
    destination: &'a dyn Backend,
    options: SyncOptions,
    observer: &'a dyn SyncObserver,
    cancel: CancellationToken,
    state: SyncState,
}

impl<'a> SyncEngine<'a> {
    pub fn new(source: &'a dyn Backend, destination: &'a dyn Backend) -> Self {
        Self {
            source,
            destination,
            options: SyncOptions::default(),
            observer: &NullObserver,
            cancel: CancellationToken::new(),
            state: SyncState::Init,
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn SyncObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Token checked before every item and attempt
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run the sync; any error leaves the engine in [`SyncState::Aborted`]
    pub async fn run(&mut self) -> Result<SyncReport> {
        match self.run_stages().await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::debug!(state = %self.state, error = %e, "Sync aborted");
                self.transition(SyncState::Aborted);
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self) -> Result<SyncReport> {
        self.emit(SyncEvent::ListingSource);
        let source_list = self.source.list().await?;
        self.transition(SyncState::SourceListed);

        self.emit(SyncEvent::ProbingDestination);
        let destination_missing = self.ensure_destination().await?;
        self.transition(SyncState::DestinationProbed);

        let destination_list = if destination_missing && self.options.dry_run {
            Vec::new()
        } else {
            self.emit(SyncEvent::ListingDestination);
            self.destination.list().await?
        };
        self.transition(SyncState::DestinationListed);

        let plan = SyncPlan::build(&source_list, &destination_list);
        tracing::debug!(
            folders = plan.folders.len(),
            copy = plan.copy.len(),
            skip = plan.skip.len(),
            delete = plan.delete.len(),
            "Listings compared"
        );
        self.emit(SyncEvent::Planned { plan: &plan });
        self.transition(SyncState::Diffed);

        let mut report = SyncReport {
            source: self.source.display_name(),
            destination: self.destination.display_name(),
            destination_missing,
            folders_ignored: plan.folders.len(),
            skipped: plan.skip.len(),
            skipped_bytes: plan.skip_size(),
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        if self.options.dry_run {
            report.copied = plan.copy.len();
            report.copied_bytes = plan.copy_size();
            report.deleted = plan.delete.len();
            report.deleted_bytes = plan.delete_size();
            report.would_copy = plan.copy.iter().map(|e| e.name.clone()).collect();
            report.would_delete = plan.delete.iter().map(|e| e.name.clone()).collect();
        } else {
            let strategy = TransferStrategy::select(
                self.source,
                self.destination,
                self.options.allow_streaming,
                self.options.temp_dir.as_deref(),
            );
            tracing::debug!(streaming = strategy.is_streaming(), "Transfer strategy selected");

            self.transition(SyncState::Copying);
            self.copy_pass(&plan.copy, &strategy, &mut report).await?;

            self.transition(SyncState::Deleting);
            self.delete_pass(&plan.delete, &mut report).await?;
        }

        self.transition(SyncState::Complete);
        self.emit(SyncEvent::Completed { report: &report });
        Ok(report)
    }

    /// Probe the destination, creating it when missing; returns whether it
    /// was missing
    async fn ensure_destination(&self) -> Result<bool> {
        match self.destination.test().await {
            Ok(()) => Ok(false),
            Err(Error::FolderMissing(what)) if self.options.dry_run => {
                tracing::info!(destination = %what, "Destination folder missing, dry run leaves it");
                self.emit(SyncEvent::WouldCreateDestination);
                Ok(true)
            }
            Err(Error::FolderMissing(what)) => {
                tracing::info!(destination = %what, "Destination folder missing, creating it");
                self.emit(SyncEvent::CreatingDestination);
                self.destination.create_folder().await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    async fn copy_pass(
        &self,
        items: &[FileEntry],
        strategy: &TransferStrategy,
        report: &mut SyncReport,
    ) -> Result<()> {
        let total = crate::sync::plan::total_size(items);
        let (source, destination) = (self.source, self.destination);

        for (index, entry) in items.iter().enumerate() {
            let progress = Progress::new(report.copied_bytes, total);
            report.retries += self
                .execute(ItemAction::Copy, index, items.len(), entry, progress, move || {
                    strategy.transfer(source, destination, entry)
                })
                .await?;
            report.copied += 1;
            report.copied_bytes += entry.known_size().unwrap_or(0);
        }
        Ok(())
    }

    async fn delete_pass(&self, items: &[FileEntry], report: &mut SyncReport) -> Result<()> {
        let total = crate::sync::plan::total_size(items);
        let destination = self.destination;

        for (index, entry) in items.iter().enumerate() {
            let progress = Progress::new(report.deleted_bytes, total);
            report.retries += self
                .execute(ItemAction::Delete, index, items.len(), entry, progress, move || {
                    destination.delete(&entry.name)
                })
                .await?;
            report.deleted += 1;
            report.deleted_bytes += entry.known_size().unwrap_or(0);
        }
        Ok(())
    }

    /// Run one unit of work under the retry policy, returning the number of
    /// failed attempts that preceded success
    async fn execute<F, Fut>(
        &self,
        action: ItemAction,
        index: usize,
        total: usize,
        entry: &FileEntry,
        progress: Progress,
        mut operation: F,
    ) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut failures = 0;
        retry_with_backoff(
            &self.options.retry,
            &self.cancel,
            &entry.name,
            |attempt| {
                self.emit(SyncEvent::ItemStarted {
                    action,
                    attempt,
                    index: index + 1,
                    total,
                    entry,
                    progress,
                });
                operation()
            },
            |attempt, error| {
                failures += 1;
                match error.response_body() {
                    Some(body) => tracing::warn!(
                        ?action,
                        name = %entry.name,
                        attempt,
                        error = %error,
                        detail = ?error,
                        body,
                        "Attempt failed, response body drained"
                    ),
                    None => tracing::warn!(
                        ?action,
                        name = %entry.name,
                        attempt,
                        error = %error,
                        detail = ?error,
                        "Attempt failed"
                    ),
                }
                self.emit(SyncEvent::AttemptFailed {
                    action,
                    attempt,
                    entry,
                    error,
                });
            },
        )
        .await?;

        Ok(failures)
    }

    fn transition(&mut self, to: SyncState) {
        let from = self.state;
        self.state = to;
        tracing::debug!(%from, %to, "Sync state changed");
        self.emit(SyncEvent::StateChanged { from, to });
    }

    fn emit(&self, event: SyncEvent<'_>) {
        self.observer.on_event(&event);
    }
}
