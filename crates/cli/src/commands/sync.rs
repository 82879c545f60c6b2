//! sync command - Make a destination backend match a source backend
//!
//! Arguments are `<source-url> [source options] <destination-url>
//! [destination options]`: the first argument after the source URL that is
//! not an option starts the destination.

use std::sync::Mutex;

use bt_core::options::DISABLE_STREAMING;
use bt_core::sync::{ItemAction, SyncState};
use bt_core::{BackendOptions, Error, SyncEngine, SyncEvent, SyncObserver, SyncOptions};
use clap::Args;
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;

use super::{Context, no_arguments, spinner};
use crate::output::Formatter;

/// Backend option equivalent of `--dry-run`
const DRY_RUN: &str = "dry-run";

/// Make a destination backend match a source backend
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Only compare the listings and report what would change
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Always spool transfers through a temporary file
    #[arg(long)]
    pub disable_streaming_transfers: bool,

    /// Source backend URL or local path
    pub source: String,

    /// Source options, then the destination URL and its options
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 1..,
        value_name = "OPTIONS|DESTINATION"
    )]
    pub args: Vec<String>,
}

pub async fn execute(args: SyncArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let (source_args, destination_args) = split_backends(&args.args);
    let Some((destination_url, destination_args)) = destination_args.split_first() else {
        return Err(
            Error::User("SYNC requires parameters for a second backend".to_string()).into(),
        );
    };

    let (source_options, _) = ctx.backend_options(source_args);
    let (destination_options, rest) = ctx.backend_options(destination_args);
    no_arguments("sync", rest)?;

    let options = sync_options(&args, ctx, &source_options, &destination_options);

    let source = ctx.open(&args.source, source_options).await?;
    let destination = ctx.open(destination_url, destination_options).await?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        let formatter = ctx.formatter.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                formatter.warning("Interrupted, stopping after the current attempt");
                cancel.cancel();
            }
        })
    };

    let observer = ConsoleObserver::new(ctx.formatter.clone());
    let mut engine = SyncEngine::new(source.as_ref(), destination.as_ref())
        .with_options(options)
        .with_observer(&observer)
        .with_cancellation(cancel);

    let result = engine.run().await;
    interrupt.abort();
    observer.clear_spinner();

    let report = result?;
    if ctx.formatter.is_json() {
        ctx.formatter.json(&report);
    }
    Ok(())
}

/// Split at the first argument that is not an option
fn split_backends(args: &[String]) -> (&[String], &[String]) {
    let first_positional = args
        .iter()
        .position(|a| !a.starts_with("--"))
        .unwrap_or(args.len());
    args.split_at(first_positional)
}

fn sync_options(
    args: &SyncArgs,
    ctx: &Context,
    source: &BackendOptions,
    destination: &BackendOptions,
) -> SyncOptions {
    let settings = &ctx.config().sync;
    let backends = [source, destination];

    let disable_streaming =
        args.disable_streaming_transfers || backends.iter().any(|o| o.flag(DISABLE_STREAMING));
    let dry_run = args.dry_run || backends.iter().any(|o| o.flag(DRY_RUN));

    SyncOptions {
        retry: settings.retry_policy(),
        allow_streaming: settings.streaming && !disable_streaming,
        temp_dir: ctx.temp_dir(&backends),
        dry_run,
    }
}

/// One piece of console output for a sync event
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// A phase is starting; a spinner runs until the next line
    Phase(String),
    Info(String),
    Bar(String),
    Warning(String),
    Success(String),
}

fn size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Console lines for one event
fn render(event: &SyncEvent<'_>) -> Vec<Line> {
    match event {
        SyncEvent::StateChanged { .. } => Vec::new(),
        SyncEvent::ListingSource => vec![Line::Phase("Listing source files...".into())],
        SyncEvent::ProbingDestination => {
            vec![Line::Phase("Ensuring folder exists on destination...".into())]
        }
        SyncEvent::CreatingDestination => {
            vec![Line::Phase("Creating folder on destination...".into())]
        }
        SyncEvent::WouldCreateDestination => {
            vec![Line::Info("Destination folder is missing, it would be created".into())]
        }
        SyncEvent::ListingDestination => {
            vec![Line::Phase("Listing destination files...".into())]
        }
        SyncEvent::Planned { plan } => {
            let mut lines = Vec::new();
            if !plan.folders.is_empty() {
                lines.push(Line::Info(format!("Ignoring {} folders", plan.folders.len())));
            }
            if !plan.copy.is_empty() {
                lines.push(Line::Info(format!(
                    "Syncing  {} files ({})",
                    plan.copy.len(),
                    size(plan.copy_size())
                )));
            }
            if !plan.skip.is_empty() {
                lines.push(Line::Info(format!(
                    "Skipping {} files ({})",
                    plan.skip.len(),
                    size(plan.skip_size())
                )));
            }
            if !plan.delete.is_empty() {
                lines.push(Line::Info(format!(
                    "Deleting {} files ({}) from destination",
                    plan.delete.len(),
                    size(plan.delete_size())
                )));
            }
            lines
        }
        SyncEvent::ItemStarted {
            action,
            attempt,
            index,
            total,
            entry,
            progress,
        } => {
            let verb = match action {
                ItemAction::Copy => "Syncing",
                ItemAction::Delete => "Deleting",
            };
            let mut line = format!("{index}/{total} {verb} {}", entry.name);
            if let Some(bytes) = entry.known_size() {
                line.push_str(&format!(" ({})", size(bytes)));
            }
            if *attempt > 0 {
                line.push_str(&format!(" [retry {attempt}]"));
            }

            let mut lines = vec![Line::Info(line)];
            if let Some(bar) = progress.render() {
                lines.push(Line::Bar(bar));
            }
            lines
        }
        SyncEvent::AttemptFailed {
            attempt,
            entry,
            error,
            ..
        } => {
            let mut lines = vec![Line::Warning(format!(
                "Caught error on attempt {} for '{}': {}",
                attempt + 1,
                entry.name,
                describe(error)
            ))];
            if let Some(body) = error.response_body() {
                lines.push(Line::Warning(format!("Response body: {body}")));
            }
            lines
        }
        SyncEvent::Completed { report } if report.dry_run => {
            let mut lines = Vec::new();
            if !report.would_copy.is_empty() {
                lines.push(Line::Info(format!(
                    "Would copy {} file(s) ({}):",
                    report.would_copy.len(),
                    size(report.copied_bytes)
                )));
                lines.extend(report.would_copy.iter().map(|n| Line::Info(format!("  {n}"))));
            }
            if !report.would_delete.is_empty() {
                lines.push(Line::Info(format!(
                    "Would delete {} file(s) ({}):",
                    report.would_delete.len(),
                    size(report.deleted_bytes)
                )));
                lines.extend(report.would_delete.iter().map(|n| Line::Info(format!("  {n}"))));
            }
            lines.push(Line::Success("Dry run complete, no changes made".into()));
            lines
        }
        SyncEvent::Completed { .. } => vec![Line::Success("Sync complete".into())],
    }
}

/// Error text with its status and source chain
fn describe(error: &Error) -> String {
    let mut text = error.to_string();
    if let Some(status) = error.status() {
        text.push_str(&format!(" (status {status})"));
    }

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

/// Prints sync progress as lines of text
struct ConsoleObserver {
    formatter: Formatter,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    fn new(formatter: Formatter) -> Self {
        Self {
            formatter,
            spinner: Mutex::new(None),
        }
    }

    fn clear_spinner(&self) {
        let mut guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn start_spinner(&self) {
        let mut guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(spinner(&self.formatter, ""));
    }
}

impl SyncObserver for ConsoleObserver {
    fn on_event(&self, event: &SyncEvent<'_>) {
        if let SyncEvent::StateChanged { from, to } = event {
            if *to == SyncState::Aborted {
                tracing::debug!(%from, "Sync aborted");
            }
            return;
        }

        self.clear_spinner();
        for line in render(event) {
            match line {
                Line::Phase(text) => {
                    self.formatter.println(&text);
                    self.start_spinner();
                }
                Line::Info(text) => self.formatter.println(&text),
                Line::Bar(text) => self.formatter.println(&self.formatter.style_bar(&text)),
                Line::Warning(text) => self.formatter.warning(&text),
                Line::Success(text) => self.formatter.success(&text),
            }
        }
    }
}
