//! Command implementations
//!
//! Every command returns `anyhow::Result<()>`; the outcome is reported once
//! by the handler in `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bt_backends::Registry;
use bt_core::options::{DEBUG_OUTPUT, TEMPDIR};
use bt_core::{Backend, BackendOptions, Config, ConfigManager, Error};
use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};

use crate::GlobalOptions;
use crate::output::Formatter;

pub mod completions;
pub mod create_folder;
pub mod delete;
pub mod get;
pub mod list;
pub mod put;
pub mod sync;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the files and folders of a backend
    List(list::ListArgs),

    /// Download a file from a backend
    Get(get::GetArgs),

    /// Upload a local file to a backend
    Put(put::PutArgs),

    /// Delete a file from a backend
    Delete(delete::DeleteArgs),

    /// Create the backend's folder (directory, bucket)
    #[command(name = "create-folder", alias = "createfolder")]
    CreateFolder(create_folder::CreateFolderArgs),

    /// Make a destination backend match a source backend
    Sync(sync::SyncArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Dispatch a parsed command
pub async fn execute(command: Commands, ctx: &mut Context) -> anyhow::Result<()> {
    if let Commands::Completions(args) = command {
        return completions::execute(args);
    }

    ctx.load_config()?;

    match command {
        Commands::List(args) => list::execute(args, ctx).await,
        Commands::Get(args) => get::execute(args, ctx).await,
        Commands::Put(args) => put::execute(args, ctx).await,
        Commands::Delete(args) => delete::execute(args, ctx).await,
        Commands::CreateFolder(args) => create_folder::execute(args, ctx).await,
        Commands::Sync(args) => sync::execute(args, ctx).await,
        Commands::Completions(_) => Ok(()),
    }
}

/// State shared by all commands of one invocation
pub struct Context {
    pub formatter: Formatter,
    pub global: GlobalOptions,
    pub registry: Registry,
    config: Config,
    debug_output: bool,
}

impl Context {
    pub fn new(global: GlobalOptions, formatter: Formatter) -> Self {
        let debug_output = global.debug_output;
        Self {
            formatter,
            global,
            registry: Registry::builtin(),
            config: Config::default(),
            debug_output,
        }
    }

    fn load_config(&mut self) -> bt_core::Result<()> {
        let manager = ConfigManager::new()?;
        self.config = manager.load()?;
        tracing::debug!(path = %manager.config_path().display(), "Loaded configuration");
        self.debug_output |= self.config.debug_output;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether failures should print full detail
    pub fn debug_output(&self) -> bool {
        self.debug_output
    }

    /// Split backend options from positional arguments
    ///
    /// `--debug-output` among the backend options also turns on full error
    /// detail.
    pub fn backend_options(&mut self, args: &[String]) -> (BackendOptions, Vec<String>) {
        let (options, rest) = BackendOptions::parse(args);
        let options = options.with_env_fallback();
        self.debug_output |= options.flag(DEBUG_OUTPUT);
        (options, rest)
    }

    /// Spool directory: `--tempdir` flag, then the first backend option
    /// that names one, then config
    pub fn temp_dir(&self, options: &[&BackendOptions]) -> Option<PathBuf> {
        self.global
            .tempdir
            .clone()
            .or_else(|| options.iter().find_map(|o| o.value(TEMPDIR)).map(PathBuf::from))
            .or_else(|| self.config.temp_dir.clone())
    }

    pub async fn open(
        &self,
        location: &str,
        options: BackendOptions,
    ) -> bt_core::Result<Box<dyn Backend>> {
        self.registry.open(location, options).await
    }
}

/// The single positional argument of `command`
pub fn single_argument(command: &str, what: &str, rest: Vec<String>) -> bt_core::Result<String> {
    let mut rest = rest.into_iter();
    match (rest.next(), rest.next()) {
        (Some(arg), None) => Ok(arg),
        (None, _) => Err(Error::User(format!(
            "{} requires a {what} argument",
            command.to_uppercase()
        ))),
        (Some(_), Some(extra)) => Err(Error::User(format!(
            "Too many arguments for {command}: '{extra}'"
        ))),
    }
}

/// Reject positional arguments for commands that take none
pub fn no_arguments(command: &str, rest: Vec<String>) -> bt_core::Result<()> {
    match rest.first() {
        None => Ok(()),
        Some(extra) => Err(Error::User(format!(
            "Too many arguments for {command}: '{extra}'"
        ))),
    }
}

/// Remote name for a local path: its file-name component
pub fn remote_name(local: &Path) -> bt_core::Result<String> {
    local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::User(format!("'{}' does not name a file", local.display())))
}

/// Spinner shown while waiting on a backend; hidden in JSON and quiet mode
pub fn spinner(formatter: &Formatter, message: &str) -> ProgressBar {
    if !formatter.show_progress() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
