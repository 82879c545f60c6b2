//! bt - backend tool
//!
//! Lists, transfers and synchronizes files between storage backends
//! addressed by URL (`file://`, `s3://`, or a plain local path).

use std::path::PathBuf;

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_code;
mod output;

use commands::{Commands, Context};
use exit_code::ExitCode;
use output::{Formatter, OutputConfig};

/// Backend tool: list, transfer and synchronize files between storage backends
#[derive(Parser, Debug)]
#[command(name = "bt", version, about, long_about = None)]
#[command(after_help = "Backend options are given as --name=value after the backend URL.\n\
Credentials may also come from the AUTH_USERNAME and AUTH_PASSWORD environment variables.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print full error detail and debug logs
    #[arg(long, global = true)]
    pub debug_output: bool,

    /// Directory for temporary files used by spooled transfers
    #[arg(long, global = true, value_name = "DIR")]
    pub tempdir: Option<PathBuf>,
}

fn init_tracing(debug_output: bool) {
    let default_level = if debug_output { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors, --help and --version all end here
            let _ = e.print();
            return ExitCode::Usage.into();
        }
    };

    init_tracing(cli.global.debug_output);

    let formatter = Formatter::new(OutputConfig {
        json: cli.global.json,
        no_color: cli.global.no_color,
        quiet: cli.global.quiet,
    });
    if !formatter.colors_enabled() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let mut ctx = Context::new(cli.global, formatter.clone());
    let result = commands::execute(cli.command, &mut ctx).await;
    exit_code::finish(result, ctx.debug_output(), &formatter).into()
}
