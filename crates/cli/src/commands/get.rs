//! get command - Download a file from a backend

use std::path::PathBuf;

use bt_core::Error;
use clap::Args;

use super::{Context, remote_name, single_argument};

/// Download a file from a backend
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Backend URL or local path
    pub url: String,

    /// Local file followed or preceded by backend options (--name=value)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., value_name = "FILE|OPTIONS")]
    pub args: Vec<String>,
}

pub async fn execute(args: GetArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let (options, rest) = ctx.backend_options(&args.args);
    let local = PathBuf::from(single_argument("get", "filename", rest)?);

    if local.exists() {
        return Err(Error::User("File already exists, not overwriting!".to_string()).into());
    }
    let name = remote_name(&local)?;

    let backend = ctx.open(&args.url, options).await?;
    backend.get(&name, &local).await?;

    ctx.formatter.success(&format!(
        "Downloaded {} to {}",
        ctx.formatter.style_name(&name),
        local.display()
    ));
    Ok(())
}
