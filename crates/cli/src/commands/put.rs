//! put command - Upload a local file to a backend

use std::path::PathBuf;

use bt_core::Error;
use clap::Args;

use super::{Context, remote_name, single_argument};

/// Upload a local file to a backend
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Backend URL or local path
    pub url: String,

    /// Local file followed or preceded by backend options (--name=value)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., value_name = "FILE|OPTIONS")]
    pub args: Vec<String>,
}

pub async fn execute(args: PutArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let (options, rest) = ctx.backend_options(&args.args);
    let local = PathBuf::from(single_argument("put", "filename", rest)?);

    if !local.is_file() {
        return Err(Error::User(format!("File not found: {}", local.display())).into());
    }
    let name = remote_name(&local)?;

    let backend = ctx.open(&args.url, options).await?;
    backend.put(&name, &local).await?;

    ctx.formatter.success(&format!(
        "Uploaded {} to {}",
        ctx.formatter.style_name(&name),
        backend.display_name()
    ));
    Ok(())
}
