//! delete command - Remove a file from a backend

use std::path::Path;

use clap::Args;

use super::{Context, remote_name, single_argument};

/// Delete a file from a backend
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Backend URL or local path
    pub url: String,

    /// File name followed or preceded by backend options (--name=value)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., value_name = "FILE|OPTIONS")]
    pub args: Vec<String>,
}

pub async fn execute(args: DeleteArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let (options, rest) = ctx.backend_options(&args.args);
    let file = single_argument("delete", "filename", rest)?;
    let name = remote_name(Path::new(&file))?;

    let backend = ctx.open(&args.url, options).await?;
    backend.delete(&name).await?;

    ctx.formatter
        .success(&format!("Deleted {}", ctx.formatter.style_name(&name)));
    Ok(())
}
