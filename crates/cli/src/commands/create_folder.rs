//! create-folder command - Create the backend's container

use clap::Args;

use super::{Context, no_arguments};

/// Create the backend's folder (directory, bucket)
#[derive(Args, Debug)]
pub struct CreateFolderArgs {
    /// Backend URL or local path
    pub url: String,

    /// Backend options (--name=value)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., value_name = "OPTIONS")]
    pub args: Vec<String>,
}

pub async fn execute(args: CreateFolderArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let (options, rest) = ctx.backend_options(&args.args);
    no_arguments("create-folder", rest)?;

    let backend = ctx.open(&args.url, options).await?;
    backend.create_folder().await?;

    ctx.formatter.success(&format!(
        "Created {}",
        ctx.formatter.style_name(&backend.display_name())
    ));
    Ok(())
}
