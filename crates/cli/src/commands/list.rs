//! list command - Show the files and folders of a backend

use bt_core::FileEntry;
use clap::Args;
use comfy_table::{Table, presets};
use serde::Serialize;

use super::{Context, no_arguments, spinner};

/// List the files and folders of a backend
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Backend URL or local path
    pub url: String,

    /// Backend options (--name=value)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., value_name = "OPTIONS")]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ListOutput<'a> {
    backend: String,
    entries: &'a [FileEntry],
}

pub async fn execute(args: ListArgs, ctx: &mut Context) -> anyhow::Result<()> {
    let (options, rest) = ctx.backend_options(&args.args);
    no_arguments("list", rest)?;

    let backend = ctx.open(&args.url, options).await?;

    let pb = spinner(&ctx.formatter, "Listing files...");
    let listing = backend.list().await;
    pb.finish_and_clear();
    let entries = listing?;

    if ctx.formatter.is_json() {
        ctx.formatter.json(&ListOutput {
            backend: backend.display_name(),
            entries: &entries,
        });
    } else {
        ctx.formatter.println(&render_table(&entries));
    }
    Ok(())
}

fn render_table(entries: &[FileEntry]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_header(vec!["Name", "Dir/File", "LastChange", "Size"]);

    for entry in entries {
        let kind = if entry.is_folder { "Dir" } else { "File" };
        let modified = entry
            .last_modified
            .map(|t| t.strftime("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            entry.name.clone(),
            kind.to_string(),
            modified,
            entry.size_human(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_columns() {
        let modified: jiff::Timestamp = "2024-03-01T10:20:30Z".parse().unwrap();
        let entries = vec![
            FileEntry::file("backup-b1.dblock", 2048).with_modified(modified),
            FileEntry::folder("old"),
        ];

        let table = render_table(&entries);
        let lines: Vec<&str> = table.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Name") && lines[0].contains("LastChange"));
        assert!(lines[1].contains("backup-b1.dblock"));
        assert!(lines[1].contains("File"));
        assert!(lines[1].contains("2024-03-01 10:20:30"));
        assert!(lines[1].contains("2 KiB"));
        assert!(lines[2].contains("old") && lines[2].contains("Dir"));
    }

    #[test]
    fn test_empty_listing_has_only_header() {
        let table = render_table(&[]);
        assert_eq!(table.lines().filter(|l| !l.trim().is_empty()).count(), 1);
    }
}
