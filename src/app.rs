use crate::cli::Cli;
use anyhow::Context;
use clap::Parser;
use cover_merge_lib::{merge_files, MergeOptions};
use log::debug;

pub fn run() -> anyhow::Result<()> {
    env_logger::init();

    let Cli {
        prefix,
        body,
        output,
        title,
        placeholder,
        config,
        no_table_borders,
    } = Cli::parse();

    let mut options = match &config {
        Some(path) => MergeOptions::from_path(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => MergeOptions::default(),
    };

    if let Some(title) = title {
        options.title = Some(title);
    }
    if let Some(placeholder) = placeholder {
        options.placeholder = placeholder;
    }
    if no_table_borders {
        options.borders.enabled = false;
    }
    debug!("Merge options: {options:?}");

    merge_files(&prefix, &body, &output, &options).with_context(|| {
        format!(
            "Failed to merge {} and {} into {}",
            prefix.display(),
            body.display(),
            output.display()
        )
    })?;

    println!("Merged document written to {}", output.display());
    Ok(())
}
