//! Defines the command-line interface for the application.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cover-merge",
    version,
    about = "Prepend a cover and table of contents to a generated .docx body."
)]
pub struct Cli {
    /// The cover document. Its title placeholder is replaced and its page setup is kept.
    #[arg(value_name = "PREFIX")]
    pub prefix: PathBuf,

    /// The generated body document appended after the cover.
    #[arg(value_name = "BODY")]
    pub body: PathBuf,

    /// Where to write the merged document.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Text that replaces the placeholder in the cover.
    #[arg(short, long, value_name = "TITLE", allow_hyphen_values = true)]
    pub title: Option<String>,

    /// The placeholder token to replace. [default: {{TITLE}}]
    #[arg(long, value_name = "TOKEN")]
    pub placeholder: Option<String>,

    /// Read merge options from a JSON, YAML or TOML file. Flags override its values.
    #[arg(short, long, value_name = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Keep the body's table borders as they are.
    #[arg(long)]
    pub no_table_borders: bool,
}
