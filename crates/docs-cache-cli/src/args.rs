//! Command-line surface for `docs-cache-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "docs-cache-cli", version, about = "docs-cache maintenance CLI", long_about = None)]
pub struct Cli {
    /// Base URL of the docs-cache server, e.g. <http://localhost:3000>
    #[arg(long, env = "DOCS_CACHE_SITE_URL")]
    pub site: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove cached documentation pages by key
    Invalidate(InvalidateArgs),
}

#[derive(Args, Debug)]
pub struct InvalidateArgs {
    /// Cache keys, i.e. paths below the cached namespace such as
    /// `default/component/svc/index.html`
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,

    /// Read additional keys from a file, one per line (`#` starts a comment)
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,
}
