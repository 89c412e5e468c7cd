//! docs-cache-cli: out-of-band maintenance client for a docs-cache server.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod io;

use clap::Parser;

use args::{Cli, Commands, InvalidateArgs};
use client::{CliError, Ctx, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::Invalidate(args) => invalidate(&ctx, args).await?,
    }

    Ok(())
}

async fn invalidate(ctx: &Ctx, args: InvalidateArgs) -> Result<(), CliError> {
    let keys = io::collect_keys(args.keys, args.from_file.as_deref())?;
    let count = keys.len();
    ctx.invalidate(keys).await?;
    println!("invalidated {count} cache entries");
    Ok(())
}
