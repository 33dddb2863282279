//! selfup - application self-update CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use selfup_cli::cmd::{self, Context};
use selfup_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for command results.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::from_cli(&cli);

    match cli.command {
        Commands::Platform => cmd::platform::platform(&ctx),
        Commands::Check => cmd::check::check(&ctx).await,
        Commands::Download => cmd::download::download(&ctx).await,
        Commands::Unpack { file } => cmd::unpack::unpack(&ctx, &file).await,
        Commands::Install { target } => cmd::install::install(&ctx, &target).await,
        Commands::Run { exe, args } => cmd::run::run(&ctx, &exe, &args),
        Commands::Update => cmd::update::update(&ctx).await,
    }
}
