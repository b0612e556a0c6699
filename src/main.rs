use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcupdate::app::AppContext;
use mcupdate::cli::{commands, Cli, Commands, DestinationAction};
use mcupdate::config::Config;
use mcupdate::handlers::Command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Run { interval, console } => {
            commands::run(Arc::new(ctx), interval.as_deref(), console).await?;
        }
        Commands::Check => commands::one_shot(&ctx, Command::ManualCheck).await?,
        Commands::Latest => commands::one_shot(&ctx, Command::ShowLatest).await?,
        Commands::Push { feed } => commands::one_shot(&ctx, Command::Push(feed)).await?,
        Commands::Status => commands::one_shot(&ctx, Command::Status).await?,
        Commands::Destinations { action } => {
            let command = match action {
                DestinationAction::Add { id } => Command::AddDestination(Some(id)),
                DestinationAction::Remove { id } => Command::RemoveDestination(Some(id)),
                DestinationAction::List => Command::ListDestinations,
            };
            commands::one_shot(&ctx, command).await?;
        }
    }

    Ok(())
}
