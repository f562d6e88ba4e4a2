mod commands;
mod config;
mod error;
mod util;

use commands::{BatchCallCli, BatchCallSubcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> miette::Result<()> {
    init_tracing();
    let args = BatchCallCli::parse_args();

    match args.command {
        BatchCallSubcommand::Run { args } => commands::run(*args).await?,

        BatchCallSubcommand::Addresses { args } => commands::addresses(args).await?,

        BatchCallSubcommand::Networks => commands::networks(),
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}
