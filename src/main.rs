//! Beltmon CLI entry point.

use clap::Parser;

use beltmon::cli::commands::{dispatch, init};
use beltmon::cli::{handle_error, load_config, AppContext, Cli, Commands};
use beltmon::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let _logger = LoggerImpl::init(&LogConfig::try_from(&config.logging)?)?;

    match cli.command {
        Commands::Init(args) => init::execute(args, &config, cli.json).await,
        command => {
            let ctx = AppContext::open(config).await?;
            let result = dispatch(command, &ctx, cli.json).await;
            ctx.pool.close().await;
            result
        }
    }
}
