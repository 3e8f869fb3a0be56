use anyhow::Result;
use clap::Parser;
use lanscout::cli::{Cli, Commands};
use lanscout::output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Scan(cmd) => {
            let settings = cli.settings()?;
            cmd.execute(settings).await
        }
        Commands::Service(cmd) => {
            cmd.execute();
            Ok(())
        }
    }
}
