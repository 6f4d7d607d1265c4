use clap::Parser;
use tracing::error;

use agentpack::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config before logging so the [logging] section can shape the subscriber
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    cli::init_logging(&config.logging);

    if let Err(e) = cli.run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
