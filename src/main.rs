use clap::Parser;
use log::LevelFilter;

use chordring::config::{Cli, Config};
use chordring::shell::Shell;

const DEFAULT_PORT: u16 = 3410;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli);

    let level = if config.dev { LevelFilter::Debug } else { LevelFilter::Info };
    simple_logger::SimpleLogger::new().env().with_level(level).init()?;

    let default_port = config
        .grpc_address
        .as_deref()
        .and_then(|addr| addr.rsplit(':').next())
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let mut shell = Shell::new(config, default_port);
    shell.bootstrap().await;
    shell.run().await;
    Ok(())
}
