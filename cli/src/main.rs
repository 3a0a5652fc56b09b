mod discover;

use clap::Parser;
use clap::Subcommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Discover(options) => crate::discover::discover(options).await?,
        Command::Interfaces => crate::discover::print_interfaces()?,
    };
    Ok(())
}

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover devices on every local network interface
    Discover(crate::discover::DiscoverOptions),

    /// List the local addresses discovery probes from
    Interfaces,
}
