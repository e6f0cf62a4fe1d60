use clap::Parser;
use swapi_dataloader::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Load(args) => cli::load::run(args).await,
    }
}
