use anyhow::Result;
use clap::Parser;
use tracing::error;

mod api;
mod chain;
mod cli;
mod config;
mod engine;
mod lander;

use cli::args::{Cli, Launch};
use cli::context::{init_configs, init_tracing, load_configuration};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match Launch::from(cli.command) {
        Launch::Init(args) => return init_configs(args),
        Launch::Configured(command) => command,
    };

    let config = load_configuration(cli.config)?;
    init_tracing(&config.global.logging)?;

    if let Err(err) = cli::run(command, config).await {
        error!(target: "set_issuer", error = %err, "执行失败，已中止");
        eprintln!("Aborting: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
