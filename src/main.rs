mod error;
mod config;
mod core {
    pub mod model;
    pub mod session;
    pub mod stats;
}
mod api {
    pub mod client;
}
mod cli;
mod orchestrator;
mod report;
mod spreadsheet;
#[cfg(test)]
mod test_support;

use clap::Parser;
use dotenv::dotenv;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if let Err(e) = cli::run(cli).await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
    Ok(())
}
