//! node-provision CLI — provision one Golem node's local service set.

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;

use node_provision_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
