//! relman - Entry Point
//!
//! Creates, validates and promotes release manifests.

use clap::Parser;

use relman::app::options::Cli;
use relman::app::render::print_error;
use relman::app::run::{run, EXIT_FAILURE};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&e);
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}
