mod calendar;
mod cli;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod operations;
mod scheduler;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::init_tracing(cli.log.as_deref());

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
