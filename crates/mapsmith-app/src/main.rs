//! Main application entry point.

use clap::Parser;
use mapsmith_app::Args;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(args.log_level)
        .init();
    log::debug!("Parsed arguments: {:?}", args);

    match mapsmith_app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mapsmith: {}", err);
            ExitCode::FAILURE
        }
    }
}
