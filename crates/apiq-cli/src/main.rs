use apiq_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Falls back to stderr when the state dir is not writable.
    logging::init();

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("apiq error: {:#}", err);
        std::process::exit(1);
    }
}
