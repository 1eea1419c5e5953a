use clap::Parser;
use wsched_cli::cli_args::Cli;
use wsched_core::{LoggingDestination, init_logging};

fn main() {
    let cli = Cli::parse();

    let destination = if cli.log_file {
        LoggingDestination::FileAndStderr
    } else {
        LoggingDestination::StderrOnly
    };
    if let Err(err) = init_logging(destination) {
        eprintln!("Warning: logging unavailable: {err}");
    }

    if let Err(err) = wsched_cli::dispatch(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
