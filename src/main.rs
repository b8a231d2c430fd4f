mod cli;
mod commands;
mod error;
mod model;
mod util;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::ExtractionError;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_tracing();

    if let Err(err) = run(cli) {
        if let Some(extraction) = err.downcast_ref::<ExtractionError>() {
            eprint!("{}", extraction.stderr);
            std::process::exit(extraction.code);
        }

        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    commands::convert::run(cli.convert)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
