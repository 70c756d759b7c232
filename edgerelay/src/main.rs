//! edgerelay binary
//!
//! Listens on the given port and writes everything clients send to stdout.
//! Connection events are logged to stderr.

use clap::Parser;
use edgerelay::{Config, Error, Reactor};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = Config::parse();

    // stdout carries relayed bytes, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match serve(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(config: &Config) -> edgerelay::Result<()> {
    let mut reactor = Reactor::new(config, io::stdout().lock())?;

    let addr = reactor
        .local_addr()
        .map_err(|e| Error::Setup {
            context: "failed to read the listening address",
            source: e,
        })?;
    info!("listening on {}", addr);

    reactor.run()
}
