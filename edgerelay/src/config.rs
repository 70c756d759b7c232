//! Runtime configuration.
//!
//! [`Config`] doubles as the command-line definition of the binary: one
//! positional port plus two tuning knobs that can also come from the
//! environment.

use clap::Parser;

/// Bytes requested by each `read` of the relay's drain loop.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Upper bound on events returned by one wait on the poller.
pub const DEFAULT_MAX_EVENTS: usize = 64;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "edgerelay")]
#[command(about = "Accept TCP connections on PORT and copy every received byte to stdout")]
#[command(version)]
pub struct Config {
    /// Port number or service name to listen on
    #[arg(value_name = "PORT")]
    pub port: String,

    /// Size of each read from a client socket
    #[arg(
        long,
        env = "EDGERELAY_CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = parse_positive
    )]
    pub chunk_size: usize,

    /// Maximum readiness events handled per wait
    #[arg(
        long,
        env = "EDGERELAY_MAX_EVENTS",
        default_value_t = DEFAULT_MAX_EVENTS,
        value_parser = parse_positive
    )]
    pub max_events: usize,
}

impl Config {
    /// Configuration with default tuning for the given port.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events.max(1);
        self
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn single_port_argument() {
        let config = Config::try_parse_from(["edgerelay", "8080"]).unwrap();
        assert_eq!(config, Config::new("8080"));
    }

    #[test]
    fn service_names_are_accepted_verbatim() {
        let config = Config::try_parse_from(["edgerelay", "http"]).unwrap();
        assert_eq!(config.port, "http");
    }

    #[test]
    fn missing_port_is_a_usage_error() {
        let err = Config::try_parse_from(["edgerelay"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn extra_arguments_are_rejected() {
        let err = Config::try_parse_from(["edgerelay", "8080", "9090"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn tuning_flags() {
        let config = Config::try_parse_from([
            "edgerelay",
            "--chunk-size",
            "4096",
            "--max-events",
            "8",
            "7000",
        ])
        .unwrap();

        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.max_events, 8);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = Config::try_parse_from(["edgerelay", "--chunk-size", "0", "7000"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn builders_clamp_to_one() {
        let config = Config::new("0").with_chunk_size(0).with_max_events(0);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.max_events, 1);
    }
}
