use tracing_subscriber::EnvFilter;

use crate::CliError;

/// Initialize stderr logging; `RUST_LOG` overrides the default level.
pub fn init() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::Logging(err.to_string()))
}
