use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RAWFIX_LOG";

/// Install the stderr subscriber. `RAWFIX_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "warn,rawfix=debug,rawfix_core=debug"
    } else {
        "warn"
    };
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize logging: {error}"))?;

    tracing::debug!("logging initialized");
    Ok(())
}
