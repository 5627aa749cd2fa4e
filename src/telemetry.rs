//! Tracing setup. `RUST_LOG` takes precedence over the configured
//! directives so operators can raise verbosity without a settings change.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("log directives '{directives}' did not parse")]
    Directives {
        directives: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Install(#[from] TryInitError),
}

/// Install the global subscriber: an env-filtered compact formatter
/// without ANSI color, suitable for both terminals and log shippers.
pub fn init(settings: &Settings) -> Result<(), TelemetryError> {
    let directives =
        std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_directives.clone());
    let filter = EnvFilter::try_new(&directives)
        .map_err(|source| TelemetryError::Directives { directives, source })?;

    let format = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()?;
    Ok(())
}
