//! Builds the `tracing` dispatcher a workflow runs under.
//!
//! Nothing here installs a global subscriber; the caller scopes the
//! returned [`Dispatch`] to one future with `WithSubscriber`.

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::domain::LogConfig;

/// Environment variable holding a raw `EnvFilter` directive.
pub const LOG_ENV: &str = "VCH_DEBUG_LOG";

/// Stderr dispatcher filtered per `config`.
///
/// An unparsable `VCH_DEBUG_LOG` falls back to the level-based filter.
#[must_use]
pub fn dispatch(config: &LogConfig) -> Dispatch {
    let filter = EnvFilter::try_new(config.filter_directive()).unwrap_or_else(|_| {
        let fallback = LogConfig {
            env_override: None,
            ..config.clone()
        };
        EnvFilter::new(fallback.filter_directive())
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    Dispatch::new(subscriber)
}
