//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the config file.

use anyhow::Result;
use console::Term;
use tokio_util::sync::CancellationToken;
use vch_common::BuildVersion;

use crate::application::ports::ConfigStore;
use crate::domain::{LogConfig, VchDebugConfig};
use crate::infra::logging::LOG_ENV;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Number of `-d` flags given.
    pub debug: u8,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Settings from the config file, validated.
    pub config: VchDebugConfig,
    /// Log stream settings for the workflow dispatcher.
    pub log: LogConfig,
    /// Root token; cancelled on operator interrupt.
    pub cancel: CancellationToken,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read,
    /// parsed or validated.
    pub fn new(flags: &AppFlags, store: &impl ConfigStore) -> Result<Self> {
        let config = store.load()?;
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let ansi = !flags.output.no_color
            && Term::stderr().is_term()
            && std::env::var("NO_COLOR").is_err();
        let log = LogConfig::resolve(
            std::env::var(LOG_ENV).ok(),
            flags.debug,
            config.log_level()?,
            ansi,
        );

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config,
            log,
            cancel: CancellationToken::new(),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }
}

/// Version of this installer, with the build number and commit embedded
/// by `build.rs`.
#[must_use]
pub fn installer_version() -> BuildVersion {
    BuildVersion::new(
        env!("CARGO_PKG_VERSION"),
        env!("VCH_DEBUG_BUILD_NUMBER"),
        env!("VCH_DEBUG_COMMIT"),
    )
}
