//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod appliance;
pub mod config;
pub mod error;
pub mod logging;
pub mod request;
pub mod session;
pub mod ssh;

pub use appliance::{
    ApplianceCandidate, ApplianceConfig, ApplianceHandle, DiagnosticBundle, DiagnosticLogs,
    select_unique,
};
pub use config::VchDebugConfig;
pub use error::{ConfigError, InputError, ResolveError, WorkflowError};
pub use logging::{LogConfig, LogLevel};
pub use request::{DebugChanges, DebugRequest, TargetConnection, TargetSelector};
pub use session::{PlatformAbout, Session};
pub use ssh::AuthorizedKey;
