pub mod types;
pub mod version;

pub use types::*;
pub use version::{BuildVersion, VersionError};
