//! Command implementations

pub mod debug;
pub mod version;
