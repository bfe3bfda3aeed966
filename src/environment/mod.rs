//! Environment detection module.
//!
//! Resolves the process-wide facts the parsers depend on (operating system and USER_HZ)
//! once at startup, and determines whether the sensor runs on the host or inside a
//! container.
mod checks;
mod detect;
mod error;

pub use detect::{HostEnvironment, RuntimeEnvironment, detect, detect_runtime_environment};
pub use error::{Error, Result};
