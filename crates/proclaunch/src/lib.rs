//! High-level launch facade: platform strategy registration, dispatch,
//! logging, and observer notification over the proclaunch core.

mod launcher;
mod platform;
mod std_command;

pub use launcher::*;
pub use platform::*;
pub use std_command::*;

// Re-export core functionality
pub use proclaunch_core::*;
