//! svinit core - platform-independent supervision model
//!
//! This crate provides the configuration, signal model, process traits and
//! the supervisor loop that platform-specific crates plug into.

pub mod config;
pub mod error;
pub mod process;
pub mod signal;
pub mod stdio;
pub mod supervisor;

pub use config::*;
pub use error::*;
pub use process::*;
pub use signal::*;
pub use stdio::*;
pub use supervisor::*;
