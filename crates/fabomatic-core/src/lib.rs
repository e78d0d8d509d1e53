//! Shared vocabulary for the Fab-O-Matic access terminal.
//!
//! Card identifiers, user privilege levels, machine identity and the
//! constants every other crate agrees on.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
