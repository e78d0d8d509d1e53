//! Settings persistence for the Fab-O-Matic access terminal.
//!
//! One versioned JSON blob holds everything that must survive a power
//! cycle: broker credentials, machine identity, the undelivered-message
//! snapshot, and the card cache. Loading is forgiving (a corrupt or
//! incompatible blob reads as absent), saving is atomic.

pub mod error;
pub mod settings;
pub mod store;

pub use error::{Result, StorageError};
pub use settings::{CachedCard, SavedSettings};
pub use store::{FileSettingsStore, SettingsStore};
