//! Board logic for the Fab-O-Matic access terminal.
//!
//! The three tightly coupled pieces live here: the [`Machine`] power and
//! session state machine, the [`AuthProvider`] that decides who may use it,
//! and the [`BoardLogic`] orchestrator that reacts to badge taps and
//! periodic ticks, drives both, and renders every observable state to the
//! peripherals.

pub mod auth;
pub mod board;
pub mod machine;
pub mod messages;
pub mod status;

pub use auth::{AuthProvider, WhiteListEntry};
pub use board::{BoardIdentity, BoardLogic};
pub use machine::{Machine, MachineConfig, PowerControl, PowerState};
pub use status::Status;
