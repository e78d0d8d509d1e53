//! Peripheral abstraction layer for the Fab-O-Matic access terminal.
//!
//! This crate defines trait-based abstractions for the board's peripherals
//! (RFID reader, character LCD, buzzer, status LED) plus programmable mock
//! implementations, so the board logic can run and be tested without
//! physical hardware.
//!
//! All I/O operations are asynchronous using native `async fn` in traits
//! (Rust 1.90 + Edition 2024 RPITIT).

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result};
pub use traits::{Buzzer, Display, RfidReader, StatusLed};
pub use types::{BoardInfo, LedColor};
