//! Mock peripheral implementations for testing and development.
//!
//! Each mock comes as a (device, handle) pair: the device side implements
//! the peripheral trait and is handed to the board logic, the handle side
//! stays with the test to inject inputs and observe outputs.

pub mod display;
pub mod feedback;
pub mod rfid;

pub use display::{Frame, MockLcd, MockLcdHandle};
pub use feedback::{Beep, MockBuzzer, MockBuzzerHandle, MockLed, MockLedHandle};
pub use rfid::{MockRfid, MockRfidHandle};
