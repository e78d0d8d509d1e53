//! Peripheral trait definitions.
//!
//! These traits establish the contract between the board logic and its
//! peripherals (RFID reader, character LCD, buzzer, status LED), enabling
//! substitution between mock and real hardware implementations.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use fabomatic_core::CardUid;
use fabomatic_core::constants::LCD_ROWS;

use crate::error::Result;
use crate::types::{BoardInfo, LedColor};

/// An RFID/NFC card reader, polled rather than event-driven.
///
/// The polling model mirrors short-range readers: the logic loop asks
/// whether a new card entered the field, reads its serial, and afterwards
/// keeps asking whether that same card is still in range.
pub trait RfidReader: Send {
    /// Initialize the reader.
    async fn init(&mut self) -> Result<()>;

    /// Whether a card entered the field since the last read.
    async fn is_new_card_present(&mut self) -> Result<bool>;

    /// Read the serial of the card in the field.
    async fn read_card_serial(&mut self) -> Result<CardUid>;

    /// Whether the given card is still in range.
    async fn card_still_there(&mut self, uid: CardUid) -> Result<bool>;

    /// Run the hardware self-test.
    async fn self_test(&mut self) -> Result<()>;

    /// Reset the reader chip after a failed self-test.
    async fn reset(&mut self) -> Result<()>;
}

/// A small character LCD with status glyphs.
pub trait Display: Send {
    /// Initialize the display.
    async fn begin(&mut self) -> Result<()>;

    /// Blank the display.
    async fn clear(&mut self) -> Result<()>;

    /// Set one text row. Rows beyond [`LCD_ROWS`] are ignored; text is
    /// truncated to the column count by the implementation.
    fn set_row(&mut self, row: usize, text: &str);

    /// Push the current rows and glyphs to the panel. Implementations skip
    /// the redraw when nothing changed unless `forced` is set.
    async fn update(&mut self, info: BoardInfo, forced: bool) -> Result<()>;
}

/// Helper to fill all rows at once.
pub fn set_rows<D: Display>(display: &mut D, rows: &[String; LCD_ROWS]) {
    for (i, text) in rows.iter().enumerate() {
        display.set_row(i, text);
    }
}

/// Audible feedback.
pub trait Buzzer: Send {
    /// Short confirmation beep.
    async fn beep_ok(&mut self) -> Result<()>;

    /// Longer refusal beep.
    async fn beep_fail(&mut self) -> Result<()>;
}

/// Status LED.
pub trait StatusLed: Send {
    async fn set_color(&mut self, color: LedColor) -> Result<()>;
}
