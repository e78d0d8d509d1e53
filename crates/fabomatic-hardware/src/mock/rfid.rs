//! Mock RFID reader for testing and development.
//!
//! Simulates a short-range polled reader: a test presents or removes a card
//! through the handle, and the device reports it through the polling API.

use std::sync::Arc;

use fabomatic_core::CardUid;
use tokio::sync::Mutex;

use crate::error::{HardwareError, Result};
use crate::traits::RfidReader;

#[derive(Debug, Default)]
struct RfidState {
    present: Option<CardUid>,
    /// Current card already delivered through `read_card_serial`.
    announced: bool,
    self_test_ok: bool,
    initialized: bool,
    resets: u32,
}

/// Mock RFID reader. Created together with its [`MockRfidHandle`].
#[derive(Debug)]
pub struct MockRfid {
    state: Arc<Mutex<RfidState>>,
}

/// Test-side control over a [`MockRfid`].
#[derive(Debug, Clone)]
pub struct MockRfidHandle {
    state: Arc<Mutex<RfidState>>,
}

impl MockRfid {
    /// Create a reader/handle pair.
    pub fn new() -> (Self, MockRfidHandle) {
        let state = Arc::new(Mutex::new(RfidState {
            self_test_ok: true,
            ..RfidState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockRfidHandle { state },
        )
    }
}

impl RfidReader for MockRfid {
    async fn init(&mut self) -> Result<()> {
        self.state.lock().await.initialized = true;
        Ok(())
    }

    async fn is_new_card_present(&mut self) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.present.is_some() && !state.announced)
    }

    async fn read_card_serial(&mut self) -> Result<CardUid> {
        let mut state = self.state.lock().await;
        match state.present {
            Some(uid) => {
                state.announced = true;
                Ok(uid)
            }
            None => Err(HardwareError::card_read("no card in field")),
        }
    }

    async fn card_still_there(&mut self, uid: CardUid) -> Result<bool> {
        Ok(self.state.lock().await.present == Some(uid))
    }

    async fn self_test(&mut self) -> Result<()> {
        if self.state.lock().await.self_test_ok {
            Ok(())
        } else {
            Err(HardwareError::self_test_failed("mock RFID"))
        }
    }

    async fn reset(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.resets += 1;
        state.self_test_ok = true;
        Ok(())
    }
}

impl MockRfidHandle {
    /// Put a card in the reader's field.
    pub async fn present_card(&self, uid: CardUid) {
        let mut state = self.state.lock().await;
        state.present = Some(uid);
        state.announced = false;
    }

    /// Remove the card from the field.
    pub async fn remove_card(&self) {
        let mut state = self.state.lock().await;
        state.present = None;
        state.announced = false;
    }

    /// Make the next self-test fail (until the device is reset).
    pub async fn fail_self_test(&self) {
        self.state.lock().await.self_test_ok = false;
    }

    /// How many times the device was reset.
    pub async fn reset_count(&self) -> u32 {
        self.state.lock().await.resets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_card_presentation_cycle() {
        let (mut reader, handle) = MockRfid::new();
        reader.init().await.unwrap();
        assert!(!reader.is_new_card_present().await.unwrap());

        let uid = CardUid::new(0xAABBCCD1);
        handle.present_card(uid).await;
        assert!(reader.is_new_card_present().await.unwrap());
        assert_eq!(reader.read_card_serial().await.unwrap(), uid);

        // Same card is not "new" twice, but it is still in range.
        assert!(!reader.is_new_card_present().await.unwrap());
        assert!(reader.card_still_there(uid).await.unwrap());

        handle.remove_card().await;
        assert!(!reader.card_still_there(uid).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_test_and_reset() {
        let (mut reader, handle) = MockRfid::new();
        assert!(reader.self_test().await.is_ok());

        handle.fail_self_test().await;
        assert!(reader.self_test().await.is_err());

        reader.reset().await.unwrap();
        assert!(reader.self_test().await.is_ok());
        assert_eq!(handle.reset_count().await, 1);
    }
}
