//! Mock buzzer and status LED recording the feedback they were asked for.

use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::traits::{Buzzer, StatusLed};
use crate::types::LedColor;

/// One recorded buzzer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beep {
    Ok,
    Fail,
}

/// Mock buzzer. Created together with its [`MockBuzzerHandle`].
#[derive(Debug)]
pub struct MockBuzzer {
    event_tx: mpsc::UnboundedSender<Beep>,
}

/// Receives the beeps a [`MockBuzzer`] emitted.
#[derive(Debug)]
pub struct MockBuzzerHandle {
    event_rx: mpsc::UnboundedReceiver<Beep>,
}

impl MockBuzzer {
    pub fn new() -> (Self, MockBuzzerHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Self { event_tx }, MockBuzzerHandle { event_rx })
    }
}

impl Buzzer for MockBuzzer {
    async fn beep_ok(&mut self) -> Result<()> {
        let _ = self.event_tx.send(Beep::Ok);
        Ok(())
    }

    async fn beep_fail(&mut self) -> Result<()> {
        let _ = self.event_tx.send(Beep::Fail);
        Ok(())
    }
}

impl MockBuzzerHandle {
    /// Drain every beep emitted so far.
    pub fn drain(&mut self) -> Vec<Beep> {
        let mut beeps = Vec::new();
        while let Ok(beep) = self.event_rx.try_recv() {
            beeps.push(beep);
        }
        beeps
    }
}

/// Mock status LED. Created together with its [`MockLedHandle`].
#[derive(Debug)]
pub struct MockLed {
    color_tx: watch::Sender<LedColor>,
}

/// Observes the color a [`MockLed`] currently shows.
#[derive(Debug, Clone)]
pub struct MockLedHandle {
    color_rx: watch::Receiver<LedColor>,
}

impl MockLed {
    pub fn new() -> (Self, MockLedHandle) {
        let (color_tx, color_rx) = watch::channel(LedColor::Off);
        (Self { color_tx }, MockLedHandle { color_rx })
    }
}

impl StatusLed for MockLed {
    async fn set_color(&mut self, color: LedColor) -> Result<()> {
        let _ = self.color_tx.send(color);
        Ok(())
    }
}

impl MockLedHandle {
    pub fn color(&self) -> LedColor {
        *self.color_rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_beeps_recorded_in_order() {
        let (mut buzzer, mut handle) = MockBuzzer::new();
        buzzer.beep_ok().await.unwrap();
        buzzer.beep_fail().await.unwrap();
        assert_eq!(handle.drain(), vec![Beep::Ok, Beep::Fail]);
        assert!(handle.drain().is_empty());
    }

    #[tokio::test]
    async fn test_led_reports_latest_color() {
        let (mut led, handle) = MockLed::new();
        assert_eq!(handle.color(), LedColor::Off);
        led.set_color(LedColor::Green).await.unwrap();
        led.set_color(LedColor::Red).await.unwrap();
        assert_eq!(handle.color(), LedColor::Red);
    }
}
