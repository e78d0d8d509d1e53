//! Mock character LCD capturing rendered frames for assertions.

use fabomatic_core::constants::{LCD_COLS, LCD_ROWS};
use tokio::sync::watch;

use crate::error::Result;
use crate::traits::Display;
use crate::types::BoardInfo;

/// One pushed frame: the visible rows plus the status glyphs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub rows: [String; LCD_ROWS],
    pub info: BoardInfo,
}

/// Mock LCD. Created together with its [`MockLcdHandle`].
#[derive(Debug)]
pub struct MockLcd {
    rows: [String; LCD_ROWS],
    last: Option<Frame>,
    frame_tx: watch::Sender<Frame>,
    draws: u32,
}

/// Test-side view of what a [`MockLcd`] last displayed.
#[derive(Debug, Clone)]
pub struct MockLcdHandle {
    frame_rx: watch::Receiver<Frame>,
}

impl MockLcd {
    /// Create a display/handle pair.
    pub fn new() -> (Self, MockLcdHandle) {
        let (frame_tx, frame_rx) = watch::channel(Frame::default());
        (
            Self {
                rows: Default::default(),
                last: None,
                frame_tx,
                draws: 0,
            },
            MockLcdHandle { frame_rx },
        )
    }

    /// How many frames were actually pushed (unchanged frames are skipped).
    pub fn draw_count(&self) -> u32 {
        self.draws
    }
}

impl Display for MockLcd {
    async fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.rows = Default::default();
        Ok(())
    }

    fn set_row(&mut self, row: usize, text: &str) {
        if row < LCD_ROWS {
            self.rows[row] = text.chars().take(LCD_COLS).collect();
        }
    }

    async fn update(&mut self, info: BoardInfo, forced: bool) -> Result<()> {
        let frame = Frame {
            rows: self.rows.clone(),
            info,
        };
        if !forced && self.last.as_ref() == Some(&frame) {
            return Ok(());
        }
        self.draws += 1;
        self.last = Some(frame.clone());
        let _ = self.frame_tx.send(frame);
        Ok(())
    }
}

impl MockLcdHandle {
    /// The most recently pushed frame.
    pub fn frame(&self) -> Frame {
        self.frame_rx.borrow().clone()
    }

    /// Convenience accessor for one visible row.
    pub fn row(&self, row: usize) -> String {
        self.frame_rx.borrow().rows.get(row).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rows_truncated_to_panel_width() {
        let (mut lcd, handle) = MockLcd::new();
        lcd.set_row(0, "this line is much longer than sixteen columns");
        lcd.update(BoardInfo::default(), true).await.unwrap();
        assert_eq!(handle.row(0).len(), LCD_COLS);
    }

    #[tokio::test]
    async fn test_unchanged_frame_not_redrawn() {
        let (mut lcd, _handle) = MockLcd::new();
        lcd.set_row(0, "Machine libre");
        let info = BoardInfo {
            backend_online: true,
            ..BoardInfo::default()
        };
        lcd.update(info, false).await.unwrap();
        lcd.update(info, false).await.unwrap();
        assert_eq!(lcd.draw_count(), 1);

        lcd.update(info, true).await.unwrap();
        assert_eq!(lcd.draw_count(), 2);
    }
}
