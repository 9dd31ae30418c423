use super::RawMode;
use crate::{
    error::{Error, Result},
    source::InputDevice,
};
use crossterm::terminal;

const NAME: &str = "console";

/// Windows console input mode.
///
/// crossterm clears `ENABLE_LINE_INPUT`, `ENABLE_ECHO_INPUT` and
/// `ENABLE_PROCESSED_INPUT` with `SetConsoleMode` on the console input handle and
/// restores the saved mode.
#[derive(Default)]
pub struct ConsoleRawMode {
    enabled: bool,
}

impl ConsoleRawMode {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawMode for ConsoleRawMode {
    fn name(&self) -> &'static str {
        NAME
    }

    fn disable(&mut self, _device: InputDevice<'_>) -> Result<()> {
        terminal::enable_raw_mode().map_err(|e| Error::device(NAME, e))?;
        self.enabled = true;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.enabled {
            self.enabled = false;
            terminal::disable_raw_mode()?;
        }
        Ok(())
    }
}
