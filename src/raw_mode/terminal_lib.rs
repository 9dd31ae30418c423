use super::RawMode;
use crate::{
    error::{Error, Result},
    source::InputDevice,
};
use crossterm::terminal;

const NAME: &str = "crossterm";

/// Raw mode through crossterm, which keeps its own copy of the original settings.
///
/// crossterm picks the terminal itself (stdin, or `/dev/tty` when stdin is not one),
/// so the source's device is not consulted. If the terminal was already raw when
/// we got here, it is left that way.
#[derive(Default)]
pub struct CrosstermRawMode {
    enabled: bool,
}

impl CrosstermRawMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available() -> bool {
        terminal::size().is_ok()
    }
}

impl RawMode for CrosstermRawMode {
    fn name(&self) -> &'static str {
        NAME
    }

    fn disable(&mut self, _device: InputDevice<'_>) -> Result<()> {
        if terminal::is_raw_mode_enabled().map_err(|e| Error::device(NAME, e))? {
            return Ok(());
        }
        terminal::enable_raw_mode().map_err(|e| Error::device(NAME, e))?;
        self.enabled = true;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if !std::mem::take(&mut self.enabled) {
            return Ok(());
        }
        terminal::disable_raw_mode()?;
        Ok(())
    }
}
