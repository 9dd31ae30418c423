use super::RawMode;
use crate::{
    error::{Error, Result},
    source::InputDevice,
};
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::{
    io,
    os::fd::{AsFd, OwnedFd},
};

const NAME: &str = "termios";

/// POSIX terminal attributes on the source's device.
///
/// Clears ECHO, ICANON, ISIG and IEXTEN and asks for reads of at least one byte.
/// Output processing is left alone so a bare `\n` still returns the carriage.
#[derive(Default)]
pub struct TermiosRawMode {
    saved: Option<(OwnedFd, Termios)>,
}

impl TermiosRawMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available() -> bool {
        termios::tcgetattr(io::stdin().as_fd()).is_ok()
    }
}

impl RawMode for TermiosRawMode {
    fn name(&self) -> &'static str {
        NAME
    }

    fn disable(&mut self, device: InputDevice<'_>) -> Result<()> {
        let fd = device.try_clone_fd().map_err(|e| Error::device(NAME, e))?;
        let before = termios::tcgetattr(&fd).map_err(|e| Error::device(NAME, e))?;

        let mut raw = before.clone();
        raw.local_flags
            .remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG | LocalFlags::IEXTEN);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(&fd, SetArg::TCSANOW, &raw).map_err(|e| Error::device(NAME, e))?;
        self.saved = Some((fd, before));
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        let Some((fd, before)) = self.saved.take() else {
            return Ok(());
        };
        termios::tcsetattr(&fd, SetArg::TCSANOW, &before).map_err(|e| Error::Io(e.into()))
    }
}
