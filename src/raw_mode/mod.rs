//! Raw mode: input arrives a byte at a time, without echo, line buffering or
//! signal generation, for exactly as long as a read is in progress.
//!
//! Several platform facilities can do this, so each one is a [`RawMode`]
//! backend. [`RawModeController::probe`] picks one once at startup and
//! [`RawModeController::with_raw_mode`] brackets a read with it, restoring the
//! previous settings on every way out of the body, panics included.

#[cfg(windows)]
mod console;
#[cfg(unix)]
mod stty;
mod terminal_lib;
#[cfg(unix)]
mod termios;

#[cfg(windows)]
pub use console::ConsoleRawMode;
#[cfg(unix)]
pub use stty::SttyRawMode;
pub use terminal_lib::CrosstermRawMode;
#[cfg(unix)]
pub use termios::TermiosRawMode;

use crate::{
    error::Result,
    source::{CharSource, InputDevice},
};
use std::{fmt, str::FromStr};
use tracing::{debug, info, warn};

pub trait RawMode {
    fn name(&self) -> &'static str;
    /// Save the current settings of `device` and switch it to raw input.
    fn disable(&mut self, device: InputDevice<'_>) -> Result<()>;
    /// Put back whatever [`RawMode::disable`] saved. Does nothing if nothing was saved.
    fn restore(&mut self) -> Result<()>;
}

/// Used when no facility is available; input stays line buffered.
#[derive(Debug, Default)]
pub struct NoRawMode;

impl RawMode for NoRawMode {
    fn name(&self) -> &'static str {
        "none"
    }

    fn disable(&mut self, _device: InputDevice<'_>) -> Result<()> {
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BackendKind {
    #[default]
    Auto,
    Termios,
    Crossterm,
    Stty,
    Console,
    Disabled,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Auto => "auto",
            BackendKind::Termios => "termios",
            BackendKind::Crossterm => "crossterm",
            BackendKind::Stty => "stty",
            BackendKind::Console => "console",
            BackendKind::Disabled => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "termios" => Ok(BackendKind::Termios),
            "crossterm" => Ok(BackendKind::Crossterm),
            "stty" => Ok(BackendKind::Stty),
            "console" => Ok(BackendKind::Console),
            "none" | "disabled" => Ok(BackendKind::Disabled),
            other => Err(format!(
                "unknown raw mode backend {other:?} (expected auto, termios, crossterm, stty, console or none)"
            )),
        }
    }
}

pub struct RawModeController {
    backend: Box<dyn RawMode>,
}

impl RawModeController {
    pub fn new(backend: Box<dyn RawMode>) -> Self {
        Self { backend }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(NoRawMode))
    }

    /// Select a backend. `Auto` tries termios, crossterm, then `stty` on Unix and
    /// the console on Windows; a forced kind that is unsupported here falls back to
    /// no raw mode. Probing looks at standard input.
    pub fn probe(kind: BackendKind) -> Self {
        let backend = match kind {
            BackendKind::Auto => probe_auto(),
            forced => forced_backend(forced).unwrap_or_else(|| {
                warn!(backend = %forced, "raw mode backend unsupported on this platform");
                Box::new(NoRawMode)
            }),
        };
        info!(backend = backend.name(), "selected raw mode backend");
        Self::new(backend)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run `body` with `source` in raw mode.
    ///
    /// Sources that are not terminals run `body` unchanged. If the backend cannot
    /// switch modes the failure is logged and `body` runs with cooked input.
    pub fn with_raw_mode<S, T, F>(&mut self, source: &mut S, body: F) -> Result<T>
    where
        S: CharSource + ?Sized,
        F: FnOnce(&mut S) -> Result<T>,
    {
        if !source.is_terminal() {
            return body(source);
        }
        let _guard = match RawModeGuard::acquire(&mut *self.backend, source.device()) {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "continuing without raw mode");
                None
            }
        };
        body(source)
    }
}

impl fmt::Debug for RawModeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawModeController")
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Restores the terminal when dropped.
pub struct RawModeGuard<'a> {
    backend: &'a mut dyn RawMode,
}

impl<'a> RawModeGuard<'a> {
    pub fn acquire(backend: &'a mut dyn RawMode, device: InputDevice<'_>) -> Result<Self> {
        backend.disable(device)?;
        debug!(backend = backend.name(), "raw mode on");
        Ok(Self { backend })
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        match self.backend.restore() {
            Ok(()) => debug!(backend = self.backend.name(), "raw mode off"),
            Err(err) => warn!(backend = self.backend.name(), error = %err, "failed to restore terminal"),
        }
    }
}

#[cfg(unix)]
fn probe_auto() -> Box<dyn RawMode> {
    if TermiosRawMode::available() {
        return Box::new(TermiosRawMode::new());
    }
    if CrosstermRawMode::available() {
        return Box::new(CrosstermRawMode::new());
    }
    if SttyRawMode::available() {
        return Box::new(SttyRawMode::new());
    }
    Box::new(NoRawMode)
}

#[cfg(windows)]
fn probe_auto() -> Box<dyn RawMode> {
    Box::new(ConsoleRawMode::new())
}

#[cfg(not(any(unix, windows)))]
fn probe_auto() -> Box<dyn RawMode> {
    Box::new(NoRawMode)
}

fn forced_backend(kind: BackendKind) -> Option<Box<dyn RawMode>> {
    match kind {
        #[cfg(unix)]
        BackendKind::Termios => Some(Box::new(TermiosRawMode::new())),
        #[cfg(windows)]
        BackendKind::Console => Some(Box::new(ConsoleRawMode::new())),
        BackendKind::Crossterm => Some(Box::new(CrosstermRawMode::new())),
        #[cfg(unix)]
        BackendKind::Stty => Some(Box::new(SttyRawMode::new())),
        BackendKind::Disabled => Some(Box::new(NoRawMode)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendKind, RawMode, RawModeController};
    use crate::{
        error::{Error, Result},
        source::{ByteSource, InputDevice},
    };
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, io, panic, rc::Rc};

    #[derive(Clone, Default)]
    struct Calls(Rc<RefCell<Vec<&'static str>>>);

    struct RecordingRawMode {
        calls: Calls,
        fail_disable: bool,
    }

    impl RawMode for RecordingRawMode {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn disable(&mut self, _device: InputDevice<'_>) -> Result<()> {
            if self.fail_disable {
                return Err(Error::device("recording", io::Error::other("no tty")));
            }
            self.calls.0.borrow_mut().push("disable");
            Ok(())
        }

        fn restore(&mut self) -> Result<()> {
            self.calls.0.borrow_mut().push("restore");
            Ok(())
        }
    }

    fn controller(fail_disable: bool) -> (RawModeController, Calls) {
        let calls = Calls::default();
        let backend = RecordingRawMode {
            calls: calls.clone(),
            fail_disable,
        };
        (RawModeController::new(Box::new(backend)), calls)
    }

    #[test]
    fn restores_after_normal_return() {
        let (mut raw, calls) = controller(false);
        let mut source = ByteSource::new(&b""[..]).terminal(true);
        let value = raw
            .with_raw_mode(&mut source, |_| {
                assert_eq!(*calls.0.borrow(), vec!["disable"]);
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(*calls.0.borrow(), vec!["disable", "restore"]);
    }

    #[test]
    fn restores_before_error_propagates() {
        let (mut raw, calls) = controller(false);
        let mut source = ByteSource::new(&b""[..]).terminal(true);
        let result: Result<()> = raw.with_raw_mode(&mut source, |_| Err(Error::Interrupted));
        assert!(matches!(result, Err(Error::Interrupted)));
        assert_eq!(*calls.0.borrow(), vec!["disable", "restore"]);
    }

    #[test]
    fn restores_on_panic() {
        let (mut raw, calls) = controller(false);
        let mut source = ByteSource::new(&b""[..]).terminal(true);
        let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let _ = raw.with_raw_mode(&mut source, |_| -> Result<()> { panic!("boom") });
        }));
        assert!(outcome.is_err());
        assert_eq!(*calls.0.borrow(), vec!["disable", "restore"]);
    }

    #[test]
    fn skips_non_terminal_sources() {
        let (mut raw, calls) = controller(false);
        let mut source = ByteSource::new(&b""[..]);
        raw.with_raw_mode(&mut source, |_| Ok(())).unwrap();
        assert!(calls.0.borrow().is_empty());
    }

    #[test]
    fn degrades_when_device_unavailable() {
        let (mut raw, calls) = controller(true);
        let mut source = ByteSource::new(&b""[..]).terminal(true);
        let ran = raw.with_raw_mode(&mut source, |_| Ok(true)).unwrap();
        assert!(ran);
        assert!(calls.0.borrow().is_empty());
    }

    #[test]
    fn backend_kind_round_trips_names() {
        for kind in [
            BackendKind::Auto,
            BackendKind::Termios,
            BackendKind::Crossterm,
            BackendKind::Stty,
            BackendKind::Console,
            BackendKind::Disabled,
        ] {
            assert_eq!(kind.to_string().parse::<BackendKind>(), Ok(kind));
        }
        assert!("tty".parse::<BackendKind>().is_err());
    }

    #[test]
    fn forced_disabled_backend() {
        assert_eq!(RawModeController::probe(BackendKind::Disabled).backend_name(), "none");
    }
}
