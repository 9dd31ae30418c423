use std::io::{self, IsTerminal, Read};
use std::marker::PhantomData;
#[cfg(unix)]
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

/// Something characters can be pulled from one at a time.
pub trait CharSource {
    /// Blocks until a full character is available. `None` means end of input.
    fn read_char(&mut self) -> io::Result<Option<char>>;

    /// Whether the source is an interactive terminal that raw mode applies to.
    fn is_terminal(&self) -> bool {
        false
    }

    /// The terminal raw mode should reconfigure for this source.
    fn device(&self) -> InputDevice<'_> {
        InputDevice::stdin()
    }
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        (**self).read_char()
    }

    fn is_terminal(&self) -> bool {
        (**self).is_terminal()
    }

    fn device(&self) -> InputDevice<'_> {
        (**self).device()
    }
}

/// The terminal device behind a source. Defaults to the process's standard input.
#[derive(Copy, Clone, Debug, Default)]
pub struct InputDevice<'a> {
    #[cfg(unix)]
    fd: Option<BorrowedFd<'a>>,
    _source: PhantomData<&'a ()>,
}

impl<'a> InputDevice<'a> {
    pub fn stdin() -> Self {
        Self::default()
    }

    #[cfg(unix)]
    pub fn from_fd(fd: BorrowedFd<'a>) -> Self {
        Self {
            fd: Some(fd),
            _source: PhantomData,
        }
    }

    /// A descriptor for the device that stays valid after the source is borrowed again.
    #[cfg(unix)]
    pub fn try_clone_fd(&self) -> io::Result<OwnedFd> {
        match self.fd {
            Some(fd) => fd.try_clone_to_owned(),
            None => io::stdin().as_fd().try_clone_to_owned(),
        }
    }
}

/// Decodes UTF-8 from any byte reader, one character per call.
pub struct ByteSource<R> {
    reader: R,
    terminal: bool,
    latin1: bool,
    /// A byte that ended a broken UTF-8 sequence; it starts the next character.
    lookahead: Option<u8>,
    #[cfg(unix)]
    device: Option<OwnedFd>,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            terminal: false,
            latin1: false,
            lookahead: None,
            #[cfg(unix)]
            device: None,
        }
    }

    /// Mark the reader as an interactive terminal so raw mode is applied to it.
    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// Read every byte as one ISO 8859-1 character instead of decoding UTF-8.
    /// DOS-style consoles send extended keys as a raw 0xE0 byte and a letter.
    pub fn latin1(mut self) -> Self {
        self.latin1 = true;
        self
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.lookahead.take() {
            return Ok(Some(byte));
        }
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(unix)]
impl<R: Read + AsFd> ByteSource<R> {
    /// Read from a terminal other than standard input, e.g. an opened `/dev/tty`.
    /// Raw mode is applied to this reader's device.
    pub fn for_terminal(reader: R) -> io::Result<Self> {
        let fd = reader.as_fd();
        let terminal = fd.is_terminal();
        let device = fd.try_clone_to_owned()?;
        Ok(Self {
            terminal,
            device: Some(device),
            ..Self::new(reader)
        })
    }
}

impl ByteSource<io::Stdin> {
    pub fn stdin() -> Self {
        let stdin = io::stdin();
        let terminal = stdin.is_terminal();
        Self::new(stdin).terminal(terminal)
    }
}

impl<R: Read> CharSource for ByteSource<R> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };
        if self.latin1 {
            return Ok(Some(char::from(lead)));
        }
        let len = match lead {
            0x00..=0x7F => return Ok(Some(char::from(lead))),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };
        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            match self.read_byte()? {
                Some(b) if b & 0xC0 == 0x80 => *slot = b,
                Some(b) => {
                    self.lookahead = Some(b);
                    return Ok(Some(char::REPLACEMENT_CHARACTER));
                }
                None => return Ok(Some(char::REPLACEMENT_CHARACTER)),
            }
        }
        let ch = std::str::from_utf8(&buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Ok(Some(ch))
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    #[cfg(unix)]
    fn device(&self) -> InputDevice<'_> {
        match &self.device {
            Some(fd) => InputDevice::from_fd(fd.as_fd()),
            None => InputDevice::stdin(),
        }
    }
}
