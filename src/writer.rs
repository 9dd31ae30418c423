use std::io::{self, Write};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const BACKSPACE: &[u8] = b"\x08";
const BELL: &[u8] = b"\x07";

/// Writes the redraw primitives for a single input line.
///
/// Everything is measured in display columns. With an echo mask every character
/// occupies the width of the mask, whatever the character itself is.
pub struct LineWriter<W> {
    out: W,
    mask: Option<String>,
}

impl<W: Write> LineWriter<W> {
    pub fn new(out: W, mask: Option<String>) -> Self {
        Self { out, mask }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn width(&self, text: &[char]) -> usize {
        match &self.mask {
            Some(mask) => mask.width() * text.len(),
            None => text.iter().map(|c| c.width().unwrap_or(0)).sum(),
        }
    }

    /// Print `text` through the mask; the terminal cursor advances past it.
    pub fn display(&mut self, text: &[char]) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let rendered: String = match &self.mask {
            Some(mask) => mask.repeat(text.len()),
            None => text.iter().collect(),
        };
        self.out.write_all(rendered.as_bytes())
    }

    /// Move the terminal cursor left by `columns`.
    pub fn back(&mut self, columns: usize) -> io::Result<()> {
        self.out.write_all(&BACKSPACE.repeat(columns))
    }

    /// Blank out `columns` cells and return to where the blanking started.
    pub fn clear(&mut self, columns: usize) -> io::Result<()> {
        if columns == 0 {
            return Ok(());
        }
        self.out.write_all(" ".repeat(columns).as_bytes())?;
        self.back(columns)
    }

    /// Move the terminal cursor from logical position `from` to `to` within `buffer`.
    pub fn goto_cursor(&mut self, buffer: &[char], from: usize, to: usize) -> io::Result<()> {
        if to > from {
            self.display(&buffer[from..to])
        } else {
            let columns = self.width(&buffer[to..from]);
            self.back(columns)
        }
    }

    pub fn bell(&mut self) -> io::Result<()> {
        self.out.write_all(BELL)
    }

    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
