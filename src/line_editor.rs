use crate::{
    completion::Completer,
    error::{Error, Result},
    event::{Decoder, InputEvent},
    raw_mode::RawModeController,
    rewind::{ResumePoint, RewindStack},
    source::CharSource,
    writer::LineWriter,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, Write};
use tracing::debug;

lazy_static! {
    /// A run of non-space characters and the spaces after it, up to the cursor.
    static ref KILL_WORD_RE: Regex = Regex::new(r"[^\s]*\s*$").unwrap();
}

/// How a call to [`read_line`] ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// The user asked to go back; the line being typed was thrown away.
    Rewind(ResumePoint),
}

#[derive(Default)]
pub struct ReadOptions<'a> {
    mask: Option<String>,
    completer: Option<&'a dyn Completer>,
    rewind: Option<&'a mut RewindStack>,
    initial: String,
    scan_code_prefix: bool,
}

impl<'a> ReadOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `mask` in place of every typed character.
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn completer(mut self, completer: &'a dyn Completer) -> Self {
        self.completer = Some(completer);
        self
    }

    /// Let Up and Shift-Tab pop this stack and abandon the read.
    pub fn rewind(mut self, stack: &'a mut RewindStack) -> Self {
        self.rewind = Some(stack);
        self
    }

    /// Start with `text` already typed, cursor at its end.
    pub fn initial(mut self, text: impl Into<String>) -> Self {
        self.initial = text.into();
        self
    }

    /// Decode `U+00E0` as an escape lead. Pair with [`ByteSource::latin1`].
    ///
    /// [`ByteSource::latin1`]: crate::source::ByteSource::latin1
    pub fn scan_code_prefix(mut self) -> Self {
        self.scan_code_prefix = true;
        self
    }

    fn decoder(&self) -> Decoder {
        if self.scan_code_prefix {
            Decoder::new().with_scan_code_prefix()
        } else {
            Decoder::new()
        }
    }
}

#[derive(Debug, Default)]
struct EditState {
    buffer: Vec<char>,
    cursor: usize,
    done: bool,
}

pub enum EditorAction {
    Continue,
    Submit,
    Rewind(ResumePoint),
}

/// Applies input events to an answer buffer and keeps the terminal line in step.
pub struct LineEditor<'a, W> {
    state: EditState,
    writer: LineWriter<W>,
    completer: Option<&'a dyn Completer>,
    rewind: Option<&'a mut RewindStack>,
}

impl<'a, W: Write> LineEditor<'a, W> {
    pub fn new(out: W, options: ReadOptions<'a>) -> io::Result<Self> {
        let mut editor = Self {
            state: EditState::default(),
            writer: LineWriter::new(out, options.mask),
            completer: options.completer,
            rewind: options.rewind,
        };
        if !options.initial.is_empty() {
            editor.state.buffer = options.initial.chars().collect();
            editor.state.cursor = editor.state.buffer.len();
            editor.writer.display(&editor.state.buffer)?;
            editor.writer.flush()?;
        }
        Ok(editor)
    }

    pub fn input(&self) -> String {
        self.state.buffer.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn is_done(&self) -> bool {
        self.state.done
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    pub fn handle_event(&mut self, event: InputEvent) -> Result<EditorAction> {
        if self.state.done {
            return Ok(EditorAction::Submit);
        }
        match event {
            InputEvent::Right => self.move_right()?,
            InputEvent::Left => self.move_left()?,
            InputEvent::Delete => self.delete()?,
            InputEvent::Backspace => self.backspace()?,
            InputEvent::Home => self.move_to(0)?,
            InputEvent::End => self.move_to(self.state.buffer.len())?,
            InputEvent::KillWord => self.kill_word()?,
            InputEvent::Tab => self.complete()?,
            InputEvent::Key(ch) => self.insert(ch)?,
            InputEvent::Interrupt => return Err(Error::Interrupted),
            InputEvent::Eof => {
                if self.state.buffer.is_empty() {
                    self.state.done = true;
                }
            }
            InputEvent::Enter => self.state.done = true,
            InputEvent::Up | InputEvent::ShiftTab => {
                if let Some(point) = self.rewind.as_deref_mut().and_then(RewindStack::rewind_once) {
                    return Ok(EditorAction::Rewind(point));
                }
            }
            // Forward history is not a thing.
            InputEvent::Down => {}
        }
        self.writer.flush()?;
        if self.state.done {
            Ok(EditorAction::Submit)
        } else {
            Ok(EditorAction::Continue)
        }
    }

    fn move_left(&mut self) -> io::Result<()> {
        let cursor = self.state.cursor;
        if cursor == 0 {
            return Ok(());
        }
        let columns = self.writer.width(&self.state.buffer[cursor - 1..cursor]);
        self.writer.back(columns)?;
        self.state.cursor -= 1;
        Ok(())
    }

    fn move_right(&mut self) -> io::Result<()> {
        let cursor = self.state.cursor;
        if cursor == self.state.buffer.len() {
            return Ok(());
        }
        self.writer.display(&self.state.buffer[cursor..=cursor])?;
        self.state.cursor += 1;
        Ok(())
    }

    fn move_to(&mut self, target: usize) -> io::Result<()> {
        self.writer
            .goto_cursor(&self.state.buffer, self.state.cursor, target)?;
        self.state.cursor = target;
        Ok(())
    }

    fn insert(&mut self, ch: char) -> io::Result<()> {
        let cursor = self.state.cursor;
        self.state.buffer.insert(cursor, ch);
        let shifted = &self.state.buffer[cursor..];
        self.writer.display(shifted)?;
        let rest = self.writer.width(&shifted[1..]);
        self.writer.back(rest)?;
        self.state.cursor += 1;
        Ok(())
    }

    fn delete(&mut self) -> io::Result<()> {
        let cursor = self.state.cursor;
        if cursor == self.state.buffer.len() {
            return Ok(());
        }
        let removed = self.state.buffer.remove(cursor);
        let gap = self.writer.width(&[removed]);
        self.redraw_tail(gap)
    }

    fn backspace(&mut self) -> io::Result<()> {
        if self.state.cursor == 0 {
            return Ok(());
        }
        self.state.cursor -= 1;
        let removed = self.state.buffer.remove(self.state.cursor);
        let gap = self.writer.width(&[removed]);
        self.writer.back(gap)?;
        self.redraw_tail(gap)
    }

    fn kill_word(&mut self) -> io::Result<()> {
        let cursor = self.state.cursor;
        if cursor == 0 {
            return Ok(());
        }
        let head: String = self.state.buffer[..cursor].iter().collect();
        let start = KILL_WORD_RE
            .find(&head)
            .map_or(cursor, |m| head[..m.start()].chars().count());
        if start == cursor {
            return Ok(());
        }
        let gap = self.writer.width(&self.state.buffer[start..cursor]);
        self.state.buffer.drain(start..cursor);
        self.state.cursor = start;
        self.writer.back(gap)?;
        self.redraw_tail(gap)
    }

    /// Redraw everything after the cursor, blank the `gap` columns the line
    /// shrank by, and return to the cursor.
    fn redraw_tail(&mut self, gap: usize) -> io::Result<()> {
        let tail = &self.state.buffer[self.state.cursor..];
        self.writer.display(tail)?;
        self.writer.clear(gap)?;
        let columns = self.writer.width(tail);
        self.writer.back(columns)
    }

    fn complete(&mut self) -> io::Result<()> {
        let typed = self.input();
        let mut matches = self
            .completer
            .map(|completer| completer.complete(&typed))
            .unwrap_or_default();
        matches.retain(|candidate| candidate.starts_with(&typed));
        let [completion] = matches.as_slice() else {
            return self.writer.bell();
        };
        // The completion extends what was typed, so only the part past the cursor
        // needs drawing.
        let cursor = self.state.cursor;
        self.state.buffer = completion.chars().collect();
        self.writer.display(&self.state.buffer[cursor..])?;
        self.state.cursor = self.state.buffer.len();
        Ok(())
    }
}

/// Read one line from `source`, echoing edits to `out`.
///
/// Ends on Enter, on Ctrl-D with nothing typed, or when the source runs dry. A
/// rewind abandons the line and hands back the popped [`ResumePoint`].
pub fn read_line<S, W>(
    source: &mut S,
    out: W,
    raw: &mut RawModeController,
    options: ReadOptions<'_>,
) -> Result<ReadOutcome>
where
    S: CharSource + ?Sized,
    W: Write,
{
    let mut decoder = options.decoder();
    let mut editor = LineEditor::new(out, options)?;
    raw.with_raw_mode(source, |source| {
        loop {
            let event = decoder.next_event(source)?;
            debug!(?event, "input event");
            match editor.handle_event(event)? {
                EditorAction::Continue if !decoder.is_exhausted() => {}
                EditorAction::Continue | EditorAction::Submit => {
                    return Ok(ReadOutcome::Line(editor.input()));
                }
                EditorAction::Rewind(point) => {
                    debug!(step = point.step(), "rewinding");
                    return Ok(ReadOutcome::Rewind(point));
                }
            }
        }
    })
}

/// Read one decoded event in raw mode. `decoder` keeps its settings and end-of-input
/// state across calls.
pub fn read_event<S>(
    source: &mut S,
    raw: &mut RawModeController,
    decoder: &mut Decoder,
) -> Result<InputEvent>
where
    S: CharSource + ?Sized,
{
    raw.with_raw_mode(source, |source| Ok(decoder.next_event(source)?))
}

/// Read one character in raw mode. `None` at end of input.
pub fn read_char<S>(source: &mut S, raw: &mut RawModeController) -> Result<Option<char>>
where
    S: CharSource + ?Sized,
{
    raw.with_raw_mode(source, |source| Ok(source.read_char()?))
}
