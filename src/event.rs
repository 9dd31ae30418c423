use crate::source::CharSource;
use phf::phf_map;
use std::io;
use tracing::trace;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputEvent {
    Backspace,
    Tab,
    Home,
    End,
    Interrupt,
    Eof,
    KillWord,
    Enter,
    Up,
    Down,
    ShiftTab,
    Left,
    Right,
    Delete,
    Key(char),
}

pub const ESC: char = '\x1B';

/// The byte DOS `_getch` puts in front of extended keys, read as a Latin-1 character.
pub const SCAN_CODE_PREFIX: char = '\u{E0}';

/// Single characters that map straight to an event.
static CONTROLS: phf::Map<char, InputEvent> = phf_map! {
    '\x08' => InputEvent::Backspace,
    '\t' => InputEvent::Tab,
    '\x01' => InputEvent::Home,
    '\x03' => InputEvent::Interrupt,
    '\x04' => InputEvent::Eof,
    '\x05' => InputEvent::End,
    '\x17' => InputEvent::KillWord,
    '\x7F' => InputEvent::Backspace,
    '\r' => InputEvent::Enter,
    '\n' => InputEvent::Enter,
};

/// Sequences following an escape lead. The single letters are the legacy scan-code forms.
static ESCAPES: phf::Map<&'static str, InputEvent> = phf_map! {
    "[A" => InputEvent::Up,
    "H" => InputEvent::Up,
    "[B" => InputEvent::Down,
    "P" => InputEvent::Down,
    "[C" => InputEvent::Right,
    "M" => InputEvent::Right,
    "[D" => InputEvent::Left,
    "K" => InputEvent::Left,
    "[3~" => InputEvent::Delete,
    "S" => InputEvent::Delete,
    "[H" => InputEvent::Home,
    "G" => InputEvent::Home,
    "[F" => InputEvent::End,
    "O" => InputEvent::End,
    "[Z" => InputEvent::ShiftTab,
};

/// Turns a stream of characters into [`InputEvent`]s.
///
/// Escape sequences are matched against a fixed table by prefix. Once the pending
/// sequence can no longer grow into a table entry it is dropped along with the
/// characters already consumed, and decoding resumes with the next character.
#[derive(Debug, Default)]
pub struct Decoder {
    escaped: bool,
    pending: String,
    scan_code_prefix: bool,
    exhausted: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat [`SCAN_CODE_PREFIX`] as an escape lead, for console sources that
    /// report extended keys the DOS way.
    pub fn with_scan_code_prefix(mut self) -> Self {
        self.scan_code_prefix = true;
        self
    }

    /// True once the source has reported end of input.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn next_event<S: CharSource + ?Sized>(&mut self, source: &mut S) -> io::Result<InputEvent> {
        loop {
            let Some(ch) = source.read_char()? else {
                self.exhausted = true;
                self.reset_escape();
                return Ok(InputEvent::Eof);
            };

            if self.is_escape_lead(ch) {
                self.escaped = true;
                continue;
            }

            if self.escaped {
                self.pending.push(ch);
                if let Some(event) = ESCAPES.get(self.pending.as_str()) {
                    self.reset_escape();
                    return Ok(*event);
                }
                if !ESCAPES.keys().any(|seq| seq.starts_with(self.pending.as_str())) {
                    trace!(sequence = ?self.pending, "dropping unrecognized escape sequence");
                    self.reset_escape();
                }
                continue;
            }

            if let Some(event) = CONTROLS.get(&ch) {
                return Ok(*event);
            }
            if ch < ' ' {
                continue;
            }
            return Ok(InputEvent::Key(ch));
        }
    }

    fn is_escape_lead(&self, ch: char) -> bool {
        ch == ESC || (self.scan_code_prefix && ch == SCAN_CODE_PREFIX)
    }

    fn reset_escape(&mut self) {
        self.escaped = false;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Decoder, InputEvent};
    use crate::source::ByteSource;
    use pretty_assertions::assert_eq;

    fn decode_with(mut decoder: Decoder, input: &str) -> Vec<InputEvent> {
        let mut source = ByteSource::new(input.as_bytes());
        let mut events = Vec::new();
        loop {
            let event = decoder.next_event(&mut source).unwrap();
            if decoder.is_exhausted() {
                break;
            }
            events.push(event);
        }
        events
    }

    fn decode(input: &str) -> Vec<InputEvent> {
        decode_with(Decoder::new(), input)
    }

    #[test]
    fn printable_characters_become_keys() {
        assert_eq!(
            decode("hé!"),
            vec![
                InputEvent::Key('h'),
                InputEvent::Key('é'),
                InputEvent::Key('!')
            ]
        );
    }

    #[test]
    fn control_table() {
        assert_eq!(
            decode("\x08\t\x01\x03\x04\x05\x17\x7F\r\n"),
            vec![
                InputEvent::Backspace,
                InputEvent::Tab,
                InputEvent::Home,
                InputEvent::Interrupt,
                InputEvent::Eof,
                InputEvent::End,
                InputEvent::KillWord,
                InputEvent::Backspace,
                InputEvent::Enter,
                InputEvent::Enter,
            ]
        );
    }

    #[test]
    fn unmapped_controls_are_ignored() {
        assert_eq!(decode("\x02\x0Ba\x1F"), vec![InputEvent::Key('a')]);
    }

    #[test]
    fn csi_sequences() {
        assert_eq!(
            decode("\x1B[A\x1B[B\x1B[C\x1B[D\x1B[3~\x1B[H\x1B[F\x1B[Z"),
            vec![
                InputEvent::Up,
                InputEvent::Down,
                InputEvent::Right,
                InputEvent::Left,
                InputEvent::Delete,
                InputEvent::Home,
                InputEvent::End,
                InputEvent::ShiftTab,
            ]
        );
    }

    #[test]
    fn legacy_single_letter_sequences() {
        assert_eq!(
            decode("\x1BH\x1BP\x1BM\x1BK\x1BS\x1BG\x1BO"),
            vec![
                InputEvent::Up,
                InputEvent::Down,
                InputEvent::Right,
                InputEvent::Left,
                InputEvent::Delete,
                InputEvent::Home,
                InputEvent::End,
            ]
        );
    }

    #[test]
    fn unknown_sequence_drops_consumed_characters() {
        // `x` cannot start any entry, so it is swallowed with the escape.
        assert_eq!(decode("\x1Bxab"), vec![InputEvent::Key('a'), InputEvent::Key('b')]);
        // `[3` is a valid prefix, `[3x` is not.
        assert_eq!(decode("\x1B[3xy"), vec![InputEvent::Key('y')]);
    }

    #[test]
    fn ss3_prefix_resolves_to_end_early() {
        // `O` alone is a complete entry, so the `A` of an SS3 arrow is a plain key.
        assert_eq!(decode("\x1BOA"), vec![InputEvent::End, InputEvent::Key('A')]);
    }

    #[test]
    fn escape_inside_sequence_keeps_pending() {
        assert_eq!(decode("\x1B[\x1BA"), vec![InputEvent::Up]);
    }

    #[test]
    fn end_of_input_reports_eof_repeatedly() {
        let mut decoder = Decoder::new();
        let mut source = ByteSource::new(&b"\x1B["[..]);
        assert_eq!(decoder.next_event(&mut source).unwrap(), InputEvent::Eof);
        assert!(decoder.is_exhausted());
        assert_eq!(decoder.next_event(&mut source).unwrap(), InputEvent::Eof);
    }

    #[test]
    fn scan_code_prefix_is_opt_in() {
        assert_eq!(decode("\u{E0}K"), vec![InputEvent::Key('\u{E0}'), InputEvent::Key('K')]);
        assert_eq!(
            decode_with(Decoder::new().with_scan_code_prefix(), "\u{E0}K\u{E0}M"),
            vec![InputEvent::Left, InputEvent::Right]
        );
    }

    #[test]
    fn raw_scan_code_bytes_need_a_latin1_source() {
        let mut decoder = Decoder::new().with_scan_code_prefix();
        let mut source = ByteSource::new(&b"\xE0K\xE0S"[..]).latin1();
        assert_eq!(decoder.next_event(&mut source).unwrap(), InputEvent::Left);
        assert_eq!(decoder.next_event(&mut source).unwrap(), InputEvent::Delete);
        assert_eq!(decoder.next_event(&mut source).unwrap(), InputEvent::Eof);
    }
}
