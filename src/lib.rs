pub mod completion;
pub mod error;
pub mod event;
pub mod harness;
pub mod line_editor;
pub mod logging;
pub mod raw_mode;
pub mod rewind;
pub mod session;
pub mod source;
pub mod writer;

pub use completion::{Choices, Completer};
pub use error::{Error, Result};
pub use event::{Decoder, InputEvent};
pub use line_editor::{LineEditor, ReadOptions, ReadOutcome, read_char, read_event, read_line};
pub use raw_mode::{BackendKind, RawMode, RawModeController};
pub use rewind::{ResumePoint, RewindStack};
pub use session::{Asked, Question, Session, SessionConfig};
pub use source::{ByteSource, CharSource, InputDevice};
