use crate::{
    completion::Choices,
    error::Result,
    line_editor::{ReadOptions, ReadOutcome, read_line},
    raw_mode::RawModeController,
    rewind::{ResumePoint, RewindStack},
    source::CharSource,
};
use std::io::Write;
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Question {
    text: String,
    default: Option<String>,
    choices: Choices,
    mask: Option<String>,
    forget: bool,
    checkpoint: bool,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Returned when the answer is left empty.
    pub fn default(mut self, answer: impl Into<String>) -> Self {
        self.default = Some(answer.into());
        self
    }

    /// Candidates for Tab completion.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Choices::new(choices);
        self
    }

    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// Don't offer this answer as the default when rewinding back to it.
    pub fn forget(mut self) -> Self {
        self.forget = true;
        self
    }

    /// Answers given before this question can no longer be rewound to.
    pub fn checkpoint(mut self) -> Self {
        self.checkpoint = true;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn default_answer(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// `text (choice, ...) [default]: `, leaving out the parts that are not set.
    pub fn prompt(&self) -> String {
        let mut prompt = self.text.clone();
        if !self.choices.is_empty() {
            prompt.push_str(&format!(" ({})", self.choices.as_slice().join(", ")));
        }
        if let Some(default) = &self.default {
            prompt.push_str(&format!(" [{}]", default));
        }
        prompt.push_str(": ");
        prompt
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Up and Shift-Tab go back to the previous question.
    pub rewind: bool,
    /// Decode `U+00E0` as an escape lead, for Latin-1 sources fed by DOS-style consoles.
    pub scan_code_prefix: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rewind: true,
            scan_code_prefix: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Asked {
    Answer(String),
    Rewound(ResumePoint),
}

/// Asks questions over one input source and output stream.
pub struct Session<S, W> {
    source: S,
    out: W,
    raw: RawModeController,
    rewind: RewindStack,
    config: SessionConfig,
}

impl<S: CharSource, W: Write> Session<S, W> {
    pub fn new(source: S, out: W, raw: RawModeController, config: SessionConfig) -> Self {
        Self {
            source,
            out,
            raw,
            rewind: RewindStack::new(),
            config,
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Number of answered questions that can still be rewound to.
    pub fn rewind_depth(&self) -> usize {
        self.rewind.len()
    }

    /// Make everything answered so far unreachable by rewinding. Call this once the
    /// answers have been acted on.
    pub fn finalize(&mut self) {
        self.rewind.reset();
    }

    pub fn into_parts(self) -> (S, W) {
        (self.source, self.out)
    }

    /// Ask once. An empty answer becomes the question's default, if it has one.
    ///
    /// Does not record anything for rewinding; [`Session::run`] does that.
    pub fn ask(&mut self, question: &Question) -> Result<Asked> {
        self.out.write_all(question.prompt().as_bytes())?;
        self.out.flush()?;

        let mut options = ReadOptions::new();
        if let Some(mask) = &question.mask {
            options = options.mask(mask.as_str());
        }
        if !question.choices.is_empty() {
            options = options.completer(&question.choices);
        }
        if self.config.rewind {
            options = options.rewind(&mut self.rewind);
        }
        if self.config.scan_code_prefix {
            options = options.scan_code_prefix();
        }
        let outcome = read_line(&mut self.source, &mut self.out, &mut self.raw, options)?;

        self.out.write_all(b"\n")?;
        self.out.flush()?;

        Ok(match outcome {
            ReadOutcome::Line(line) if line.is_empty() => {
                Asked::Answer(question.default.clone().unwrap_or_default())
            }
            ReadOutcome::Line(line) => Asked::Answer(line),
            ReadOutcome::Rewind(point) => Asked::Rewound(point),
        })
    }

    /// Ask every question `plan` produces until it returns `None`.
    ///
    /// `plan` sees the answers so far and picks the next question. A rewind drops
    /// the answers from the rewound question onward and asks it again with its old
    /// answer as the default, so `plan` is consulted afresh for what follows.
    pub fn run<P>(&mut self, mut plan: P) -> Result<Vec<String>>
    where
        P: FnMut(&[String]) -> Option<Question>,
    {
        self.rewind.reset();
        let mut answers: Vec<String> = Vec::new();
        let mut resumed: Option<Question> = None;
        loop {
            let question = match resumed.take() {
                Some(question) => question,
                None => match plan(&answers) {
                    Some(question) => question,
                    None => break,
                },
            };
            if question.checkpoint {
                self.finalize();
            }
            match self.ask(&question)? {
                Asked::Answer(answer) => {
                    if self.config.rewind {
                        let recorded = (!question.forget).then(|| answer.clone());
                        self.rewind
                            .remember(ResumePoint::new(answers.len(), question, recorded));
                    }
                    answers.push(answer);
                }
                Asked::Rewound(point) => {
                    debug!(step = point.step(), question = point.question().text(), "rewound");
                    answers.truncate(point.step());
                    resumed = Some(point.into_question());
                }
            }
        }
        self.rewind.reset();
        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::{Asked, Question, Session, SessionConfig};
    use crate::{error::Error, raw_mode::RawModeController, source::ByteSource};
    use pretty_assertions::assert_eq;

    fn session(input: &str, config: SessionConfig) -> Session<ByteSource<&[u8]>, Vec<u8>> {
        Session::new(
            ByteSource::new(input.as_bytes()),
            Vec::new(),
            RawModeController::disabled(),
            config,
        )
    }

    fn stdout(session: Session<ByteSource<&[u8]>, Vec<u8>>) -> String {
        String::from_utf8(session.into_parts().1).unwrap()
    }

    fn two_questions() -> impl FnMut(&[String]) -> Option<Question> {
        let questions = vec![Question::new("Name"), Question::new("Age")];
        move |answers: &[String]| questions.get(answers.len()).cloned()
    }

    #[test]
    fn prompt_shows_default() {
        assert_eq!(Question::new("Name").prompt(), "Name: ");
        assert_eq!(Question::new("Name").default("ann").prompt(), "Name [ann]: ");
    }

    #[test]
    fn prompt_lists_choices_before_default() {
        let question = Question::new("Colour").choices(["red", "blue"]);
        assert_eq!(question.prompt(), "Colour (red, blue): ");
        assert_eq!(question.default("red").prompt(), "Colour (red, blue) [red]: ");
    }

    #[test]
    fn empty_answer_takes_default() {
        let mut session = session("he\x7F\x7F\r", SessionConfig::default());
        let asked = session.ask(&Question::new("Name").default("ann")).unwrap();
        assert_eq!(asked, Asked::Answer("ann".into()));
        assert_eq!(stdout(session), "Name [ann]: he\x08 \x08\x08 \x08\n");
    }

    #[test]
    fn up_goes_back_to_previous_question() {
        let mut session = session("alice\r\x1B[A\r30\r", SessionConfig::default());
        let answers = session.run(two_questions()).unwrap();
        assert_eq!(answers, vec!["alice", "30"]);
        assert_eq!(
            stdout(session),
            "Name: alice\nAge: \nName [alice]: \nAge: 30\n"
        );
    }

    #[test]
    fn plan_is_consulted_again_after_rewind() {
        let mut session = session("alice\r\x1B[A", SessionConfig::default());
        let questions = [Question::new("Name"), Question::new("Age")];
        let mut seen = Vec::new();
        let answers = session
            .run(|answers| {
                seen.push(answers.to_vec());
                if seen.len() > 3 {
                    return None;
                }
                questions.get(answers.len()).cloned()
            })
            .unwrap();
        // Input runs out on the re-asked Name, which falls back to the old answer.
        assert_eq!(answers, vec!["alice", ""]);
        assert_eq!(
            seen,
            vec![
                vec![],
                vec!["alice".to_string()],
                vec!["alice".to_string()],
                vec!["alice".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn rewind_walks_back_one_question_per_press() {
        let mut session = session("a\rb\r\x1B[A\x1B[A\rB\r\r", SessionConfig::default());
        let questions = vec![Question::new("One"), Question::new("Two"), Question::new("Three")];
        let answers = session
            .run(|answers| questions.get(answers.len()).cloned())
            .unwrap();
        assert_eq!(answers, vec!["a", "B", ""]);
        assert_eq!(
            stdout(session),
            "One: a\nTwo: b\nThree: \nTwo [b]: \nOne [a]: \nTwo: B\nThree: \n"
        );
    }

    #[test]
    fn rewind_can_be_disabled() {
        let config = SessionConfig {
            rewind: false,
            ..SessionConfig::default()
        };
        let mut session = session("alice\r\x1B[A30\r", config);
        let answers = session.run(two_questions()).unwrap();
        assert_eq!(answers, vec!["alice", "30"]);
        assert_eq!(session.rewind_depth(), 0);
    }

    #[test]
    fn forgotten_answers_are_not_offered_back() {
        let mut session = session("secret\r\x1B[A\rnew\r", SessionConfig::default());
        let questions = vec![Question::new("Password").mask("*").forget(), Question::new("Next")];
        let answers = session
            .run(|answers| questions.get(answers.len()).cloned())
            .unwrap();
        assert_eq!(answers, vec!["", "new"]);
        assert_eq!(
            stdout(session),
            "Password: ******\nNext: \nPassword: \nNext: new\n"
        );
    }

    #[test]
    fn checkpoint_blocks_rewinding_past_it() {
        let mut session = session("a\rb\r\x1B[A\x1B[A\rc\r", SessionConfig::default());
        let questions = vec![
            Question::new("One"),
            Question::new("Two").checkpoint(),
            Question::new("Three"),
        ];
        let answers = session
            .run(|answers| questions.get(answers.len()).cloned())
            .unwrap();
        assert_eq!(answers, vec!["a", "b", "c"]);
        assert_eq!(
            stdout(session),
            "One: a\nTwo: b\nThree: \nTwo [b]: \nThree: c\n"
        );
    }

    #[test]
    fn scan_code_prefix_reaches_the_editor() {
        let config = SessionConfig {
            scan_code_prefix: true,
            ..SessionConfig::default()
        };
        let source = ByteSource::new(&b"ac\xE0Kb\r"[..]).latin1();
        let mut session = Session::new(source, Vec::new(), RawModeController::disabled(), config);
        let asked = session.ask(&Question::new("Word")).unwrap();
        assert_eq!(asked, Asked::Answer("abc".into()));
    }

    #[test]
    fn interrupt_aborts_the_run() {
        let mut session = session("a\rb\x03", SessionConfig::default());
        let result = session.run(two_questions());
        assert!(matches!(result, Err(Error::Interrupted)));
    }
}
