use crate::{
    raw_mode::RawModeController,
    session::{Question, Session, SessionConfig},
    source::ByteSource,
};
use anyhow::{Result, anyhow, bail};
use std::fmt::Write as FmtWrite;
use std::{
    fs,
    io::{self, Read},
    mem,
};

/// Runs scenario scripts against a [`Session`] fed from an in-memory keyboard.
///
/// `Given` lines build the questions and queue keystrokes, `When run:` asks
/// every question in order, and `Then` lines check the answers and the exact
/// bytes echoed to the terminal.
#[derive(Default)]
pub struct Harness {
    questions: Vec<Question>,
    stdin: Vec<u8>,
    config: SessionConfig,
    outcome: Option<Result<Vec<String>, String>>,
    stdout: Vec<u8>,
    stdout_cursor: usize,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_script(&mut self, script: &str) -> Result<()> {
        let mut in_scenario = false;
        let mut step: Option<Keyword> = None;
        for (idx, raw) in script.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((keyword, body)) = split_keyword(line) else {
                bail!(
                    "line {}: expected Scenario:, Given, When, Then or And",
                    line_no
                );
            };
            let keyword = match keyword {
                Keyword::Scenario => {
                    *self = Harness::new();
                    in_scenario = true;
                    step = None;
                    continue;
                }
                _ if !in_scenario => bail!("line {}: missing Scenario header", line_no),
                Keyword::And => {
                    step.ok_or_else(|| anyhow!("line {}: And opens a scenario", line_no))?
                }
                other => other,
            };
            if let Some(previous) = step.filter(|previous| keyword < *previous) {
                bail!("line {}: {:?} after {:?}", line_no, keyword, previous);
            }
            step = Some(keyword);

            let (cmd, payload) = body
                .split_once(':')
                .map(|(cmd, payload)| (cmd.trim(), payload.trim_start()))
                .ok_or_else(|| anyhow!("line {}: missing ':'", line_no))?;
            if (keyword == Keyword::Then) != cmd.starts_with("expect-") {
                bail!(
                    "line {}: expect- commands belong to Then, and only there",
                    line_no
                );
            }
            if let Err(err) = self.command(cmd, payload, line_no) {
                return Err(anyhow!("{}\n\n{}", err, self.dump_state()));
            }
        }
        Ok(())
    }

    fn command(&mut self, cmd: &str, payload: &str, line_no: usize) -> Result<()> {
        match cmd {
            "question" => {
                self.questions.push(Question::new(parse_text(payload)?));
            }
            "default" => {
                let answer = parse_text(payload)?;
                self.amend_question(line_no, |q| q.default(answer))?;
            }
            "choices" => {
                let choices = payload
                    .split('|')
                    .map(parse_text)
                    .collect::<Result<Vec<_>>>()?;
                self.amend_question(line_no, |q| q.choices(choices))?;
            }
            "mask" => {
                let mask = parse_text(payload)?;
                self.amend_question(line_no, |q| q.mask(mask))?;
            }
            "forget" => self.amend_question(line_no, Question::forget)?,
            "checkpoint" => self.amend_question(line_no, Question::checkpoint)?,
            "rewind" => {
                self.config.rewind = match payload {
                    "on" => true,
                    "off" => false,
                    _ => bail!("line {}: rewind takes on or off", line_no),
                };
            }
            "stdin" => {
                let bytes = parse_bytes(payload)?;
                self.stdin.extend_from_slice(&bytes);
            }
            "run" => self.run(),
            "expect-answers" => {
                let expected = payload
                    .split('|')
                    .map(parse_text)
                    .collect::<Result<Vec<_>>>()?;
                match &self.outcome {
                    Some(Ok(answers)) if *answers == expected => {}
                    Some(Ok(answers)) => bail!(
                        "line {}: expected answers {:?}, got {:?}",
                        line_no,
                        expected,
                        answers
                    ),
                    Some(Err(err)) => bail!("line {}: session failed: {}", line_no, err),
                    None => bail!("line {}: nothing has run yet", line_no),
                }
            }
            "expect-error" => {
                let expected = parse_text(payload)?;
                match &self.outcome {
                    Some(Err(err)) if err.contains(&expected) => {}
                    Some(Err(err)) => bail!(
                        "line {}: expected error containing {:?}, got {:?}",
                        line_no,
                        expected,
                        err
                    ),
                    Some(Ok(answers)) => bail!(
                        "line {}: expected an error, got answers {:?}",
                        line_no,
                        answers
                    ),
                    None => bail!("line {}: nothing has run yet", line_no),
                }
            }
            "expect-stdout" => {
                let expected = parse_bytes(payload)?;
                self.take_stdout(&expected, line_no)?;
            }
            "expect-stdout-contains" => {
                let expected = parse_bytes(payload)?;
                let remaining = &self.stdout[self.stdout_cursor..];
                let found = expected.is_empty()
                    || remaining.windows(expected.len()).any(|w| w == expected);
                if !found {
                    bail!(
                        "line {}: stdout does not contain \"{}\"",
                        line_no,
                        expected.escape_ascii()
                    );
                }
            }
            "expect-stdout-end" => {
                if self.stdout_cursor != self.stdout.len() {
                    bail!("line {}: stdout has unchecked output", line_no);
                }
            }
            _ => bail!("line {}: unknown command {}", line_no, cmd),
        }
        Ok(())
    }

    fn amend_question<F>(&mut self, line_no: usize, amend: F) -> Result<()>
    where
        F: FnOnce(Question) -> Question,
    {
        let question = self
            .questions
            .last_mut()
            .ok_or_else(|| anyhow!("line {}: no question to modify", line_no))?;
        *question = amend(mem::take(question));
        Ok(())
    }

    fn run(&mut self) {
        let questions = self.questions.clone();
        let mut session = Session::new(
            ByteSource::new(self.stdin.as_slice()),
            &mut self.stdout,
            RawModeController::disabled(),
            self.config,
        );
        let result = session.run(|answers| questions.get(answers.len()).cloned());
        self.outcome = Some(result.map_err(|e| e.to_string()));
    }

    /// Checks that the next unchecked stdout bytes are `expected` and moves past them.
    fn take_stdout(&mut self, expected: &[u8], line_no: usize) -> Result<()> {
        let remaining = &self.stdout[self.stdout_cursor..];
        if !remaining.starts_with(expected) {
            let got = &remaining[..remaining.len().min(expected.len())];
            bail!(
                "line {}: stdout expected \"{}\", got \"{}\"",
                line_no,
                expected.escape_ascii(),
                got.escape_ascii()
            );
        }
        self.stdout_cursor += expected.len();
        Ok(())
    }

    fn unchecked_stdout(&self) -> String {
        const SHOWN: usize = 256;
        let rest = &self.stdout[self.stdout_cursor..];
        if rest.is_empty() {
            return "<none>".to_string();
        }
        let mut out = rest[..rest.len().min(SHOWN)].escape_ascii().to_string();
        if rest.len() > SHOWN {
            let _ = write!(&mut out, "... ({} bytes more)", rest.len() - SHOWN);
        }
        out
    }

    fn dump_state(&self) -> String {
        let outcome = match &self.outcome {
            Some(Ok(answers)) => format!("answers {:?}", answers),
            Some(Err(err)) => format!("error {:?}", err),
            None => "<not run>".to_string(),
        };
        let mut questions = String::new();
        for (idx, question) in self.questions.iter().enumerate() {
            let _ = writeln!(&mut questions, "{}: {:?}", idx, question.prompt());
        }
        if questions.is_empty() {
            questions = "<none>\n".to_string();
        }
        format!(
            "State:\nquestions:\n{}outcome: {}\nstdout-remaining: {}\n",
            questions,
            outcome,
            self.unchecked_stdout()
        )
    }
}

pub fn run_script_file(path: &str) -> Result<()> {
    let contents = fs::read_to_string(path)?;
    Harness::new().run_script(&contents)
}

pub fn run_script_stdin() -> Result<()> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Harness::new().run_script(&buf)
}

fn parse_text(input: &str) -> Result<String> {
    String::from_utf8(parse_bytes(input)?).map_err(|e| anyhow!("{:?}: {}", input, e))
}

/// Script strings take `\n`, `\r`, `\t` and `\xHH`; everything else is literal UTF-8.
fn parse_bytes(input: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut rest = input;
    while let Some(at) = rest.find('\\') {
        out.extend_from_slice(rest[..at].as_bytes());
        let escape = &rest[at + 1..];
        let (byte, used) = match escape.as_bytes().first() {
            Some(b'n') => (b'\n', 1),
            Some(b'r') => (b'\r', 1),
            Some(b't') => (b'\t', 1),
            Some(b'x') => {
                let hex = escape
                    .get(1..3)
                    .ok_or_else(|| anyhow!("{:?}: \\x needs two hex digits", input))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| anyhow!("{:?}: bad hex {:?}", input, hex))?;
                (byte, 3)
            }
            _ => bail!("{:?}: unknown escape", input),
        };
        out.push(byte);
        rest = &escape[used..];
    }
    out.extend_from_slice(rest.as_bytes());
    Ok(out)
}

/// Step keywords, in the order a scenario may use them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Keyword {
    Scenario,
    Given,
    When,
    Then,
    And,
}

fn split_keyword(line: &str) -> Option<(Keyword, &str)> {
    let (word, body) = line.split_once(' ').unwrap_or((line, ""));
    let keyword = match word.to_ascii_lowercase().as_str() {
        "scenario:" => Keyword::Scenario,
        "given" => Keyword::Given,
        "when" => Keyword::When,
        "then" => Keyword::Then,
        "and" => Keyword::And,
        _ => return None,
    };
    Some((keyword, body.trim_start()))
}
