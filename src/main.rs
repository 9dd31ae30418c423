use anyhow::{Context, Result, bail};
use askline::{
    BackendKind, ByteSource, Error, Question, RawModeController, Session, SessionConfig, logging,
};
use clap::Parser;
use serde::Serialize;
use std::{io, path::PathBuf, process};
use tracing::info;

/// Exit status after Ctrl-C, as a shell reports SIGINT.
const INTERRUPTED_STATUS: i32 = 130;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Questions to ask in order, each as `text` or `text=default`
    #[clap(required = true)]
    questions: Vec<String>,
    /// Answers offered for Tab completion, comma separated
    #[clap(long, short = 'c', value_delimiter = ',')]
    choices: Vec<String>,
    /// Echo this instead of the typed characters
    #[clap(long, short = 'm')]
    mask: Option<String>,
    /// Don't go back to the previous question on Up or Shift-Tab
    #[clap(long)]
    no_rewind: bool,
    /// Read stdin as Latin-1 and take 0xE0 as an extended-key prefix, as DOS-style consoles send
    #[clap(long)]
    scan_codes: bool,
    /// How to put the terminal in raw mode: auto, termios, crossterm, stty, console or none
    #[clap(long, short = 'b', env = "ASKLINE_BACKEND", default_value_t = BackendKind::Auto)]
    backend: BackendKind,
    /// Append logs to this file; the filter comes from ASKLINE_LOG
    #[clap(long, env = "ASKLINE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct Answer<'a> {
    question: &'a str,
    answer: &'a str,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        logging::init_file_logging(path)?;
    }
    let questions = cli
        .questions
        .iter()
        .map(|arg| question(arg, &cli))
        .collect::<Result<Vec<_>>>()?;

    let raw = RawModeController::probe(cli.backend);
    let config = SessionConfig {
        rewind: !cli.no_rewind,
        scan_code_prefix: cli.scan_codes,
    };
    let source = if cli.scan_codes {
        ByteSource::stdin().latin1()
    } else {
        ByteSource::stdin()
    };
    let mut session = Session::new(source, io::stdout(), raw, config);
    let answers = match session.run(|answers| questions.get(answers.len()).cloned()) {
        Ok(answers) => answers,
        Err(Error::Interrupted) => {
            info!("interrupted");
            eprintln!();
            process::exit(INTERRUPTED_STATUS);
        }
        Err(err) => return Err(err).context("ask questions"),
    };
    session.finalize();

    let report: Vec<Answer> = questions
        .iter()
        .zip(&answers)
        .map(|(question, answer)| Answer {
            question: question.text(),
            answer,
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("encode answers")?
    );
    Ok(())
}

fn question(arg: &str, cli: &Cli) -> Result<Question> {
    let (text, default) = match arg.split_once('=') {
        Some((text, default)) => (text, Some(default)),
        None => (arg, None),
    };
    if text.is_empty() {
        bail!("empty question in {:?}", arg);
    }
    let mut question = Question::new(text);
    if let Some(default) = default {
        question = question.default(default);
    }
    if !cli.choices.is_empty() {
        question = question.choices(cli.choices.iter().cloned());
    }
    if let Some(mask) = &cli.mask {
        question = question.mask(mask.clone()).forget();
    }
    Ok(question)
}
