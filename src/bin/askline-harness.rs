use anyhow::{Result, anyhow};
use askline::harness::{run_script_file, run_script_stdin};
use std::env;

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        return run_script_stdin();
    };
    if args.next().is_some() {
        return Err(anyhow!("usage: askline-harness [script.txt]"));
    }
    run_script_file(&path)
}
