//! Command-line front end.
//!
//! With a script argument it runs that file once.  Without one it drops into an interactive
//! prompt where each line is evaluated in the same session.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use treelox::interpreter::{Interpreter, InterpreterError};

/// Exit status after lexical or syntax errors.
const EXIT_STATIC_ERROR: u8 = 65;
/// Exit status for an unreadable script or prompt input.
const EXIT_INPUT_ERROR: u8 = 66;
/// Exit status after a runtime error.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Config {
    #[clap(help = "Script to run; omit it to start the interactive prompt")]
    script: Option<PathBuf>,

    #[clap(short, long, help = "Print verbose log output")]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();

    let level = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &config.script {
        Some(path) => run_file(path),
        None => run_prompt(),
    }
}

fn run_file(path: &Path) -> anyhow::Result<ExitCode> {
    let source = match fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
    {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            return Ok(ExitCode::from(EXIT_INPUT_ERROR));
        }
    };
    log::debug!("running {} ({} bytes)", path.display(), source.len());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    let mut interp = Interpreter::new(&mut output, &mut input);

    let status = match interp.eval(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(exit_status(&e))
        }
    };
    drop(interp);
    output.flush().context("failed to flush output")?;
    Ok(status)
}

fn run_prompt() -> anyhow::Result<ExitCode> {
    // A one-byte buffer so that `read_line()` in scripts never swallows prompt lines.
    let mut input = BufReader::with_capacity(1, io::stdin());
    let mut output = io::stdout();
    let mut interp = Interpreter::new(&mut output, &mut input);

    let mut repl_stdout = io::stdout();
    let mut line = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        line.clear();
        let nbytes = match io::stdin().read_line(&mut line) {
            Ok(n) => n,
            Err(e) => {
                eprintln!("failed to read input: {}", e);
                return Ok(ExitCode::from(EXIT_INPUT_ERROR));
            }
        };
        if nbytes == 0 {
            break;
        }

        // Errors are reported and the session carries on.
        if let Err(e) = interp.eval(&line) {
            eprintln!("{}", e);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn exit_status(e: &InterpreterError) -> u8 {
    match e {
        InterpreterError::Static(_) => EXIT_STATIC_ERROR,
        InterpreterError::Runtime(_) => EXIT_RUNTIME_ERROR,
        InterpreterError::Io(_) => EXIT_INPUT_ERROR,
    }
}
