//! API to control the interpreter.

use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ctx::Context;
use crate::diag::{Diagnostics, StaticError};
use crate::eval::{Evaluator, RuntimeError};
use crate::parser::parse;
use crate::scanner::scan;

/// Tree-walk interpreter session.
///
/// Bindings persist from one `eval` call to the next.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional times to call this
/// function:
///
/// ```
/// # use treelox::interpreter::{Interpreter, InterpreterError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut input = std::io::empty();
/// let mut interp = Interpreter::new(&mut output, &mut input);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     }
/// "#;
/// interp.eval(func_def)?;
///
/// interp.eval("print_line(max(10, 20));")?;
/// interp.eval("print_line(max(5, 4));")?;
///
/// assert_eq!(output, b"20\n5\n");
/// # Ok::<(), InterpreterError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t>,
}

/// Errors the interpreter can raise.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// Lexical or syntax errors.  Nothing was executed.
    #[error("{}", join_lines(.0))]
    Static(Vec<StaticError>),

    /// Error occurring during evaluation.  Output produced before it is kept.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Failure reading the source.
    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

fn join_lines(errors: &[StaticError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl<'t> Interpreter<'t> {
    /// Creates a session printing to `output` and reading `read_line()` input from `input`.
    pub fn new(output: &'t mut dyn Write, input: &'t mut dyn BufRead) -> Interpreter<'t> {
        let ctx = Context::new();
        Interpreter {
            ctx: ctx.clone(),
            evaluator: Evaluator::new(output, input, ctx),
        }
    }

    /// Gives access to the evaluator, e.g. to register extra native functions.
    pub fn evaluator(&mut self) -> &mut Evaluator<'t> {
        &mut self.evaluator
    }

    /// Scans, parses and runs `source`.
    ///
    /// Any static error prevents execution entirely.  A runtime error stops execution at the
    /// faulting statement.
    pub fn eval(&mut self, source: &str) -> Result<(), InterpreterError> {
        let mut diags = Diagnostics::new();
        let tokens = scan(source, self.ctx.clone(), &mut diags);
        let prg = parse(&tokens, &mut diags);
        if diags.had_error() {
            return Err(InterpreterError::Static(diags.into_errors()));
        }
        self.evaluator.interpret(&prg)?;
        log::info!("ran {} statements", prg.len());
        Ok(())
    }

    /// Reads `input` to its end and evaluates it.
    pub fn eval_reader<R: Read>(&mut self, mut input: R) -> Result<(), InterpreterError> {
        let mut source = String::new();
        input.read_to_string(&mut source)?;
        self.eval(&source)
    }
}
