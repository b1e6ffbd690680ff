use std::fmt;
use std::io;
use std::io::prelude::*;
use std::mem;
use std::rc::Rc;
use std::time::SystemTimeError;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::ast::{Expr, Stmt};
use crate::callable::{Callable, NativeFn};
use crate::ctx::Context;
use crate::env::Env;
use crate::native;
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Fault detected while evaluating, attributed to the token nearest to it.
#[derive(Debug, Error)]
#[error("line {}, error at '{}': {}", .token.line, .token.lexeme, .kind)]
pub struct RuntimeError {
    pub token: Token,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(token: Token, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError { token, kind }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("operand must be a number")]
    OperandMustBeNumber,
    #[error("operands must be numbers")]
    OperandsMustBeNumbers,
    #[error("operands must be two numbers or two strings")]
    OperandsMustBeNumbersOrStrings,
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("can only call functions")]
    NotCallable,
    #[error("expected {expected} arguments but got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("system clock error: {0}")]
    Clock(#[from] SystemTimeError),
}

/// Outcome of executing a statement.
///
/// `Return` unwinds through blocks and loops up to the nearest function call, which turns it
/// into the call's result.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

type EvalResult<T> = Result<T, RuntimeError>;

/// Walks statement and expression trees.
///
/// `env` is the current scope.  It is swapped when entering a block or a call and restored on
/// every way out of it.
pub struct Evaluator<'t> {
    output: &'t mut dyn Write,
    input: &'t mut dyn BufRead,
    rng: StdRng,
    ctx: Rc<Context>,
    globals: Rc<Env>,
    env: Rc<Env>,
}

impl<'t> Evaluator<'t> {
    /// Creates an evaluator whose global scope holds the native functions.
    pub fn new(
        output: &'t mut dyn Write,
        input: &'t mut dyn BufRead,
        ctx: Rc<Context>,
    ) -> Evaluator<'t> {
        let globals = Env::new();
        let mut evaluator = Evaluator {
            output,
            input,
            rng: StdRng::from_entropy(),
            ctx,
            globals: globals.clone(),
            env: globals,
        };
        for &(name, arity, op) in native::NATIVES.iter() {
            evaluator.define_native(name, arity, op);
        }
        evaluator
    }

    /// Reseeds the generator behind `random_range_rounded`, making it deterministic.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Binds a host function in the global scope.
    pub fn define_native(&mut self, name: &'static str, arity: usize, op: NativeFn) {
        log::trace!("registering native function {}/{}", name, arity);
        self.globals.define(
            self.ctx.symbol(name),
            Value::Callable(Rc::new(Callable::Native { name, arity, op })),
        );
    }

    pub(crate) fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    pub(crate) fn input(&mut self) -> &mut dyn BufRead {
        &mut *self.input
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Runs `stmts` in the current scope until they complete or one of them fails.
    ///
    /// A `return` at this level ends the run normally and its value is dropped.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        for stmt in stmts {
            if let Flow::Return(v) = self.execute(stmt)? {
                log::debug!("top-level return discards {}", v);
                break;
            }
        }
        Ok(())
    }

    /// Runs `stmts` with `env` as current scope, then restores the previous scope whatever the
    /// outcome.
    pub(crate) fn execute_block(&mut self, stmts: &[Stmt], env: Rc<Env>) -> EvalResult<Flow> {
        let previous = mem::replace(&mut self.env, env);
        let res = self.execute_all(stmts);
        self.env = previous;
        res
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
        for stmt in stmts {
            if let Flow::Return(v) = self.execute(stmt)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        match stmt {
            Stmt::Expression(e) => {
                self.evaluate(e)?;
            }
            Stmt::Var(name, init) => {
                let v = match init {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                self.env.define(name.lexeme.clone(), v);
            }
            Stmt::Block(stmts) => {
                let env = Env::with_enclosing(self.env.clone());
                return self.execute_block(stmts, env);
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.evaluate(cond)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            Stmt::While(cond, body) => {
                while self.evaluate(cond)?.is_truthy() {
                    if let Flow::Return(v) = self.execute(body)? {
                        return Ok(Flow::Return(v));
                    }
                }
            }
            Stmt::Function(decl) => {
                log::debug!(
                    "declaring function {}/{}",
                    decl.name.lexeme,
                    decl.params.len()
                );
                let function = Callable::User {
                    decl: decl.clone(),
                    closure: self.env.clone(),
                };
                self.env
                    .define(decl.name.lexeme.clone(), Value::Callable(Rc::new(function)));
            }
            Stmt::Return(_, value) => {
                let v = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(v));
            }
        };
        Ok(Flow::Normal)
    }

    pub(crate) fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(Value::from(lit)),
            Expr::Grouping(e) => self.evaluate(e),
            Expr::Unary(op, operand) => {
                let v = self.evaluate(operand)?;
                match op.kind {
                    TokenKind::Bang => Ok(Value::Bool(!v.is_truthy())),
                    _ => match v {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(
                            op.clone(),
                            RuntimeErrorKind::OperandMustBeNumber,
                        )),
                    },
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let l = self.evaluate(lhs)?;
                let r = self.evaluate(rhs)?;
                binary(op, l, r)
            }
            Expr::Logical(lhs, op, rhs) => {
                let l = self.evaluate(lhs)?;
                let short_circuits = if op.is(TokenKind::Or) {
                    l.is_truthy()
                } else {
                    !l.is_truthy()
                };
                if short_circuits {
                    Ok(l)
                } else {
                    self.evaluate(rhs)
                }
            }
            Expr::Variable(name) => self.env.get(name),
            Expr::Assign(name, rhs) => {
                let v = self.evaluate(rhs)?;
                self.env.assign(name, v.clone())?;
                Ok(v)
            }
            Expr::Call(callee, paren, args) => {
                let callee = self.evaluate(callee)?;
                let args = args
                    .iter()
                    .map(|a| self.evaluate(a))
                    .collect::<EvalResult<Vec<Value>>>()?;
                let function = match callee {
                    Value::Callable(f) => f,
                    _ => {
                        return Err(RuntimeError::new(
                            paren.clone(),
                            RuntimeErrorKind::NotCallable,
                        ))
                    }
                };
                if args.len() != function.arity() {
                    return Err(RuntimeError::new(
                        paren.clone(),
                        RuntimeErrorKind::ArityMismatch {
                            expected: function.arity(),
                            got: args.len(),
                        },
                    ));
                }
                log::trace!("calling {} with {} arguments", function, args.len());
                function.call(self, paren, args)
            }
        }
    }
}

// Not derived: the I/O handles are trait objects.
impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("globals", &self.globals.len())
            .field("nested", &!Rc::ptr_eq(&self.env, &self.globals))
            .finish_non_exhaustive()
    }
}

fn binary(op: &Token, l: Value, r: Value) -> EvalResult<Value> {
    let numbers = |kind: RuntimeErrorKind| match (&l, &r) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::new(op.clone(), kind)),
    };
    match op.kind {
        TokenKind::EqualEqual => Ok(Value::Bool(l == r)),
        TokenKind::BangEqual => Ok(Value::Bool(l != r)),
        TokenKind::Plus => match (&l, &r) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::Str(Rc::from(s)))
            }
            _ => Err(RuntimeError::new(
                op.clone(),
                RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
            )),
        },
        _ => {
            let (a, b) = numbers(RuntimeErrorKind::OperandsMustBeNumbers)?;
            Ok(match op.kind {
                TokenKind::Minus => Value::Number(a - b),
                TokenKind::Star => Value::Number(a * b),
                TokenKind::Slash => Value::Number(a / b),
                TokenKind::Greater => Value::Bool(a > b),
                TokenKind::GreaterEqual => Value::Bool(a >= b),
                TokenKind::Less => Value::Bool(a < b),
                _ => Value::Bool(a <= b),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::parser::parse;
    use crate::scanner::scan;

    fn program(ctx: &Rc<Context>, input: &str) -> Vec<Stmt> {
        let mut diags = Diagnostics::new();
        let tokens = scan(input, ctx.clone(), &mut diags);
        let prg = parse(&tokens, &mut diags);
        assert!(!diags.had_error(), "{:?}", diags.errors());
        prg
    }

    fn eval_expr(input: &str) -> Result<Value, RuntimeError> {
        let ctx = Context::new();
        let prg = program(&ctx, &format!("{};", input));
        let mut out: Vec<u8> = Vec::new();
        let mut inp = io::empty();
        let mut evaluator = Evaluator::new(&mut out, &mut inp, ctx);
        match prg.as_slice() {
            [Stmt::Expression(e)] => evaluator.evaluate(e),
            other => panic!("unexpected program: {:?}", other),
        }
    }

    fn eval_prg(input: &str) -> Result<String, RuntimeError> {
        let ctx = Context::new();
        let prg = program(&ctx, input);
        let mut out: Vec<u8> = Vec::new();
        let mut inp = io::empty();
        let mut evaluator = Evaluator::new(&mut out, &mut inp, ctx);
        evaluator.define_native("__test_ultimate_answer__", 0, |_, _| Ok(Value::Number(42.0)));
        evaluator.interpret(&prg)?;
        Ok(String::from_utf8(out).expect("error while converting output"))
    }

    fn runtime_error(input: &str) -> RuntimeError {
        match eval_prg(input) {
            Err(e) => e,
            Ok(out) => panic!("unexpected success, output: {:?}", out),
        }
    }

    #[test]
    fn arithmetic_follows_precedence() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("1 + 2 * 3")?, Value::Number(7.0));
        assert_eq!(eval_expr("(1 + 2) * 3")?, Value::Number(9.0));
        assert_eq!(eval_expr("10 - 4 - 3")?, Value::Number(3.0));
        assert_eq!(eval_expr("12 / 3 / 2")?, Value::Number(2.0));
        assert_eq!(eval_expr("-(2 + 3) * 2")?, Value::Number(-10.0));
        Ok(())
    }

    #[test]
    fn division_by_zero_is_infinite() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("1 / 0")?, Value::Number(f64::INFINITY));
        Ok(())
    }

    #[test]
    fn comparisons() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("1 < 2")?, Value::Bool(true));
        assert_eq!(eval_expr("2 <= 2")?, Value::Bool(true));
        assert_eq!(eval_expr("2 > 2")?, Value::Bool(false));
        assert_eq!(eval_expr("3 >= 2")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn equality_across_types() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("nil == nil")?, Value::Bool(true));
        assert_eq!(eval_expr("nil == false")?, Value::Bool(false));
        assert_eq!(eval_expr("1 == \"1\"")?, Value::Bool(false));
        assert_eq!(eval_expr("\"a\" != \"b\"")?, Value::Bool(true));
        assert_eq!(eval_expr("true == true")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn string_concatenation() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("\"a\" + \"b\"")?, Value::from("ab"));
        Ok(())
    }

    #[test]
    fn mixed_addition_is_rejected() {
        match eval_expr("\"a\" + 1") {
            Err(RuntimeError {
                token,
                kind: RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
            }) if token.is(TokenKind::Plus) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn arithmetic_on_non_numbers_is_rejected() {
        match eval_expr("true * 2") {
            Err(RuntimeError {
                token,
                kind: RuntimeErrorKind::OperandsMustBeNumbers,
            }) if token.is(TokenKind::Star) => (),
            out => panic!("unexpected output: {:?}", out),
        }
        match eval_expr("\"a\" < \"b\"") {
            Err(RuntimeError {
                kind: RuntimeErrorKind::OperandsMustBeNumbers,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn unary_operators() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("-1")?, Value::Number(-1.0));
        assert_eq!(eval_expr("!nil")?, Value::Bool(true));
        assert_eq!(eval_expr("!0")?, Value::Bool(false));
        assert_eq!(eval_expr("!!\"\"")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn unary_minus_on_bool() {
        match eval_expr("-true") {
            Err(RuntimeError {
                kind: RuntimeErrorKind::OperandMustBeNumber,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn logical_operators_return_operands() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("nil or \"yes\"")?, Value::from("yes"));
        assert_eq!(eval_expr("1 or 2")?, Value::Number(1.0));
        assert_eq!(eval_expr("1 and 2")?, Value::Number(2.0));
        assert_eq!(eval_expr("nil and 2")?, Value::Nil);
        Ok(())
    }

    #[test]
    fn logical_operators_short_circuit() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr("false and (1 / 0)")?, Value::Bool(false));
        assert_eq!(eval_expr("false and undefined")?, Value::Bool(false));
        assert_eq!(eval_expr("true or undefined")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn undefined_variable() {
        let e = runtime_error("print_line(nope);");
        assert_eq!(e.token.lexeme.name(), "nope");
        assert!(matches!(e.kind, RuntimeErrorKind::UndefinedVariable(ref n) if n == "nope"));
    }

    #[test]
    fn assignment_to_undeclared_variable() {
        let e = runtime_error("nope = 1;");
        assert!(matches!(e.kind, RuntimeErrorKind::UndefinedVariable(_)));
    }

    #[test]
    fn redeclaration_overwrites() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("var a = 1; var a = 2; print_line(a);")?, "2\n");
        Ok(())
    }

    #[test]
    fn block_scope_is_restored_after_error() {
        let ctx = Context::new();
        let prg = program(&ctx, "var a = \"outer\"; { var a = \"inner\"; nope; }");
        let follow_up = program(&ctx, "print_line(a);");
        let mut out: Vec<u8> = Vec::new();
        let mut inp = io::empty();
        let mut evaluator = Evaluator::new(&mut out, &mut inp, ctx);
        assert!(evaluator.interpret(&prg).is_err());
        evaluator.interpret(&follow_up).expect("follow-up run");
        drop(evaluator);
        assert_eq!(out, b"outer\n");
    }

    #[test]
    fn calling_a_non_callable() {
        let e = runtime_error("var x = 1; x();");
        assert!(matches!(e.kind, RuntimeErrorKind::NotCallable));
        assert!(e.token.is(TokenKind::RightParen));
    }

    #[test]
    fn call_native_without_arg() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg("print_line(__test_ultimate_answer__());")?, "42\n");
        Ok(())
    }

    #[test]
    fn arity_mismatch_skips_the_body() {
        let ctx = Context::new();
        let prg = program(&ctx, "fun f() { print_line(\"ran\"); } f(1);");
        let mut out: Vec<u8> = Vec::new();
        let mut inp = io::empty();
        let mut evaluator = Evaluator::new(&mut out, &mut inp, ctx);
        match evaluator.interpret(&prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::ArityMismatch { expected: 0, got: 1 },
                ..
            }) => (),
            r => panic!("unexpected output: {:?}", r),
        }
        drop(evaluator);
        assert!(out.is_empty());
    }

    #[test]
    fn return_unwinds_loops_and_blocks() -> Result<(), RuntimeError> {
        let prg = r#"
            fun find() {
                var i = 0;
                while (true) {
                    {
                        if (i == 3) return i;
                    }
                    i = i + 1;
                }
            }
            print_line(find());
        "#;
        assert_eq!(eval_prg(prg)?, "3\n");
        Ok(())
    }

    #[test]
    fn top_level_return_stops_the_run() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg("print_line(1); return 5; print_line(2);")?,
            "1\n"
        );
        Ok(())
    }

    #[test]
    fn function_values_print_their_name() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg("fun f() {} print_line(f); print_line(clock);")?,
            "<fn f>\n<native fn clock>\n"
        );
        Ok(())
    }

    #[test]
    fn functions_compare_by_identity() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_prg("fun f() {} fun g() {} var h = f; print_line(f == h); print_line(f == g);")?,
            "true\nfalse\n"
        );
        Ok(())
    }
}
