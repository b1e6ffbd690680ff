//! Native functions seeded into every evaluator's global scope.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::callable::NativeFn;
use crate::eval::{Evaluator, RuntimeErrorKind};
use crate::value::Value;

/// Name, arity and implementation of every native function.
pub const NATIVES: [(&str, usize, NativeFn); 7] = [
    ("clock", 0, clock),
    ("read_line", 0, read_line),
    ("random_range_rounded", 2, random_range_rounded),
    ("to_double", 1, to_double),
    ("to_string", 1, to_string),
    ("print", 1, print),
    ("print_line", 1, print_line),
];

fn clock(_: &mut Evaluator<'_>, _: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(Value::Number(elapsed.as_secs_f64()))
}

/// Next input line without its terminator, or nil once input is exhausted.
fn read_line(ev: &mut Evaluator<'_>, _: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let mut line = String::new();
    if ev.input().read_line(&mut line)? == 0 {
        return Ok(Value::Nil);
    }
    let trimmed = line.trim_end_matches(&['\n', '\r'][..]);
    Ok(Value::from(trimmed))
}

fn random_range_rounded(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let (low, high) = match (&args[0], &args[1]) {
        (Value::Number(low), Value::Number(high)) => (*low, *high),
        _ => {
            return Err(RuntimeErrorKind::InvalidArgument(
                "random_range_rounded expects two numbers".to_string(),
            ))
        }
    };
    if !low.is_finite() || !high.is_finite() || low > high {
        return Err(RuntimeErrorKind::InvalidArgument(format!(
            "invalid random range [{}, {}]",
            low, high
        )));
    }
    if !(high - low).is_finite() {
        return Err(RuntimeErrorKind::InvalidArgument(format!(
            "random range [{}, {}] is too wide",
            low, high
        )));
    }
    Ok(Value::Number(ev.rng().gen_range(low..=high).round()))
}

fn to_double(_: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| RuntimeErrorKind::Conversion {
                value: format!("\"{}\"", s),
                target: "number",
            }),
        other => Err(RuntimeErrorKind::Conversion {
            value: other.type_name().to_string(),
            target: "number",
        }),
    }
}

fn to_string(_: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(Rc::clone(s))),
        other => Ok(Value::from(other.to_string().as_str())),
    }
}

fn print(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    write!(ev.output(), "{}", args[0])?;
    Ok(Value::Nil)
}

fn print_line(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    writeln!(ev.output(), "{}", args[0])?;
    Ok(Value::Nil)
}
