//! Lexical scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::{RuntimeError, RuntimeErrorKind};
use crate::interner::Symbol;
use crate::token::Token;
use crate::value::Value;

/// One scope frame, linked to the frame it is nested in.
///
/// Frames are shared: a closure keeps its defining frame alive, and bindings mutated through
/// one handle are visible through every other.
#[derive(Debug, Default)]
pub struct Env {
    enclosing: Option<Rc<Env>>,
    values: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    /// Creates the outermost scope.
    pub fn new() -> Rc<Env> {
        Rc::new(Env::default())
    }

    pub fn with_enclosing(enclosing: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            enclosing: Some(enclosing),
            values: RefCell::new(HashMap::new()),
        })
    }

    /// Number of bindings held directly by this scope.
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Binds `name` in this scope, replacing any binding it already holds here.
    pub fn define(&self, name: Symbol, value: Value) {
        self.values.borrow_mut().insert(name, value);
    }

    /// Looks `name` up from this scope outwards.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        let mut scope = self;
        loop {
            if let Some(v) = scope.values.borrow().get(&name.lexeme) {
                return Ok(v.clone());
            }
            match &scope.enclosing {
                Some(parent) => scope = parent.as_ref(),
                None => return Err(undefined(name)),
            }
        }
    }

    /// Rebinds `name` in the innermost scope that already holds it.  Never creates a binding.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut scope = self;
        loop {
            if let Some(slot) = scope.values.borrow_mut().get_mut(&name.lexeme) {
                *slot = value;
                return Ok(());
            }
            match &scope.enclosing {
                Some(parent) => scope = parent.as_ref(),
                None => return Err(undefined(name)),
            }
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(
        name.clone(),
        RuntimeErrorKind::UndefinedVariable(name.lexeme.name().to_owned()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;
    use crate::token::TokenKind;

    fn ident(ctx: &Context, name: &str) -> Token {
        Token::new(TokenKind::Identifier, ctx.symbol(name), None, 1)
    }

    #[test]
    fn counts_own_bindings_only() {
        let ctx = Context::new();
        let outer = Env::new();
        outer.define(ctx.symbol("a"), Value::Nil);
        let inner = Env::with_enclosing(outer.clone());
        assert_eq!(outer.len(), 1);
        assert!(inner.is_empty());
    }

    #[test]
    fn define_then_get() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let env = Env::new();
        env.define(ctx.symbol("a"), Value::Number(1.0));
        assert_eq!(env.get(&ident(&ctx, "a"))?, Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn redefinition_overwrites() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let env = Env::new();
        env.define(ctx.symbol("a"), Value::Number(1.0));
        env.define(ctx.symbol("a"), Value::Bool(true));
        assert_eq!(env.get(&ident(&ctx, "a"))?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn lookup_walks_outwards() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let outer = Env::new();
        outer.define(ctx.symbol("a"), Value::Number(1.0));
        let inner = Env::with_enclosing(Env::with_enclosing(outer));
        assert_eq!(inner.get(&ident(&ctx, "a"))?, Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn unknown_name_is_an_error() {
        let ctx = Context::new();
        let env = Env::with_enclosing(Env::new());
        match env.get(&ident(&ctx, "missing")) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::UndefinedVariable(name),
                ..
            }) if name == "missing" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn assign_mutates_the_declaring_scope() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let outer = Env::new();
        outer.define(ctx.symbol("a"), Value::Number(1.0));
        let inner = Env::with_enclosing(outer.clone());
        inner.assign(&ident(&ctx, "a"), Value::Number(2.0))?;
        assert_eq!(outer.get(&ident(&ctx, "a"))?, Value::Number(2.0));
        Ok(())
    }

    #[test]
    fn assign_hits_the_innermost_shadow() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let outer = Env::new();
        outer.define(ctx.symbol("a"), Value::Number(1.0));
        let inner = Env::with_enclosing(outer.clone());
        inner.define(ctx.symbol("a"), Value::Number(10.0));
        inner.assign(&ident(&ctx, "a"), Value::Number(20.0))?;
        assert_eq!(inner.get(&ident(&ctx, "a"))?, Value::Number(20.0));
        assert_eq!(outer.get(&ident(&ctx, "a"))?, Value::Number(1.0));
        Ok(())
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let ctx = Context::new();
        let env = Env::new();
        assert!(env.assign(&ident(&ctx, "a"), Value::Nil).is_err());
        assert!(env.get(&ident(&ctx, "a")).is_err());
    }
}
