//! Lexeme interner
//!
//! Names and punctuation the scanner produces go through here so that tokens, tree nodes and
//! environment keys share one allocation per distinct name.  Literal lexemes stay out of it.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Stores all known symbols.
#[derive(Debug, Default)]
pub struct Interner {
    symbols: HashSet<Symbol>,
}

impl Interner {
    pub fn new() -> Interner {
        Interner::default()
    }

    /// Maps a string to its unique symbol, allocating on first sight only.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.symbols.get(name) {
            return sym.clone();
        }
        let sym = Symbol(Rc::from(name));
        self.symbols.insert(sym.clone());
        sym
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.symbols.len()
    }
}

/// An immutable string that is unique within its `Interner` and so can be compared by address
/// rather than content.
#[derive(Debug, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Creates a symbol outside of any interner.  It equals no other symbol but its clones.
    pub(crate) fn detached(name: &str) -> Symbol {
        Symbol(Rc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Must agree with `Borrow<str>` so that `HashSet::get(&str)` finds interned entries.
impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_keeps_its_name() {
        let mut interner = Interner::new();
        assert_eq!(interner.intern("counter").name(), "counter");
    }

    #[test]
    fn same_name_yields_same_symbol() {
        let mut interner = Interner::new();
        let first = interner.intern("x");
        let second = interner.intern("x");
        assert_eq!(first, second);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn different_names_yield_different_symbols() {
        let mut interner = Interner::new();
        assert_ne!(interner.intern("x"), interner.intern("y"));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn detached_symbols_bypass_the_interner() {
        let mut interner = Interner::new();
        let interned = interner.intern("x");
        let detached = Symbol::detached("x");
        assert_eq!(detached.name(), "x");
        assert_ne!(interned, detached);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn symbols_from_distinct_interners_differ() {
        let mut a = Interner::new();
        let mut b = Interner::new();
        assert_ne!(a.intern("x"), b.intern("x"));
    }
}
