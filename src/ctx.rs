use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interner::{Interner, Symbol};
use crate::token::TokenKind;

/// Per-session lexical state shared by the scanner, the parser tests and the evaluator.
///
/// Anchors the lexeme interner and maps reserved words to their token kinds.  Two interpreters
/// built from two contexts share nothing.
#[derive(Debug)]
pub struct Context {
    interner: RefCell<Interner>,
    keywords: HashMap<Symbol, TokenKind>,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns a Rc because the context is shared between various data structures.
    pub fn new() -> Rc<Self> {
        let mut interner = Interner::new();
        let keywords = KEYWORDS
            .iter()
            .map(|&(name, kind)| (interner.intern(name), kind))
            .collect();

        Rc::new(Context {
            interner: RefCell::new(interner),
            keywords,
        })
    }

    /// Interns the given string if needed and returns its symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().intern(name)
    }

    #[cfg(test)]
    pub(crate) fn symbol_count(&self) -> usize {
        self.interner.borrow().len()
    }

    /// Returns the keyword kind associated with the given symbol, if it is reserved.
    pub fn keyword(&self, sym: &Symbol) -> Option<TokenKind> {
        self.keywords.get(sym).copied()
    }
}

const KEYWORDS: [(&str, TokenKind); 15] = [
    ("and", TokenKind::And),
    ("class", TokenKind::Class),
    ("else", TokenKind::Else),
    ("false", TokenKind::False),
    ("for", TokenKind::For),
    ("fun", TokenKind::Fun),
    ("if", TokenKind::If),
    ("nil", TokenKind::Nil),
    ("or", TokenKind::Or),
    ("return", TokenKind::Return),
    ("super", TokenKind::Super),
    ("this", TokenKind::This),
    ("true", TokenKind::True),
    ("var", TokenKind::Var),
    ("while", TokenKind::While),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_map_to_keywords() {
        let ctx = Context::new();
        assert_eq!(ctx.keyword(&ctx.symbol("while")), Some(TokenKind::While));
        assert_eq!(ctx.keyword(&ctx.symbol("super")), Some(TokenKind::Super));
    }

    #[test]
    fn plain_names_are_not_keywords() {
        let ctx = Context::new();
        assert_eq!(ctx.keyword(&ctx.symbol("print_line")), None);
        assert_eq!(ctx.keyword(&ctx.symbol("While")), None);
    }
}
