//! Abstract syntax tree for the TypeScript/ArkTS subset.
//!
//! Every node carries a [`Span`] so the lowering engine can attach original
//! positions and source text to the IR it emits.

use crate::parser::interner::Symbol;
use crate::parser::token::Span;

pub mod expression;
pub mod pattern;
pub mod statement;
pub mod types;

pub use expression::*;
pub use pattern::*;
pub use statement::*;
pub use types::*;

/// Root node: one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Module {
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Self { statements, span }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// A name for a variable, function, class, property, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: Symbol,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: Symbol, span: Span) -> Self {
        Self { name, span }
    }
}
