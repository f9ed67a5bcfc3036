//! Binding patterns for declarations, parameters and catch clauses.

use super::*;
use crate::parser::token::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Simple binding: x
    Identifier(Identifier),

    /// Array destructuring: [a, , b = 1, ...rest]
    Array(ArrayPattern),

    /// Object destructuring: { a, b: renamed, ...rest }
    Object(ObjectPattern),
}

impl Pattern {
    pub fn span(&self) -> &Span {
        match self {
            Pattern::Identifier(id) => &id.span,
            Pattern::Array(p) => &p.span,
            Pattern::Object(p) => &p.span,
        }
    }

    /// Every identifier bound by this pattern, in source order.
    pub fn bound_names(&self) -> Vec<Identifier> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, out: &mut Vec<Identifier>) {
        match self {
            Pattern::Identifier(id) => out.push(*id),
            Pattern::Array(array) => {
                for element in array.elements.iter().flatten() {
                    element.pattern.collect_names(out);
                }
                if let Some(rest) = &array.rest {
                    rest.collect_names(out);
                }
            }
            Pattern::Object(object) => {
                for property in &object.properties {
                    property.value.collect_names(out);
                }
                if let Some(rest) = &object.rest {
                    out.push(*rest);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    /// `None` entries are elisions.
    pub elements: Vec<Option<PatternElement>>,
    pub rest: Option<Box<Pattern>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPattern {
    pub properties: Vec<ObjectPatternProperty>,
    pub rest: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    pub key: PropertyKey,
    pub value: Pattern,
    pub default: Option<Expression>,
    /// `{ a }` rather than `{ a: b }`
    pub shorthand: bool,
    pub span: Span,
}
