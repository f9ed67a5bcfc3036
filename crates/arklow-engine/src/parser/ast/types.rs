//! Type annotation AST nodes

use super::*;
use crate::parser::token::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    /// number, string, boolean, ...
    Primitive(PrimitiveType, Span),

    /// Foo, ns.Foo, Map<K, V>
    Reference(TypeReference),

    /// T[]
    Array(Box<TypeAnnotation>, Span),

    /// [A, B]
    Tuple(Vec<TypeAnnotation>, Span),

    /// A | B
    Union(Vec<TypeAnnotation>, Span),

    /// A & B
    Intersection(Vec<TypeAnnotation>, Span),

    /// (a: A) => R
    Function(FunctionType),

    /// { a: A; b?: B }
    Object(ObjectType),

    /// "text"
    StringLiteral(Symbol, Span),

    /// 42
    NumberLiteral(f64, Span),

    /// true | false
    BooleanLiteral(bool, Span),

    /// typeof value
    Typeof(Vec<Identifier>, Span),
}

impl TypeAnnotation {
    pub fn span(&self) -> &Span {
        match self {
            TypeAnnotation::Primitive(_, span)
            | TypeAnnotation::Array(_, span)
            | TypeAnnotation::Tuple(_, span)
            | TypeAnnotation::Union(_, span)
            | TypeAnnotation::Intersection(_, span)
            | TypeAnnotation::StringLiteral(_, span)
            | TypeAnnotation::NumberLiteral(_, span)
            | TypeAnnotation::BooleanLiteral(_, span)
            | TypeAnnotation::Typeof(_, span) => span,
            TypeAnnotation::Reference(r) => &r.span,
            TypeAnnotation::Function(f) => &f.span,
            TypeAnnotation::Object(o) => &o.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Number,
    String,
    Boolean,
    BigInt,
    Void,
    Any,
    Unknown,
    Never,
    Null,
    Undefined,
    Object,
    Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    /// Dotted path: `ns.Foo` is `[ns, Foo]`.
    pub path: Vec<Identifier>,
    pub type_args: Vec<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<FunctionTypeParam>,
    pub return_type: Box<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeParam {
    pub name: Option<Identifier>,
    pub ty: TypeAnnotation,
    pub optional: bool,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub members: Vec<ObjectTypeMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTypeMember {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub optional: bool,
}

/// Generic parameter: T extends Bound = Default
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParameter {
    pub name: Identifier,
    pub constraint: Option<TypeAnnotation>,
    pub default: Option<TypeAnnotation>,
    pub span: Span,
}
