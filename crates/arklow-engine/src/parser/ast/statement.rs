//! Statement AST nodes

use super::*;
use crate::parser::token::Span;

/// Statement (performs an action)
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// let x = 1, y; const [a, b] = pair;
    VariableDecl(VariableDecl),

    /// function name(params) { ... }
    FunctionDecl(FunctionDecl),

    /// class Name extends Base { ... }
    ClassDecl(ClassDecl),

    /// type Name = Type;
    TypeAliasDecl(TypeAliasDecl),

    /// import { a, b as c } from "module";
    Import(ImportDecl),

    Expression(ExpressionStatement),

    If(IfStatement),

    Switch(SwitchStatement),

    While(WhileStatement),

    DoWhile(DoWhileStatement),

    For(ForStatement),

    /// for (const x of items)
    ForOf(ForOfStatement),

    /// for (const k in object)
    ForIn(ForOfStatement),

    Break(BreakStatement),

    Continue(ContinueStatement),

    Return(ReturnStatement),

    Throw(ThrowStatement),

    Try(TryStatement),

    Block(BlockStatement),

    /// label: statement
    Labeled(LabeledStatement),

    Empty(Span),
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::VariableDecl(s) => &s.span,
            Statement::FunctionDecl(s) => &s.span,
            Statement::ClassDecl(s) => &s.span,
            Statement::TypeAliasDecl(s) => &s.span,
            Statement::Import(s) => &s.span,
            Statement::Expression(s) => &s.span,
            Statement::If(s) => &s.span,
            Statement::Switch(s) => &s.span,
            Statement::While(s) => &s.span,
            Statement::DoWhile(s) => &s.span,
            Statement::For(s) => &s.span,
            Statement::ForOf(s) | Statement::ForIn(s) => &s.span,
            Statement::Break(s) => &s.span,
            Statement::Continue(s) => &s.span,
            Statement::Return(s) => &s.span,
            Statement::Throw(s) => &s.span,
            Statement::Try(s) => &s.span,
            Statement::Block(s) => &s.span,
            Statement::Labeled(s) => &s.span,
            Statement::Empty(span) => span,
        }
    }

    /// Declarations that belong to the model rather than to a method body.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Statement::FunctionDecl(_)
                | Statement::ClassDecl(_)
                | Statement::TypeAliasDecl(_)
                | Statement::Import(_)
        )
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    pub pattern: Pattern,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// Function declaration; also the payload of function expressions, where the
/// name is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<Identifier>,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: BlockStatement,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
}

/// Accessibility written on a member or a constructor parameter property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub pattern: Pattern,
    pub type_annotation: Option<TypeAnnotation>,
    pub default_value: Option<Expression>,
    pub optional: bool,
    /// ...rest
    pub is_rest: bool,
    /// Set on constructor parameter properties: `constructor(private x: number)`.
    pub property: Option<Visibility>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub extends: Option<TypeReference>,
    pub implements: Vec<TypeReference>,
    pub members: Vec<ClassMember>,
    pub is_abstract: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Option<Expression>,
    pub is_static: bool,
    pub is_readonly: bool,
    pub visibility: Option<Visibility>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: Identifier,
    pub kind: MethodKind,
    pub function: FunctionDecl,
    pub is_static: bool,
    pub is_abstract: bool,
    pub visibility: Option<Visibility>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub params: Vec<Parameter>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: StringLiteral,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// import { imported as local }
    Named { imported: Identifier, local: Identifier },
    /// import local from
    Default(Identifier),
    /// import * as local from
    Namespace(Identifier),
}

impl ImportSpecifier {
    pub fn local(&self) -> &Identifier {
        match self {
            ImportSpecifier::Named { local, .. } => local,
            ImportSpecifier::Default(id) | ImportSpecifier::Namespace(id) => id,
        }
    }
}

// ============================================================================
// Control Flow
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    pub body: Box<Statement>,
    pub condition: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    VariableDecl(VariableDecl),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForOfStatement {
    pub left: ForOfLeft,
    pub right: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForOfLeft {
    /// for (const [k, v] of entries)
    VariableDecl {
        kind: VariableKind,
        pattern: Pattern,
        type_annotation: Option<TypeAnnotation>,
    },
    /// for (existing of items), for (o.f of items)
    Target(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: BlockStatement,
    pub catch_clause: Option<CatchClause>,
    pub finally_clause: Option<BlockStatement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// `catch {}` without a binding has no parameter.
    pub param: Option<Pattern>,
    pub type_annotation: Option<TypeAnnotation>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    pub label: Identifier,
    pub body: Box<Statement>,
    pub span: Span,
}
