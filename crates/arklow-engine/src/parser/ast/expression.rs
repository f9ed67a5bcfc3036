//! Expression AST nodes

use super::*;
use crate::parser::token::Span;

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: 42, 0xFF
    IntLiteral(IntLiteral),

    /// Float literal: 3.14, 1e10
    FloatLiteral(FloatLiteral),

    /// BigInt literal: 10n
    BigIntLiteral(BigIntLiteral),

    /// String literal: "hello"
    StringLiteral(StringLiteral),

    /// Regular expression literal: /ab+c/g
    RegexLiteral(RegexLiteral),

    /// Template literal: `Hello, ${name}!`
    TemplateLiteral(TemplateLiteral),

    /// Boolean literal: true, false
    BooleanLiteral(BooleanLiteral),

    /// Null literal
    NullLiteral(Span),

    Identifier(Identifier),

    /// Array literal: [1, , ...rest]
    Array(ArrayExpression),

    /// Object literal: { x: 1, y, ...rest }
    Object(ObjectExpression),

    /// Function expression: function (a) { ... }
    Function(FunctionExpression),

    /// Arrow function: (x) => x + 1
    Arrow(ArrowFunction),

    /// Unary expression: !x, -y, void z, delete o.p
    Unary(UnaryExpression),

    /// Update expression: ++x, x--
    Update(UpdateExpression),

    /// Binary expression: x + y, a < b
    Binary(BinaryExpression),

    /// Logical expression: x && y, a ?? b
    Logical(LogicalExpression),

    /// Assignment: x = 42, y += 1
    Assignment(AssignmentExpression),

    /// Ternary: x ? y : z
    Conditional(ConditionalExpression),

    /// Comma sequence: a, b
    Sequence(SequenceExpression),

    /// Function call: foo(1, 2)
    Call(CallExpression),

    /// Member access: obj.prop, obj?.prop
    Member(MemberExpression),

    /// Index access: arr[0]
    Index(IndexExpression),

    /// New expression: new Point(1, 2)
    New(NewExpression),

    /// Await expression: await promise
    Await(AwaitExpression),

    /// Yield expression: yield value
    Yield(YieldExpression),

    /// Typeof expression: typeof value
    Typeof(TypeofExpression),

    /// InstanceOf expression: expr instanceof ClassName
    InstanceOf(InstanceOfExpression),

    /// Type cast expression: expr as TypeName
    TypeCast(TypeCastExpression),

    /// Non-null assertion: expr!
    NonNull(NonNullExpression),

    /// Parenthesized expression: (expr)
    Parenthesized(ParenthesizedExpression),

    This(Span),

    Super(Span),
}

impl Expression {
    pub fn span(&self) -> &Span {
        match self {
            Expression::IntLiteral(e) => &e.span,
            Expression::FloatLiteral(e) => &e.span,
            Expression::BigIntLiteral(e) => &e.span,
            Expression::StringLiteral(e) => &e.span,
            Expression::RegexLiteral(e) => &e.span,
            Expression::TemplateLiteral(e) => &e.span,
            Expression::BooleanLiteral(e) => &e.span,
            Expression::NullLiteral(span) => span,
            Expression::Identifier(e) => &e.span,
            Expression::Array(e) => &e.span,
            Expression::Object(e) => &e.span,
            Expression::Function(e) => &e.span,
            Expression::Arrow(e) => &e.span,
            Expression::Unary(e) => &e.span,
            Expression::Update(e) => &e.span,
            Expression::Binary(e) => &e.span,
            Expression::Logical(e) => &e.span,
            Expression::Assignment(e) => &e.span,
            Expression::Conditional(e) => &e.span,
            Expression::Sequence(e) => &e.span,
            Expression::Call(e) => &e.span,
            Expression::Member(e) => &e.span,
            Expression::Index(e) => &e.span,
            Expression::New(e) => &e.span,
            Expression::Await(e) => &e.span,
            Expression::Yield(e) => &e.span,
            Expression::Typeof(e) => &e.span,
            Expression::InstanceOf(e) => &e.span,
            Expression::TypeCast(e) => &e.span,
            Expression::NonNull(e) => &e.span,
            Expression::Parenthesized(e) => &e.span,
            Expression::This(span) => span,
            Expression::Super(span) => span,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::IntLiteral(_)
                | Expression::FloatLiteral(_)
                | Expression::BigIntLiteral(_)
                | Expression::StringLiteral(_)
                | Expression::RegexLiteral(_)
                | Expression::BooleanLiteral(_)
                | Expression::NullLiteral(_)
        )
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expression {
        match self {
            Expression::Parenthesized(p) => p.expression.unparenthesized(),
            other => other,
        }
    }

    /// Forms evaluated for their effect; an expression statement made of one
    /// of these needs no extra temporary.
    pub fn has_side_effect(&self) -> bool {
        matches!(
            self.unparenthesized(),
            Expression::Assignment(_)
                | Expression::Update(_)
                | Expression::New(_)
                | Expression::Call(_)
        )
    }
}

// ============================================================================
// Literal Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BigIntLiteral {
    /// Digits without the `n` suffix.
    pub digits: Symbol,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: Symbol,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexLiteral {
    /// Full literal text including slashes and flags.
    pub pattern: Symbol,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLiteral {
    pub parts: Vec<TemplateElement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateElement {
    String(Symbol),
    Expression(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanLiteral {
    pub value: bool,
    pub span: Span,
}

// ============================================================================
// Array and Object Expressions
// ============================================================================

/// Array expression; `None` elements are holes (`[1, , 2]`).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    pub elements: Vec<Option<ArrayElement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expression(Expression),
    /// Spread element: ...arr
    Spread(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    pub properties: Vec<ObjectProperty>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    Property(Property),
    Spread(SpreadProperty),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expression,
    /// `{ x }` written without a value.
    pub shorthand: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Identifier(Identifier),
    StringLiteral(StringLiteral),
    IntLiteral(IntLiteral),
    /// Computed property name: [expr]
    Computed(Box<Expression>),
}

impl PropertyKey {
    pub fn span(&self) -> &Span {
        match self {
            PropertyKey::Identifier(id) => &id.span,
            PropertyKey::StringLiteral(s) => &s.span,
            PropertyKey::IntLiteral(i) => &i.span,
            PropertyKey::Computed(e) => e.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadProperty {
    pub argument: Expression,
    pub span: Span,
}

// ============================================================================
// Functions
// ============================================================================

/// Function expression: function name(a, b) { ... }
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub function: Box<FunctionDecl>,
    pub span: Span,
}

/// Arrow function: (x) => x + 1
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: ArrowBody,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(BlockStatement),
}

// ============================================================================
// Unary & Binary Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,       // +x
    Minus,      // -x
    Not,        // !x
    BitwiseNot, // ~x
    Void,       // void x
    Delete,     // delete o.p
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    pub operator: UpdateOperator,
    pub prefix: bool,
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Exponent, // **

    // Comparison
    Equal,          // ==
    NotEqual,       // !=
    StrictEqual,    // ===
    StrictNotEqual, // !==
    LessThan,       // <
    LessEqual,      // <=
    GreaterThan,    // >
    GreaterEqual,   // >=

    // Bitwise
    BitwiseAnd,         // &
    BitwiseOr,          // |
    BitwiseXor,         // ^
    LeftShift,          // <<
    RightShift,         // >>
    UnsignedRightShift, // >>>

    In, // in
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    pub operator: LogicalOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,               // &&
    Or,                // ||
    NullishCoalescing, // ??
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub operator: AssignmentOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,                   // =
    AddAssign,                // +=
    SubAssign,                // -=
    MulAssign,                // *=
    DivAssign,                // /=
    ModAssign,                // %=
    ExpAssign,                // **=
    BitAndAssign,             // &=
    BitOrAssign,              // |=
    BitXorAssign,             // ^=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AndAssign,                // &&=
    OrAssign,                 // ||=
    NullishAssign,            // ??=
}

// ============================================================================
// Complex Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceExpression {
    pub expressions: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expression(Expression),
    /// Spread argument: f(...xs)
    Spread(Expression),
}

impl Argument {
    pub fn expression(&self) -> &Expression {
        match self {
            Argument::Expression(e) | Argument::Spread(e) => e,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub type_args: Vec<TypeAnnotation>,
    pub arguments: Vec<Argument>,
    /// f?.()
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: Identifier,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub callee: Box<Expression>,
    pub type_args: Vec<TypeAnnotation>,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AwaitExpression {
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldExpression {
    pub argument: Option<Box<Expression>>,
    /// yield*
    pub delegate: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeofExpression {
    pub argument: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceOfExpression {
    pub object: Box<Expression>,
    /// Right-hand side, usually a (possibly dotted) class name.
    pub class: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeCastExpression {
    pub object: Box<Expression>,
    pub target_type: TypeAnnotation,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonNullExpression {
    pub expression: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParenthesizedExpression {
    pub expression: Box<Expression>,
    pub span: Span,
}
