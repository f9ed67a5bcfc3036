//! IR values
//!
//! The value hierarchy is split by what may appear where:
//!
//! - [`Operand`]: an operand slot of an expression, reference or statement.
//!   Locals, constants and simple references only.
//! - [`Value`]: the right-hand side of an assignment. May be a compound
//!   [`Expr`] or a field/array [`Reference`].
//! - [`Place`]: the left-hand side of an assignment.
//!
//! Because expression operands are typed [`Operand`], an expression can never
//! contain another expression. The one rule the types cannot express (only
//! simple references in operand slots) is checked by
//! [`MethodBody::validate`](super::MethodBody::validate).

use super::constant::Constant;
use super::local::{Local, LocalTable};
use super::pretty::property_name;
use super::signature::{FieldSignature, MethodSignature};
use super::types::{ClassType, Type};
use serde::Serialize;
use std::fmt;

// ============================================================================
// References
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IndexValue {
    Local(Local),
    Constant(Constant),
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Local(local) => write!(f, "{}", local),
            IndexValue::Constant(constant) => write!(f, "{}", constant),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Reference {
    InstanceField { base: Local, field: FieldSignature },
    StaticField { field: FieldSignature },
    ArrayElement { base: Local, index: IndexValue },
    /// The n-th declared parameter, read once in the method prologue
    Parameter { index: usize, ty: Type },
    This { ty: Type },
    CaughtException { ty: Type },
    /// A captured variable read through the `%closures` local
    ClosureField { base: Local, name: String, ty: Type },
}

impl Reference {
    /// Simple references may sit in operand slots without materialization.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Reference::Parameter { .. }
                | Reference::This { .. }
                | Reference::CaughtException { .. }
                | Reference::ClosureField { .. }
        )
    }

    pub fn ty(&self, locals: &LocalTable) -> Type {
        match self {
            Reference::InstanceField { field, .. } | Reference::StaticField { field } => {
                field.ty.clone()
            }
            Reference::ArrayElement { base, .. } => match locals.ty(base.id) {
                Type::Array(element) => *element,
                Type::Tuple(_) => Type::Any,
                _ => Type::Unknown,
            },
            Reference::Parameter { ty, .. }
            | Reference::This { ty }
            | Reference::CaughtException { ty }
            | Reference::ClosureField { ty, .. } => ty.clone(),
        }
    }

    pub fn locals(&self) -> Vec<&Local> {
        match self {
            Reference::InstanceField { base, .. } | Reference::ClosureField { base, .. } => {
                vec![base]
            }
            Reference::ArrayElement { base, index } => match index {
                IndexValue::Local(index) => vec![base, index],
                IndexValue::Constant(_) => vec![base],
            },
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::InstanceField { base, field } => {
                write!(f, "{}{}", base, property_name(&field.name))
            }
            Reference::StaticField { field } => {
                write!(f, "{}{}", field.class.name, property_name(&field.name))
            }
            Reference::ArrayElement { base, index } => write!(f, "{}[{}]", base, index),
            Reference::Parameter { index, ty } => write!(f, "parameter{}: {}", index, ty),
            Reference::This { ty } => write!(f, "this: {}", ty),
            Reference::CaughtException { ty } => write!(f, "caughtexception: {}", ty),
            Reference::ClosureField { base, name, .. } => {
                write!(f, "{}{}", base, property_name(name))
            }
        }
    }
}

// ============================================================================
// Operands, values and places
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Operand {
    Local(Local),
    Constant(Constant),
    Ref(Reference),
}

impl Operand {
    pub fn ty(&self, locals: &LocalTable) -> Type {
        match self {
            Operand::Local(local) => locals.ty(local.id),
            Operand::Constant(constant) => constant.ty(),
            Operand::Ref(reference) => reference.ty(locals),
        }
    }

    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Operand::Local(local) => Some(local),
            _ => None,
        }
    }

    pub fn locals(&self) -> Vec<&Local> {
        match self {
            Operand::Local(local) => vec![local],
            Operand::Constant(_) => Vec::new(),
            Operand::Ref(reference) => reference.locals(),
        }
    }
}

impl From<Local> for Operand {
    fn from(local: Local) -> Self {
        Operand::Local(local)
    }
}

impl From<Constant> for Operand {
    fn from(constant: Constant) -> Self {
        Operand::Constant(constant)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(local) => write!(f, "{}", local),
            Operand::Constant(constant) => write!(f, "{}", constant),
            Operand::Ref(reference) => write!(f, "{}", reference),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Value {
    Local(Local),
    Constant(Constant),
    Ref(Reference),
    Expr(Box<Expr>),
}

impl Value {
    pub fn expr(expr: Expr) -> Self {
        Value::Expr(Box::new(expr))
    }

    /// True when the value can be used directly as an operand.
    pub fn is_single_address(&self) -> bool {
        match self {
            Value::Local(_) | Value::Constant(_) => true,
            Value::Ref(reference) => reference.is_simple(),
            Value::Expr(_) => false,
        }
    }

    /// Convert to an operand, handing the value back if it is multi-address.
    pub fn into_operand(self) -> Result<Operand, Value> {
        match self {
            Value::Local(local) => Ok(Operand::Local(local)),
            Value::Constant(constant) => Ok(Operand::Constant(constant)),
            Value::Ref(reference) if reference.is_simple() => Ok(Operand::Ref(reference)),
            other => Err(other),
        }
    }

    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Value::Local(local) => Some(local),
            _ => None,
        }
    }

    pub fn as_invoke(&self) -> Option<&InvokeExpr> {
        match self {
            Value::Expr(expr) => match expr.as_ref() {
                Expr::Invoke(invoke) => Some(invoke),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn ty(&self, locals: &LocalTable) -> Type {
        match self {
            Value::Local(local) => locals.ty(local.id),
            Value::Constant(constant) => constant.ty(),
            Value::Ref(reference) => reference.ty(locals),
            Value::Expr(expr) => expr.ty(locals),
        }
    }

    pub fn locals(&self) -> Vec<&Local> {
        match self {
            Value::Local(local) => vec![local],
            Value::Constant(_) => Vec::new(),
            Value::Ref(reference) => reference.locals(),
            Value::Expr(expr) => expr.locals(),
        }
    }
}

impl From<Operand> for Value {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Local(local) => Value::Local(local),
            Operand::Constant(constant) => Value::Constant(constant),
            Operand::Ref(reference) => Value::Ref(reference),
        }
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        Value::expr(expr)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(local) => write!(f, "{}", local),
            Value::Constant(constant) => write!(f, "{}", constant),
            Value::Ref(reference) => write!(f, "{}", reference),
            Value::Expr(expr) => write!(f, "{}", expr),
        }
    }
}

/// Assignment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Place {
    Local(Local),
    Ref(Reference),
}

impl Place {
    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Place::Local(local) => Some(local),
            Place::Ref(_) => None,
        }
    }

    pub fn locals(&self) -> Vec<&Local> {
        match self {
            Place::Local(local) => vec![local],
            Place::Ref(reference) => reference.locals(),
        }
    }
}

impl From<Place> for Value {
    fn from(place: Place) -> Self {
        match place {
            Place::Local(local) => Value::Local(local),
            Place::Ref(reference) => Value::Ref(reference),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Local(local) => write!(f, "{}", local),
            Place::Ref(reference) => write!(f, "{}", reference),
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::StrictEq => "===",
            RelOp::StrictNe => "!==",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    NullishCoalescing,
    In,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NullishCoalescing => "??",
            BinaryOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Relational comparison consumed by `if` statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConditionExpr {
    pub op: RelOp,
    pub left: Operand,
    pub right: Operand,
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum InvokeKind {
    Static,
    Instance { base: Local },
    /// Call through a function-typed local
    Ptr { ptr: Local },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    pub method: MethodSignature,
    pub args: Vec<Operand>,
}

impl InvokeExpr {
    pub fn new_static(method: MethodSignature, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Static,
            method,
            args,
        }
    }

    pub fn new_instance(base: Local, method: MethodSignature, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Instance { base },
            method,
            args,
        }
    }

    pub fn new_ptr(ptr: Local, method: MethodSignature, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Ptr { ptr },
            method,
            args,
        }
    }

    pub fn base(&self) -> Option<&Local> {
        match &self.kind {
            InvokeKind::Static => None,
            InvokeKind::Instance { base } => Some(base),
            InvokeKind::Ptr { ptr } => Some(ptr),
        }
    }
}

impl fmt::Display for InvokeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InvokeKind::Static => write!(f, "staticinvoke {}(", self.method)?,
            InvokeKind::Instance { base } => write!(f, "instanceinvoke {}.{}(", base, self.method)?,
            InvokeKind::Ptr { ptr } => write!(f, "ptrinvoke {}.{}(", ptr, self.method)?,
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Right-hand side of a type alias definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AliasTypeExpr {
    pub original: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Expr {
    Unary { op: UnaryOp, operand: Operand },
    Binary { op: BinaryOp, left: Operand, right: Operand },
    Condition(ConditionExpr),
    Invoke(InvokeExpr),
    New { class: ClassType },
    NewArray { base_ty: Type, size: Operand },
    Cast { operand: Operand, ty: Type },
    TypeOf { operand: Operand },
    InstanceOf { operand: Operand, check_ty: Type },
    Await { operand: Operand },
    Yield { operand: Operand },
    Delete { target: Reference },
}

impl Expr {
    /// Operand slots, in source order.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Expr::Unary { operand, .. }
            | Expr::Cast { operand, .. }
            | Expr::TypeOf { operand }
            | Expr::InstanceOf { operand, .. }
            | Expr::Await { operand }
            | Expr::Yield { operand } => vec![operand],
            Expr::Binary { left, right, .. } => vec![left, right],
            Expr::Condition(cond) => vec![&cond.left, &cond.right],
            Expr::Invoke(invoke) => invoke.args.iter().collect(),
            Expr::NewArray { size, .. } => vec![size],
            Expr::New { .. } | Expr::Delete { .. } => Vec::new(),
        }
    }

    pub fn locals(&self) -> Vec<&Local> {
        let mut locals: Vec<&Local> = match self {
            Expr::Invoke(invoke) => invoke.base().into_iter().collect(),
            Expr::Delete { target } => target.locals(),
            _ => Vec::new(),
        };
        for operand in self.operands() {
            locals.extend(operand.locals());
        }
        locals
    }

    pub fn ty(&self, locals: &LocalTable) -> Type {
        match self {
            Expr::Unary { op: UnaryOp::Not, .. } => Type::Boolean,
            Expr::Unary { operand, .. } => match operand.ty(locals) {
                Type::BigInt => Type::BigInt,
                _ => Type::Number,
            },
            Expr::Binary { op, left, right } => {
                let (left, right) = (left.ty(locals), right.ty(locals));
                binary_type(*op, left, right)
            }
            Expr::Condition(_) | Expr::InstanceOf { .. } | Expr::Delete { .. } => Type::Boolean,
            Expr::Invoke(invoke) => invoke.method.return_type().clone(),
            Expr::New { class } => Type::Class(class.clone()),
            Expr::NewArray { base_ty, .. } => Type::array_of(base_ty.clone()),
            Expr::Cast { ty, .. } => ty.clone(),
            Expr::TypeOf { .. } => Type::String,
            Expr::Await { operand } => match operand.ty(locals) {
                Type::Class(class) if class.signature.name == "Promise" => {
                    class.generics.into_iter().next().unwrap_or(Type::Unknown)
                }
                other => other,
            },
            Expr::Yield { .. } => Type::Unknown,
        }
    }
}

fn binary_type(op: BinaryOp, left: Type, right: Type) -> Type {
    match op {
        BinaryOp::In => Type::Boolean,
        BinaryOp::And | BinaryOp::Or | BinaryOp::NullishCoalescing => {
            Type::least_common(&[left, right])
        }
        BinaryOp::Add if left == Type::String || right == Type::String => Type::String,
        _ if left == Type::BigInt && right == Type::BigInt => Type::BigInt,
        BinaryOp::Add if left.is_unknown() || right.is_unknown() => Type::Unknown,
        _ => Type::Number,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand),
            Expr::Binary { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expr::Condition(cond) => write!(f, "{}", cond),
            Expr::Invoke(invoke) => write!(f, "{}", invoke),
            Expr::New { class } => write!(f, "new {}", class.signature.name),
            Expr::NewArray { base_ty, size } => write!(f, "newarray ({})[{}]", base_ty, size),
            Expr::Cast { operand, ty } => write!(f, "<{}>{}", ty, operand),
            Expr::TypeOf { operand } => write!(f, "typeof {}", operand),
            Expr::InstanceOf { operand, check_ty } => {
                write!(f, "{} instanceof {}", operand, check_ty)
            }
            Expr::Await { operand } => write!(f, "await {}", operand),
            Expr::Yield { operand } => write!(f, "yield {}", operand),
            Expr::Delete { target } => write!(f, "delete {}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::local::LocalKind;
    use crate::ir::signature::ClassSignature;

    #[test]
    fn test_single_address() {
        let mut locals = LocalTable::new();
        let x = locals.push("x", Type::Number, LocalKind::Named);

        assert!(Value::Local(x.clone()).is_single_address());
        assert!(Value::Constant(Constant::int(1)).is_single_address());
        assert!(Value::Ref(Reference::This { ty: Type::Any }).is_single_address());

        let field = FieldSignature::new(ClassSignature::unknown(), "f", Type::Unknown);
        let field_ref = Value::Ref(Reference::InstanceField { base: x.clone(), field });
        assert!(!field_ref.is_single_address());
        assert!(field_ref.into_operand().is_err());

        let sum = Value::expr(Expr::Binary {
            op: BinaryOp::Add,
            left: Operand::Local(x),
            right: Operand::Constant(Constant::int(1)),
        });
        assert!(!sum.is_single_address());
        assert_eq!(sum.ty(&locals), Type::Number);
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(binary_type(BinaryOp::Add, Type::String, Type::Number), Type::String);
        assert_eq!(binary_type(BinaryOp::Add, Type::Unknown, Type::Number), Type::Unknown);
        assert_eq!(binary_type(BinaryOp::Mul, Type::BigInt, Type::BigInt), Type::BigInt);
        assert_eq!(binary_type(BinaryOp::In, Type::String, Type::Any), Type::Boolean);
    }

    #[test]
    fn test_display_references() {
        let mut locals = LocalTable::new();
        let obj = locals.push("obj", Type::Unknown, LocalKind::Named);
        let plain = FieldSignature::new(ClassSignature::unknown(), "value", Type::Unknown);
        let odd = FieldSignature::new(ClassSignature::unknown(), "my-key", Type::Unknown);

        let a = Reference::InstanceField { base: obj.clone(), field: plain };
        let b = Reference::InstanceField { base: obj.clone(), field: odd };
        let c = Reference::ArrayElement {
            base: obj,
            index: IndexValue::Constant(Constant::int(0)),
        };
        assert_eq!(a.to_string(), "obj.value");
        assert_eq!(b.to_string(), "obj[\"my-key\"]");
        assert_eq!(c.to_string(), "obj[0]");
        assert_eq!(
            Reference::Parameter { index: 1, ty: Type::String }.to_string(),
            "parameter1: string"
        );
    }
}
