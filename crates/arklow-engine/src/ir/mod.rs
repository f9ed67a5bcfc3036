//! Three-address intermediate representation
//!
//! The IR produced by the lowering engine is a flat, ordered statement list
//! per method. Every operand slot is typed [`Operand`] (a local, a constant or
//! a reference), so a nested expression cannot appear where a simple value is
//! expected. Control flow is not resolved here: conditional statements and
//! [`Marker`] dummies delimit the regions a later CFG builder turns into basic
//! blocks.
//!
//! # Structure
//!
//! - [`MethodBody`] - locals, statements and side tables of one method
//! - [`Stmt`] - a statement with its operand positions and origin text
//! - [`Value`], [`Operand`], [`Place`] - right-hand sides, operand slots, assignment targets
//! - [`Expr`], [`Reference`] - compound values
//! - [`Type`] and the signature types

pub mod body;
pub mod constant;
pub mod local;
pub mod position;
pub mod pretty;
pub mod signature;
pub mod stmt;
pub mod types;
pub mod value;

pub use body::{MethodBody, SwitchInfo};
pub use constant::{Constant, NumberConstant};
pub use local::{Local, LocalId, LocalInfo, LocalKind, LocalTable};
pub use position::{OriginText, Position};
pub use pretty::PrettyPrint;
pub use signature::{
    ClassSignature, FieldSignature, FileSignature, MethodParameter, MethodSignature,
    MethodSubSignature,
};
pub use stmt::{Marker, MarkerKind, Stmt, StmtId, StmtKind};
pub use types::{AliasType, ClassType, Type};
pub use value::{
    AliasTypeExpr, BinaryOp, ConditionExpr, Expr, IndexValue, InvokeExpr, InvokeKind, Operand,
    Place, Reference, RelOp, UnaryOp, Value,
};
