//! IR statements

use super::position::{OriginText, Position};
use super::types::AliasType;
use super::value::{AliasTypeExpr, ConditionExpr, InvokeExpr, Operand, Place, Value};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StmtId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Region delimiters consumed by the CFG builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerKind {
    /// Precedes the condition of a loop header
    LoopInit,
    TernaryTrue,
    TernaryFalse,
    TernaryEnd,
}

impl MarkerKind {
    pub fn name(self) -> &'static str {
        match self {
            MarkerKind::LoopInit => "loop-init",
            MarkerKind::TernaryTrue => "ternary-true",
            MarkerKind::TernaryFalse => "ternary-false",
            MarkerKind::TernaryEnd => "ternary-end",
        }
    }

    pub fn is_ternary(self) -> bool {
        !matches!(self, MarkerKind::LoopInit)
    }
}

/// A dummy marker. `index` is unique per kind family within one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub index: u32,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.name(), self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    Assign { left: Place, right: Value },
    Invoke(InvokeExpr),
    /// Falls through when the condition holds
    If(ConditionExpr),
    Return(Operand),
    ReturnVoid,
    Throw(Operand),
    AliasTypeDefine { alias: AliasType, expr: AliasTypeExpr },
    Dummy(Marker),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub id: StmtId,
    pub kind: StmtKind,
    /// One position per operand slot, left to right
    pub positions: Vec<Position>,
    pub origin: Option<OriginText>,
}

impl Stmt {
    pub fn new(id: StmtId, kind: StmtKind, positions: Vec<Position>) -> Self {
        Self {
            id,
            kind,
            positions,
            origin: None,
        }
    }

    pub fn marker(&self) -> Option<Marker> {
        match self.kind {
            StmtKind::Dummy(marker) => Some(marker),
            _ => None,
        }
    }

    /// The invoke expression carried by this statement, if any.
    pub fn invoke(&self) -> Option<&InvokeExpr> {
        match &self.kind {
            StmtKind::Invoke(invoke) => Some(invoke),
            StmtKind::Assign { right, .. } => right.as_invoke(),
            _ => None,
        }
    }

    /// Position of the statement's first operand.
    pub fn position(&self) -> Position {
        self.positions.first().copied().unwrap_or(Position::UNKNOWN)
    }
}

impl fmt::Display for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StmtKind::Assign { left, right } => write!(f, "{} = {}", left, right),
            StmtKind::Invoke(invoke) => write!(f, "{}", invoke),
            StmtKind::If(cond) => write!(f, "if {}", cond),
            StmtKind::Return(value) => write!(f, "return {}", value),
            StmtKind::ReturnVoid => write!(f, "return"),
            StmtKind::Throw(value) => write!(f, "throw {}", value),
            StmtKind::AliasTypeDefine { alias, expr } => {
                write!(f, "type {} = {}", alias.name, expr.original)
            }
            StmtKind::Dummy(marker) => write!(f, "dummy {}", marker),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::constant::Constant;
    use crate::ir::local::{LocalKind, LocalTable};
    use crate::ir::types::Type;
    use crate::ir::value::RelOp;

    #[test]
    fn test_display() {
        let mut locals = LocalTable::new();
        let t = locals.push("%1", Type::Boolean, LocalKind::Temp);
        let cond = StmtKind::If(ConditionExpr {
            op: RelOp::Ne,
            left: Operand::Local(t),
            right: Operand::Constant(Constant::Boolean(true)),
        });
        assert_eq!(cond.to_string(), "if %1 != true");

        let dummy = StmtKind::Dummy(Marker {
            kind: MarkerKind::TernaryTrue,
            index: 0,
        });
        assert_eq!(dummy.to_string(), "dummy ternary-true#0");
        assert_eq!(StmtKind::ReturnVoid.to_string(), "return");
    }
}
