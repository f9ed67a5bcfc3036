//! Method bodies

use super::local::{Local, LocalTable};
use super::stmt::{MarkerKind, Stmt, StmtKind};
use super::types::{AliasType, Type};
use super::value::{Operand, Place, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// A `switch` discriminant and its case tests (`None` for `default`).
///
/// No branch statements are emitted for a switch; the CFG builder wires the
/// cases from this table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchInfo {
    pub discriminant: Operand,
    pub cases: Vec<Option<Operand>>,
}

/// The lowered body of one method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodBody {
    pub locals: LocalTable,
    pub stmts: Vec<Stmt>,
    /// Free identifiers promoted to globals, in first-use order
    pub globals: Vec<Local>,
    /// Type aliases declared in the body
    pub aliases: Vec<AliasType>,
    pub switches: Vec<SwitchInfo>,
    /// Declared return type, or the type inferred from `return` statements
    pub return_type: Type,
}

impl MethodBody {
    pub fn new(locals: LocalTable, stmts: Vec<Stmt>) -> Self {
        Self {
            locals,
            stmts,
            globals: Vec::new(),
            aliases: Vec::new(),
            switches: Vec::new(),
            return_type: Type::Unknown,
        }
    }

    pub fn local_named(&self, name: &str) -> Option<Local> {
        self.locals.find(name)
    }

    /// Validate the structural contracts of the body.
    ///
    /// - operand slots hold only locals, constants and simple references
    /// - a reference target is assigned a single-address value
    /// - every local mentioned exists in the local table
    /// - statement ids are unique
    /// - ternary markers come in complete true/false/end triples
    pub fn validate(&self) -> Result<(), String> {
        let mut ids = FxHashSet::default();
        for stmt in &self.stmts {
            if !ids.insert(stmt.id) {
                return Err(format!("Duplicate statement id {}", stmt.id));
            }

            for operand in stmt_operands(&stmt.kind) {
                if let Operand::Ref(reference) = operand {
                    if !reference.is_simple() {
                        return Err(format!(
                            "Statement {} ({}) uses compound reference {} as an operand",
                            stmt.id, stmt, reference
                        ));
                    }
                }
            }

            if let StmtKind::Assign {
                left: Place::Ref(_),
                right,
            } = &stmt.kind
            {
                if !right.is_single_address() {
                    return Err(format!(
                        "Statement {} ({}) stores a multi-address value into a reference",
                        stmt.id, stmt
                    ));
                }
            }

            for local in stmt_locals(&stmt.kind) {
                match self.locals.get(local.id) {
                    Some(info) if info.name == local.name => {}
                    _ => {
                        return Err(format!(
                            "Statement {} references unknown local {}",
                            stmt.id, local
                        ))
                    }
                }
            }
        }

        self.validate_markers()
    }

    fn validate_markers(&self) -> Result<(), String> {
        let mut seen: FxHashMap<u32, Vec<MarkerKind>> = FxHashMap::default();
        for marker in self.stmts.iter().filter_map(Stmt::marker) {
            if marker.kind.is_ternary() {
                seen.entry(marker.index).or_default().push(marker.kind);
            }
        }
        let expected = [
            MarkerKind::TernaryTrue,
            MarkerKind::TernaryFalse,
            MarkerKind::TernaryEnd,
        ];
        for (index, kinds) in seen {
            if kinds != expected {
                return Err(format!(
                    "Ternary #{} has markers {:?}, expected true/false/end",
                    index, kinds
                ));
            }
        }
        Ok(())
    }
}

/// Operand slots of a statement, including those inside its expression.
pub fn stmt_operands(kind: &StmtKind) -> Vec<&Operand> {
    match kind {
        StmtKind::Assign { right, .. } => match right {
            Value::Expr(expr) => expr.operands(),
            _ => Vec::new(),
        },
        StmtKind::Invoke(invoke) => invoke.args.iter().collect(),
        StmtKind::If(cond) => vec![&cond.left, &cond.right],
        StmtKind::Return(operand) | StmtKind::Throw(operand) => vec![operand],
        StmtKind::ReturnVoid | StmtKind::AliasTypeDefine { .. } | StmtKind::Dummy(_) => {
            Vec::new()
        }
    }
}

/// Every local mentioned by a statement.
pub fn stmt_locals(kind: &StmtKind) -> Vec<&Local> {
    match kind {
        StmtKind::Assign { left, right } => {
            let mut locals = left.locals();
            locals.extend(right.locals());
            locals
        }
        StmtKind::Invoke(invoke) => {
            let mut locals: Vec<&Local> = invoke.base().into_iter().collect();
            for arg in &invoke.args {
                locals.extend(arg.locals());
            }
            locals
        }
        other => stmt_operands(other)
            .into_iter()
            .flat_map(Operand::locals)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::constant::Constant;
    use crate::ir::local::{LocalId, LocalKind};
    use crate::ir::signature::{ClassSignature, FieldSignature};
    use crate::ir::stmt::{Marker, StmtId};
    use crate::ir::value::{BinaryOp, Expr, Reference};

    fn assign(id: u32, left: Place, right: Value) -> Stmt {
        Stmt::new(StmtId(id), StmtKind::Assign { left, right }, Vec::new())
    }

    fn dummy(id: u32, kind: MarkerKind, index: u32) -> Stmt {
        Stmt::new(StmtId(id), StmtKind::Dummy(Marker { kind, index }), Vec::new())
    }

    #[test]
    fn test_validate_accepts_three_address() {
        let mut locals = LocalTable::new();
        let x = locals.push("x", Type::Number, LocalKind::Named);
        let t = locals.push("%0", Type::Unknown, LocalKind::Temp);
        let stmts = vec![
            assign(
                0,
                Place::Local(t.clone()),
                Value::expr(Expr::Binary {
                    op: BinaryOp::Add,
                    left: Operand::Local(x.clone()),
                    right: Operand::Constant(Constant::int(1)),
                }),
            ),
            assign(1, Place::Local(x), Value::Local(t)),
        ];
        assert!(MethodBody::new(locals, stmts).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_compound_store() {
        let mut locals = LocalTable::new();
        let o = locals.push("o", Type::Unknown, LocalKind::Named);
        let field = FieldSignature::new(ClassSignature::unknown(), "f", Type::Unknown);
        let target = Place::Ref(Reference::InstanceField {
            base: o.clone(),
            field: field.clone(),
        });
        let stmts = vec![assign(
            0,
            target,
            Value::Ref(Reference::InstanceField { base: o, field }),
        )];
        assert!(MethodBody::new(locals, stmts).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_local() {
        let locals = LocalTable::new();
        let ghost = Local {
            id: LocalId(3),
            name: "ghost".into(),
        };
        let stmts = vec![assign(0, Place::Local(ghost), Value::Constant(Constant::Null))];
        assert!(MethodBody::new(locals, stmts).validate().is_err());
    }

    #[test]
    fn test_validate_markers() {
        let complete = vec![
            dummy(0, MarkerKind::TernaryTrue, 0),
            dummy(1, MarkerKind::TernaryFalse, 0),
            dummy(2, MarkerKind::TernaryEnd, 0),
            dummy(3, MarkerKind::LoopInit, 0),
        ];
        assert!(MethodBody::new(LocalTable::new(), complete).validate().is_ok());

        let broken = vec![
            dummy(0, MarkerKind::TernaryTrue, 0),
            dummy(1, MarkerKind::TernaryEnd, 0),
        ];
        assert!(MethodBody::new(LocalTable::new(), broken).validate().is_err());

        let duplicate_ids = vec![
            dummy(0, MarkerKind::LoopInit, 0),
            dummy(0, MarkerKind::LoopInit, 1),
        ];
        assert!(MethodBody::new(LocalTable::new(), duplicate_ids).validate().is_err());
    }
}
