//! Assignment Lowering
//!
//! Plain, compound and update assignments, plus destructuring. Every write
//! funnels through [`Lowerer::assign`], which keeps reference targets
//! single-address.

use super::{Lowered, Lowerer};
use crate::error::LowerError;
use crate::ir::{
    BinaryOp, Constant, Expr, IndexValue, InvokeExpr, Local, Operand, Place, Position, Reference,
    Stmt, Type, Value,
};
use crate::parser::ast::{self, Expression, Pattern, PropertyKey};
use tracing::debug;

/// How a pattern binding declares its names.
#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    pub is_const: bool,
    /// Annotated type, `Unknown` when absent
    pub declared: Type,
}

impl Declaration {
    /// The same declaration for names nested inside a pattern.
    fn nested(&self) -> Declaration {
        Declaration {
            is_const: self.is_const,
            declared: Type::Unknown,
        }
    }
}

impl<'a> Lowerer<'a> {
    /// Lower an assignment expression
    pub(crate) fn lower_assignment(
        &mut self,
        assign: &ast::AssignmentExpression,
    ) -> Result<Lowered, LowerError> {
        let position = self.position(&assign.span);

        let Some(op) = compound_op(assign.operator) else {
            if matches!(
                assign.left.unparenthesized(),
                Expression::Array(_) | Expression::Object(_)
            ) {
                let rhs = self.lower_expr(&assign.right)?;
                let (source, source_pos, mut stmts) = self.temp_of(rhs);
                stmts.extend(self.destructure(&assign.left, &source, source_pos)?);
                return Ok(Lowered::with_stmts(
                    Value::Local(source),
                    vec![source_pos],
                    stmts,
                ));
            }

            // The target is evaluated before the value
            let (place, place_positions, mut stmts) = self.lower_target(&assign.left)?;
            let rhs = self.lower_expr(&assign.right)?;
            let mut assigned = self.assign(place, place_positions, rhs);
            stmts.append(&mut assigned.stmts);
            assigned.stmts = stmts;
            return Ok(assigned);
        };

        let (place, place_positions, stmts) = self.lower_target(&assign.left)?;
        self.update_place(
            place,
            place_positions,
            stmts,
            op,
            Some(&assign.right),
            position,
            false,
        )
    }

    /// Lower `++x`, `x--` and friends
    pub(crate) fn lower_update(
        &mut self,
        update: &ast::UpdateExpression,
    ) -> Result<Lowered, LowerError> {
        let position = self.position(&update.span);
        let op = match update.operator {
            ast::UpdateOperator::Increment => BinaryOp::Add,
            ast::UpdateOperator::Decrement => BinaryOp::Sub,
        };
        let (place, place_positions, stmts) = self.lower_target(&update.argument)?;
        self.update_place(
            place,
            place_positions,
            stmts,
            op,
            None,
            position,
            !update.prefix,
        )
    }

    /// Read-modify-write of a place.
    ///
    /// A reference is read into a temporary once and written back through
    /// the same reference, so its base and index are evaluated once.
    #[allow(clippy::too_many_arguments)]
    fn update_place(
        &mut self,
        place: Place,
        place_positions: Vec<Position>,
        mut stmts: Vec<Stmt>,
        op: BinaryOp,
        right: Option<&Expression>,
        position: Position,
        postfix: bool,
    ) -> Result<Lowered, LowerError> {
        let target_pos = place_positions
            .first()
            .copied()
            .unwrap_or(Position::UNKNOWN);

        match place {
            Place::Local(local) => {
                let (right, right_pos, right_stmts) = self.update_operand(right, position)?;
                stmts.extend(right_stmts);
                let expr = Expr::Binary {
                    op,
                    left: Operand::Local(local.clone()),
                    right,
                };
                let stmt = self.assign_stmt(
                    Place::Local(local.clone()),
                    &place_positions,
                    Value::expr(expr),
                    &[position, target_pos, right_pos],
                );
                stmts.push(stmt);
                Ok(Lowered::with_stmts(
                    Value::Local(local),
                    place_positions,
                    stmts,
                ))
            }
            Place::Ref(reference) => {
                let read = Lowered::new(Value::Ref(reference.clone()), place_positions.clone());
                let (current, current_pos, read_stmts) = self.temp_of(read);
                stmts.extend(read_stmts);

                let (right, right_pos, right_stmts) = self.update_operand(right, position)?;
                stmts.extend(right_stmts);
                let updated = Lowered::new(
                    Value::expr(Expr::Binary {
                        op,
                        left: Operand::Local(current.clone()),
                        right,
                    }),
                    vec![position, current_pos, right_pos],
                );
                let (updated, updated_pos, update_stmts) = self.temp_of(updated);
                stmts.extend(update_stmts);

                let store = self.assign_stmt(
                    Place::Ref(reference),
                    &place_positions,
                    Value::Local(updated.clone()),
                    &[updated_pos],
                );
                stmts.push(store);

                let result = if postfix { current } else { updated };
                Ok(Lowered::with_stmts(
                    Value::Local(result),
                    vec![position],
                    stmts,
                ))
            }
        }
    }

    fn update_operand(
        &mut self,
        right: Option<&Expression>,
        position: Position,
    ) -> Result<(Operand, Position, Vec<Stmt>), LowerError> {
        match right {
            Some(right) => {
                let lowered = self.lower_expr(right)?;
                Ok(self.operand_of(lowered))
            }
            None => Ok((Operand::Constant(Constant::int(1)), position, Vec::new())),
        }
    }

    // ========================================================================
    // Targets
    // ========================================================================

    /// Lower an assignment target to a place.
    pub(crate) fn lower_target(
        &mut self,
        target: &Expression,
    ) -> Result<(Place, Vec<Position>, Vec<Stmt>), LowerError> {
        let position = self.position(target.span());
        match target {
            Expression::Identifier(ident) => {
                let name = self.name(ident.name);
                let place = self.name_place(name, position)?;
                Ok((place, vec![position], Vec::new()))
            }
            Expression::Member(_) | Expression::Index(_) => {
                let lowered = self.lower_expr(target)?;
                match lowered.value {
                    Value::Ref(reference) => {
                        Ok((Place::Ref(reference), lowered.positions, lowered.stmts))
                    }
                    Value::Local(local) => {
                        Ok((Place::Local(local), lowered.positions, lowered.stmts))
                    }
                    _ => Err(LowerError::InvalidAssignmentTarget { position }),
                }
            }
            Expression::Parenthesized(paren) => self.lower_target(&paren.expression),
            Expression::NonNull(non_null) => self.lower_target(&non_null.expression),
            Expression::TypeCast(cast) => self.lower_target(&cast.object),
            _ => Err(LowerError::InvalidAssignmentTarget { position }),
        }
    }

    fn name_place(&mut self, name: &str, position: Position) -> Result<Place, LowerError> {
        match self.resolve_name(name) {
            Value::Local(local) => Ok(Place::Local(local)),
            Value::Ref(reference) => Ok(Place::Ref(reference)),
            _ => Err(LowerError::InvalidAssignmentTarget { position }),
        }
    }

    /// Write a value to a place; the result is the value the assignment yields.
    ///
    /// A local target yields the local. A reference target is only ever
    /// assigned an operand, which is also the result.
    pub(crate) fn assign(
        &mut self,
        place: Place,
        place_positions: Vec<Position>,
        rhs: Lowered,
    ) -> Lowered {
        match place {
            Place::Local(local) => {
                let Lowered {
                    value,
                    mut positions,
                    mut stmts,
                } = rhs;
                if positions.is_empty() {
                    positions.push(Position::UNKNOWN);
                }
                let stmt = self.assign_stmt(
                    Place::Local(local.clone()),
                    &place_positions,
                    value,
                    &positions,
                );
                stmts.push(stmt);
                Lowered::with_stmts(Value::Local(local), place_positions, stmts)
            }
            Place::Ref(reference) => {
                let (operand, operand_pos, mut stmts) = self.operand_of(rhs);
                let stmt = self.assign_stmt(
                    Place::Ref(reference),
                    &place_positions,
                    Value::from(operand.clone()),
                    &[operand_pos],
                );
                stmts.push(stmt);
                Lowered::with_stmts(Value::from(operand), vec![operand_pos], stmts)
            }
        }
    }

    // ========================================================================
    // Destructuring
    // ========================================================================

    /// Bind a declaration or catch pattern to a value.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        rhs: Lowered,
        decl: Option<&Declaration>,
    ) -> Result<Vec<Stmt>, LowerError> {
        match pattern {
            Pattern::Identifier(ident) => self.bind_identifier(ident, rhs, decl),
            Pattern::Array(array) => {
                let (source, source_pos, mut stmts) = self.temp_of(rhs);
                let nested = decl.map(Declaration::nested);
                for (i, element) in array.elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    if element.default.is_some() {
                        debug!("default value in array pattern is not lowered");
                    }
                    let position = self.position(element.pattern.span());
                    let read = element_read(&source, i, position, source_pos);
                    stmts.extend(self.bind_pattern(&element.pattern, read, nested.as_ref())?);
                }
                if let Some(rest) = &array.rest {
                    let position = self.position(rest.span());
                    let read = self.rest_read(&source, array.elements.len(), position, source_pos);
                    stmts.extend(self.bind_pattern(rest, read, nested.as_ref())?);
                }
                Ok(stmts)
            }
            Pattern::Object(object) => {
                let (source, source_pos, mut stmts) = self.temp_of(rhs);
                let nested = decl.map(Declaration::nested);
                for property in &object.properties {
                    let Some(key) = self.property_key(&property.key) else {
                        debug!("computed key in object pattern is not lowered");
                        continue;
                    };
                    if property.default.is_some() {
                        debug!("default value for `{}` in object pattern is not lowered", key);
                    }
                    let position = self.position(&property.span);
                    let field = self.instance_field(&source, key);
                    let read = Lowered::new(
                        Value::Ref(Reference::InstanceField {
                            base: source.clone(),
                            field,
                        }),
                        vec![position, source_pos],
                    );
                    stmts.extend(self.bind_pattern(&property.value, read, nested.as_ref())?);
                }
                if object.rest.is_some() {
                    debug!("rest element in object pattern is not lowered");
                }
                Ok(stmts)
            }
        }
    }

    fn bind_identifier(
        &mut self,
        ident: &ast::Identifier,
        rhs: Lowered,
        decl: Option<&Declaration>,
    ) -> Result<Vec<Stmt>, LowerError> {
        let name = self.name(ident.name);
        let position = self.position(&ident.span);

        let Some(decl) = decl else {
            let place = self.name_place(name, position)?;
            return Ok(self.assign(place, vec![position], rhs).stmts);
        };

        let local = self.symbols.declare(name, Type::Unknown);
        let rhs_ty = rhs.value.ty(self.symbols.locals());
        let ty = if !decl.declared.is_unknown() {
            decl.declared.clone()
        } else if !rhs_ty.is_unknown() && rhs_ty != Type::Undefined {
            rhs_ty
        } else {
            Type::Unknown
        };
        if !ty.is_unknown() {
            self.symbols.locals_mut().set_type(local.id, ty);
        }

        let stmts = self
            .assign(Place::Local(local.clone()), vec![position], rhs)
            .stmts;
        if let (Some(last), Some(info)) = (stmts.last(), self.symbols.locals_mut().get_mut(local.id))
        {
            info.decl_stmt = Some(last.id);
            info.is_const = decl.is_const;
        }
        Ok(stmts)
    }

    /// Bind a destructuring assignment target written as an expression.
    pub(crate) fn bind_target(&mut self, target: &Expression, rhs: Lowered) -> Result<Vec<Stmt>, LowerError> {
        match target.unparenthesized() {
            pattern @ (Expression::Array(_) | Expression::Object(_)) => {
                let (source, source_pos, mut stmts) = self.temp_of(rhs);
                stmts.extend(self.destructure(pattern, &source, source_pos)?);
                Ok(stmts)
            }
            Expression::Assignment(assign)
                if matches!(assign.operator, ast::AssignmentOperator::Assign) =>
            {
                debug!("default value in assignment pattern is not lowered");
                self.bind_target(&assign.left, rhs)
            }
            other => {
                let (place, place_positions, mut stmts) = self.lower_target(other)?;
                stmts.extend(self.assign(place, place_positions, rhs).stmts);
                Ok(stmts)
            }
        }
    }

    /// Reads out of an already materialized source, one per target element.
    fn destructure(
        &mut self,
        pattern: &Expression,
        source: &Local,
        source_pos: Position,
    ) -> Result<Vec<Stmt>, LowerError> {
        let mut stmts = Vec::new();
        match pattern.unparenthesized() {
            Expression::Array(array) => {
                for (i, element) in array.elements.iter().enumerate() {
                    match element {
                        None => {}
                        Some(ast::ArrayElement::Expression(element)) => {
                            let position = self.position(element.span());
                            let read = element_read(source, i, position, source_pos);
                            stmts.extend(self.bind_target(element, read)?);
                        }
                        Some(ast::ArrayElement::Spread(element)) => {
                            let position = self.position(element.span());
                            let read = self.rest_read(source, i, position, source_pos);
                            stmts.extend(self.bind_target(element, read)?);
                        }
                    }
                }
            }
            Expression::Object(object) => {
                for property in &object.properties {
                    let ast::ObjectProperty::Property(property) = property else {
                        debug!("spread in object assignment pattern is not lowered");
                        continue;
                    };
                    let Some(key) = self.property_key(&property.key) else {
                        debug!("computed key in object assignment pattern is not lowered");
                        continue;
                    };
                    let position = self.position(&property.span);
                    let field = self.instance_field(source, key);
                    let read = Lowered::new(
                        Value::Ref(Reference::InstanceField {
                            base: source.clone(),
                            field,
                        }),
                        vec![position, source_pos],
                    );
                    stmts.extend(self.bind_target(&property.value, read)?);
                }
            }
            other => {
                let position = self.position(other.span());
                return Err(LowerError::InvalidAssignmentTarget { position });
            }
        }
        Ok(stmts)
    }

    /// `source.slice(start)` for a rest element.
    fn rest_read(
        &self,
        source: &Local,
        start: usize,
        position: Position,
        source_pos: Position,
    ) -> Lowered {
        let slice = InvokeExpr::new_instance(
            source.clone(),
            self.resolver.array_slice(),
            vec![Operand::Constant(Constant::int(start as i64))],
        );
        Lowered::new(
            Value::expr(Expr::Invoke(slice)),
            vec![position, source_pos, position],
        )
    }

    /// Static name of an object key, `None` for computed keys.
    pub(crate) fn property_key(&self, key: &PropertyKey) -> Option<String> {
        match key {
            PropertyKey::Identifier(ident) => Some(self.name(ident.name).to_string()),
            PropertyKey::StringLiteral(lit) => Some(self.name(lit.value).to_string()),
            PropertyKey::IntLiteral(lit) => Some(lit.value.to_string()),
            PropertyKey::Computed(_) => None,
        }
    }
}

fn element_read(source: &Local, index: usize, position: Position, source_pos: Position) -> Lowered {
    Lowered::new(
        Value::Ref(Reference::ArrayElement {
            base: source.clone(),
            index: IndexValue::Constant(Constant::int(index as i64)),
        }),
        vec![position, source_pos],
    )
}

fn compound_op(op: ast::AssignmentOperator) -> Option<BinaryOp> {
    use ast::AssignmentOperator as A;
    Some(match op {
        A::Assign => return None,
        A::AddAssign => BinaryOp::Add,
        A::SubAssign => BinaryOp::Sub,
        A::MulAssign => BinaryOp::Mul,
        A::DivAssign => BinaryOp::Div,
        A::ModAssign => BinaryOp::Rem,
        A::ExpAssign => BinaryOp::Exp,
        A::BitAndAssign => BinaryOp::BitAnd,
        A::BitOrAssign => BinaryOp::BitOr,
        A::BitXorAssign => BinaryOp::BitXor,
        A::LeftShiftAssign => BinaryOp::Shl,
        A::RightShiftAssign => BinaryOp::Shr,
        A::UnsignedRightShiftAssign => BinaryOp::UShr,
        A::AndAssign => BinaryOp::And,
        A::OrAssign => BinaryOp::Or,
        A::NullishAssign => BinaryOp::NullishCoalescing,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, lower_main, model};
    use crate::error::LowerError;
    use crate::ir::signature::{DEFAULT_CLASS, DEFAULT_METHOD};
    use crate::ir::{Expr, Operand, Place, StmtKind, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compound_on_local_keeps_identity() {
        let body = lower_main("let x = 1;\nx += 2;\nlet y = x;");
        assert_eq!(lines(&body), vec!["x = 1", "x = x + 2", "y = x"]);

        let x = body.locals.find("x").unwrap();
        match &body.stmts[2].kind {
            StmtKind::Assign {
                left: Place::Local(left),
                right: Value::Expr(expr),
            } => {
                assert_eq!(left.id, x.id);
                match expr.as_ref() {
                    Expr::Binary {
                        left: Operand::Local(read),
                        ..
                    } => assert_eq!(read.id, x.id),
                    other => panic!("expected binary, got {:?}", other),
                }
            }
            other => panic!("expected compound assignment, got {:?}", other),
        }
        match &body.stmts[3].kind {
            StmtKind::Assign {
                right: Value::Local(read),
                ..
            } => assert_eq!(read.id, x.id),
            other => panic!("expected read of x, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_index_evaluates_key_once() {
        let body = lower_main("arr[f()] += 1;");
        assert_eq!(
            lines(&body),
            vec![
                "%0 = staticinvoke <test.ts: %dflt.f()>()",
                "%1 = arr[%0]",
                "%2 = %1 + 1",
                "arr[%0] = %2",
            ]
        );
    }

    #[test]
    fn test_postfix_field_yields_old_value() {
        let body = lower_main("let v = obj.n++;");
        assert_eq!(
            lines(&body),
            vec!["%0 = obj.n", "%1 = %0 + 1", "obj.n = %1", "v = %0"]
        );
    }

    #[test]
    fn test_chained_assignment() {
        let body = lower_main("a = b = 3;");
        assert_eq!(lines(&body), vec!["b = 3", "a = b"]);
    }

    #[test]
    fn test_array_destructuring_with_rest() {
        let body = lower_main("[a, ...b] = src;");
        assert_eq!(
            lines(&body),
            vec![
                "%0 = src",
                "a = %0[0]",
                "b = instanceinvoke %0.<%builtin: Array.slice(number)>(1)",
            ]
        );
    }

    #[test]
    fn test_object_pattern_declaration() {
        let body = lower_main("let { p, q: r } = obj;");
        assert_eq!(lines(&body), vec!["%0 = obj", "p = %0.p", "r = %0.q"]);
        assert!(body.local_named("q").is_none());
    }

    #[test]
    fn test_invalid_target_fails_the_method() {
        let model = model("1 = x;");
        assert!(model.body(DEFAULT_CLASS, DEFAULT_METHOD).is_none());
        assert_eq!(model.failures.len(), 1);
        assert!(matches!(
            model.failures[0].error,
            LowerError::InvalidAssignmentTarget { .. }
        ));
    }
}
