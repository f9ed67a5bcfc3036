//! Control Flow Lowering
//!
//! Conditions, loop headers, the ternary operator and the iteration
//! protocol behind `for-of`/`for-in`. Only headers are produced here; loop
//! and branch bodies are emitted by the body walker.

use super::assign::Declaration;
use super::expr::constant;
use super::{Lowered, Lowerer};
use crate::error::LowerError;
use crate::ir::{
    ConditionExpr, Constant, Expr, InvokeExpr, Marker, MarkerKind, Operand, Place, Position,
    Reference, RelOp, Stmt, StmtKind, SwitchInfo, Type, Value,
};
use crate::parser::ast::{self, Expression, ForInit, ForOfLeft, VariableKind};
use crate::parser::Span;

/// Header and update statements of a `for` loop.
pub(crate) struct ForParts {
    pub head: Vec<Stmt>,
    pub update: Vec<Stmt>,
}

impl<'a> Lowerer<'a> {
    pub(crate) fn marker(&mut self, kind: MarkerKind, index: u32, position: Position) -> Stmt {
        self.stmt(StmtKind::Dummy(Marker { kind, index }), vec![position])
    }

    /// Turn a lowered value into a branch condition.
    ///
    /// Relational values are used as they are; anything else is tested
    /// against zero.
    pub(crate) fn condition_of(
        &mut self,
        lowered: Lowered,
    ) -> (ConditionExpr, Vec<Position>, Vec<Stmt>) {
        let Lowered {
            value,
            positions,
            stmts,
        } = lowered;
        match value {
            Value::Expr(expr) => match *expr {
                Expr::Condition(condition) => {
                    let operand_positions = if positions.len() > 1 {
                        positions[1..].to_vec()
                    } else {
                        positions
                    };
                    (condition, operand_positions, stmts)
                }
                other => self.nonzero(Lowered::with_stmts(Value::expr(other), positions, stmts)),
            },
            other => self.nonzero(Lowered::with_stmts(other, positions, stmts)),
        }
    }

    fn nonzero(&mut self, lowered: Lowered) -> (ConditionExpr, Vec<Position>, Vec<Stmt>) {
        let (operand, position, stmts) = self.operand_of(lowered);
        let condition = ConditionExpr {
            op: RelOp::Ne,
            left: operand,
            right: Operand::Constant(Constant::int(0)),
        };
        (condition, vec![position, position], stmts)
    }

    /// `if (test)` header
    pub(crate) fn lower_if_header(&mut self, test: &Expression) -> Result<Vec<Stmt>, LowerError> {
        let lowered = self.lower_expr(test)?;
        let (condition, positions, mut stmts) = self.condition_of(lowered);
        let branch = self.stmt(StmtKind::If(condition), positions);
        stmts.push(branch);
        Ok(stmts)
    }

    /// `while`/`do-while` header: loop marker, then the condition.
    pub(crate) fn lower_loop_header(
        &mut self,
        test: &Expression,
        span: &Span,
    ) -> Result<Vec<Stmt>, LowerError> {
        let index = self.next_loop();
        let position = self.position(span);
        let mut stmts = vec![self.marker(MarkerKind::LoopInit, index, position)];
        stmts.extend(self.lower_if_header(test)?);
        Ok(stmts)
    }

    /// `for (init; test; update)`
    pub(crate) fn lower_for_parts(
        &mut self,
        for_stmt: &ast::ForStatement,
    ) -> Result<ForParts, LowerError> {
        let position = self.position(&for_stmt.span);
        let mut head = match &for_stmt.init {
            Some(ForInit::VariableDecl(decl)) => self.lower_var_decl(decl)?,
            Some(ForInit::Expression(expr)) => self.lower_effect(expr)?,
            None => Vec::new(),
        };

        let index = self.next_loop();
        head.push(self.marker(MarkerKind::LoopInit, index, position));
        match &for_stmt.test {
            Some(test) => head.extend(self.lower_if_header(test)?),
            None => {
                let (condition, positions, stmts) =
                    self.condition_of(constant(Constant::Boolean(true), position));
                head.extend(stmts);
                head.push(self.stmt(StmtKind::If(condition), positions));
            }
        }

        let update = match &for_stmt.update {
            Some(update) => self.lower_effect(update)?,
            None => Vec::new(),
        };
        Ok(ForParts { head, update })
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// `for (x of xs)` and `for (k in o)` headers.
    ///
    /// ```text
    /// %it = instanceinvoke xs.<iterator>()
    /// loop marker
    /// %r = instanceinvoke %it.<next>()
    /// %d = %r.<done>
    /// if %d != true
    /// %v = %r.<value>
    /// %x = <%v as T>
    /// x = %x
    /// ```
    pub(crate) fn lower_for_of_header(
        &mut self,
        for_of: &ast::ForOfStatement,
        keys: bool,
    ) -> Result<Vec<Stmt>, LowerError> {
        let position = self.position(&for_of.span);
        let iterable = self.lower_expr(&for_of.right)?;
        let (iterable, iterable_pos, mut stmts) = self.local_of(iterable);

        let iterator_method = self.resolver.iterator_method();
        let (iterator, iterator_pos, iterator_stmts) = self.temp_of(Lowered::new(
            Value::expr(Expr::Invoke(InvokeExpr::new_instance(
                iterable,
                iterator_method,
                Vec::new(),
            ))),
            vec![position, iterable_pos],
        ));
        stmts.extend(iterator_stmts);

        let index = self.next_loop();
        stmts.push(self.marker(MarkerKind::LoopInit, index, position));

        let next = self.resolver.iterator_next();
        let (result, result_pos, result_stmts) = self.temp_of(Lowered::new(
            Value::expr(Expr::Invoke(InvokeExpr::new_instance(iterator, next, Vec::new()))),
            vec![position, iterator_pos],
        ));
        stmts.extend(result_stmts);

        let done_field = self.resolver.iterator_result_done();
        let (done, done_pos, done_stmts) = self.temp_of(Lowered::new(
            Value::Ref(Reference::InstanceField {
                base: result.clone(),
                field: done_field,
            }),
            vec![position, result_pos],
        ));
        stmts.extend(done_stmts);
        let exit = ConditionExpr {
            op: RelOp::Ne,
            left: Operand::Local(done),
            right: Operand::Constant(Constant::Boolean(true)),
        };
        stmts.push(self.stmt(StmtKind::If(exit), vec![done_pos, position]));

        let value_field = self.resolver.iterator_result_value();
        let (value, value_pos, value_stmts) = self.temp_of(Lowered::new(
            Value::Ref(Reference::InstanceField {
                base: result,
                field: value_field,
            }),
            vec![position, result_pos],
        ));
        stmts.extend(value_stmts);

        let declared = match &for_of.left {
            ForOfLeft::VariableDecl {
                type_annotation, ..
            } => self.resolve_type(type_annotation.as_ref()),
            ForOfLeft::Target(_) => Type::Unknown,
        };
        let cast_ty = if keys { Type::String } else { declared.clone() };
        let (item, item_pos, cast_stmts) = self.temp_of(Lowered::new(
            Value::expr(Expr::Cast {
                operand: Operand::Local(value),
                ty: cast_ty,
            }),
            vec![position, value_pos],
        ));
        stmts.extend(cast_stmts);

        let item = Lowered::new(Value::Local(item), vec![item_pos]);
        let binding = match &for_of.left {
            ForOfLeft::VariableDecl { kind, pattern, .. } => {
                let declaration = Declaration {
                    is_const: *kind == VariableKind::Const,
                    declared,
                };
                self.bind_pattern(pattern, item, Some(&declaration))?
            }
            ForOfLeft::Target(target) => self.bind_target(target, item)?,
        };
        stmts.extend(binding);
        Ok(stmts)
    }

    // ========================================================================
    // Ternary and switch
    // ========================================================================

    /// Lower `test ? a : b`.
    ///
    /// The false branch follows the `If` directly; the true branch is
    /// delimited by the ternary markers.
    pub(crate) fn lower_conditional(
        &mut self,
        cond: &ast::ConditionalExpression,
    ) -> Result<Lowered, LowerError> {
        let index = self.next_ternary();
        let position = self.position(&cond.span);

        let test = self.lower_expr(&cond.test)?;
        let (condition, positions, mut stmts) = self.condition_of(test);
        stmts.push(self.stmt(StmtKind::If(condition), positions));
        let result = self.symbols.temp(Type::Unknown);

        stmts.push(self.marker(MarkerKind::TernaryTrue, index, position));
        let consequent = self.lower_expr(&cond.consequent)?;
        let (true_value, true_pos, true_stmts) = self.operand_of(consequent);
        stmts.extend(true_stmts);
        let true_ty = true_value.ty(self.symbols.locals());
        stmts.push(self.assign_stmt(
            Place::Local(result.clone()),
            &[position],
            Value::from(true_value),
            &[true_pos],
        ));

        stmts.push(self.marker(MarkerKind::TernaryFalse, index, position));
        let alternate = self.lower_expr(&cond.alternate)?;
        let (false_value, false_pos, false_stmts) = self.operand_of(alternate);
        stmts.extend(false_stmts);
        let false_ty = false_value.ty(self.symbols.locals());
        stmts.push(self.assign_stmt(
            Place::Local(result.clone()),
            &[position],
            Value::from(false_value),
            &[false_pos],
        ));

        stmts.push(self.marker(MarkerKind::TernaryEnd, index, position));
        self.symbols
            .locals_mut()
            .set_type(result.id, Type::least_common(&[true_ty, false_ty]));
        Ok(Lowered::with_stmts(Value::Local(result), vec![position], stmts))
    }

    /// Record the discriminant and case tests of a `switch`.
    pub(crate) fn lower_switch_header(
        &mut self,
        switch: &ast::SwitchStatement,
    ) -> Result<Vec<Stmt>, LowerError> {
        let discriminant = self.lower_expr(&switch.discriminant)?;
        let (discriminant, _, mut stmts) = self.operand_of(discriminant);
        let mut cases = Vec::with_capacity(switch.cases.len());
        for case in &switch.cases {
            match &case.test {
                Some(test) => {
                    let test = self.lower_expr(test)?;
                    let (test, _, test_stmts) = self.operand_of(test);
                    stmts.extend(test_stmts);
                    cases.push(Some(test));
                }
                None => cases.push(None),
            }
        }
        self.switches.push(SwitchInfo {
            discriminant,
            cases,
        });
        Ok(stmts)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, lower_main};
    use crate::ir::Type;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_if_on_plain_value_tests_nonzero() {
        let body = lower_main("if (flag) { y = 1; } else { y = 2; }");
        assert_eq!(lines(&body), vec!["if flag != 0", "y = 1", "y = 2"]);
    }

    #[test]
    fn test_while_header() {
        let body = lower_main("let i = 0;\nwhile (i < 3) { i++; }");
        assert_eq!(
            lines(&body),
            vec!["i = 0", "dummy loop-init#0", "if i < 3", "i = i + 1"]
        );
    }

    #[test]
    fn test_do_while_header_follows_body() {
        let body = lower_main("do { k--; } while (k > 0);");
        assert_eq!(lines(&body), vec!["k = k - 1", "dummy loop-init#0", "if k > 0"]);
    }

    #[test]
    fn test_for_update_after_body() {
        let body = lower_main("let s = 0;\nfor (let i = 0; i < n; i++) { s += i; }");
        assert_eq!(
            lines(&body),
            vec![
                "s = 0",
                "i = 0",
                "dummy loop-init#0",
                "if i < n",
                "s = s + i",
                "i = i + 1",
            ]
        );
    }

    #[test]
    fn test_for_of_desugaring() {
        let body = lower_main("for (const v of xs) { log(v); }");
        assert_eq!(
            lines(&body),
            vec![
                "%0 = instanceinvoke xs.<%builtin: Iterable.iterator()>()",
                "dummy loop-init#0",
                "%1 = instanceinvoke %0.<%builtin: Iterator.next()>()",
                "%2 = %1.done",
                "if %2 != true",
                "%3 = %1.value",
                "%4 = <unknown>%3",
                "v = %4",
                "staticinvoke <test.ts: %dflt.log()>(v)",
            ]
        );
    }

    #[test]
    fn test_for_in_binds_strings() {
        let body = lower_main("for (const k in obj) {}");
        let lines = lines(&body);
        assert_eq!(lines[6], "%4 = <string>%3");
        assert_eq!(lines[7], "k = %4");
        let k = body.local_named("k").unwrap();
        assert_eq!(body.locals.ty(k.id), Type::String);
    }

    #[test]
    fn test_nested_ternary_markers() {
        let body = lower_main("let z = a ? (b ? 1 : 2) : 3;");
        assert_eq!(
            lines(&body),
            vec![
                "if a != 0",
                "dummy ternary-true#0",
                "if b != 0",
                "dummy ternary-true#1",
                "%1 = 1",
                "dummy ternary-false#1",
                "%1 = 2",
                "dummy ternary-end#1",
                "%0 = %1",
                "dummy ternary-false#0",
                "%0 = 3",
                "dummy ternary-end#0",
                "z = %0",
            ]
        );
        assert!(body.validate().is_ok());
        let z = body.local_named("z").unwrap();
        assert_eq!(body.locals.ty(z.id), Type::Number);
    }

    #[test]
    fn test_switch_records_cases() {
        let body = lower_main("switch (x) { case 1: f(); break; default: g(); }");
        assert_eq!(
            lines(&body),
            vec![
                "staticinvoke <test.ts: %dflt.f()>()",
                "staticinvoke <test.ts: %dflt.g()>()",
            ]
        );
        assert_eq!(body.switches.len(), 1);
        assert_eq!(body.switches[0].discriminant.to_string(), "x");
        assert_eq!(body.switches[0].cases.len(), 2);
        assert!(body.switches[0].cases[1].is_none());
    }
}
