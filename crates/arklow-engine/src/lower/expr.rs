//! Expression Lowering
//!
//! Converts AST expressions to IR values plus the statements that must run
//! before the value is used.

use super::{Lowered, Lowerer};
use crate::error::LowerError;
use crate::ir::{
    BinaryOp, ClassSignature, ConditionExpr, Constant, Expr, FieldSignature, IndexValue, Local,
    Operand, Position, Reference, RelOp, Stmt, StmtKind, Type, UnaryOp, Value,
};
use crate::model::sink::FunctionSource;
use crate::parser::ast::{self, Expression};
use tracing::debug;

impl<'a> Lowerer<'a> {
    /// Lower an expression
    pub fn lower_expr(&mut self, expr: &Expression) -> Result<Lowered, LowerError> {
        self.enter(expr.span())?;
        let result = self.lower_expr_inner(expr);
        self.leave();
        result
    }

    fn lower_expr_inner(&mut self, expr: &Expression) -> Result<Lowered, LowerError> {
        let position = self.position(expr.span());
        match expr {
            Expression::IntLiteral(lit) => Ok(constant(Constant::int(lit.value), position)),
            Expression::FloatLiteral(lit) => Ok(constant(Constant::float(lit.value), position)),
            Expression::BigIntLiteral(lit) => Ok(constant(
                Constant::BigInt(self.name(lit.digits).to_string()),
                position,
            )),
            Expression::StringLiteral(lit) => {
                Ok(constant(Constant::string(self.name(lit.value)), position))
            }
            Expression::RegexLiteral(lit) => Ok(constant(
                Constant::Regex(self.name(lit.pattern).to_string()),
                position,
            )),
            Expression::BooleanLiteral(lit) => Ok(constant(Constant::Boolean(lit.value), position)),
            Expression::NullLiteral(_) => Ok(constant(Constant::Null, position)),
            Expression::TemplateLiteral(template) => self.lower_template(template),
            Expression::Identifier(ident) => Ok(self.lower_identifier(ident)),
            Expression::This(_) | Expression::Super(_) => {
                let this = self.this_local();
                Ok(Lowered::new(Value::Local(this), vec![position]))
            }
            Expression::Array(array) => self.lower_array(array),
            Expression::Object(object) => self.lower_object(object),
            Expression::Function(func) => Ok(self.lower_function_value(
                FunctionSource::Function((*func.function).clone()),
                position,
            )),
            Expression::Arrow(arrow) => {
                Ok(self.lower_function_value(FunctionSource::Arrow(arrow.clone()), position))
            }
            Expression::Unary(unary) => self.lower_unary(unary),
            Expression::Update(update) => self.lower_update(update),
            Expression::Binary(binary) => self.lower_binary(binary),
            Expression::Logical(logical) => self.lower_logical(logical),
            Expression::Assignment(assign) => self.lower_assignment(assign),
            Expression::Conditional(cond) => self.lower_conditional(cond),
            Expression::Sequence(seq) => self.lower_sequence(seq),
            Expression::Call(call) => self.lower_call(call),
            Expression::Member(member) => self.lower_member(member),
            Expression::Index(index) => self.lower_index(index),
            Expression::New(new_expr) => self.lower_new(new_expr),
            Expression::Await(await_expr) => {
                let operand = self.lower_expr(&await_expr.argument)?;
                Ok(self.wrap_operand(operand, position, |operand| Expr::Await { operand }))
            }
            Expression::Yield(yield_expr) => {
                let operand = match &yield_expr.argument {
                    Some(argument) => self.lower_expr(argument)?,
                    None => constant(Constant::Undefined, position),
                };
                Ok(self.wrap_operand(operand, position, |operand| Expr::Yield { operand }))
            }
            Expression::Typeof(typeof_expr) => {
                let operand = self.lower_expr(&typeof_expr.argument)?;
                Ok(self.wrap_operand(operand, position, |operand| Expr::TypeOf { operand }))
            }
            Expression::InstanceOf(instanceof) => self.lower_instanceof(instanceof),
            Expression::TypeCast(cast) => {
                let ty = self.resolve_type(Some(&cast.target_type));
                let operand = self.lower_expr(&cast.object)?;
                Ok(self.wrap_operand(operand, position, |operand| Expr::Cast { operand, ty }))
            }
            Expression::NonNull(non_null) => self.lower_expr(&non_null.expression),
            Expression::Parenthesized(paren) => self.lower_expr(&paren.expression),
        }
    }

    /// Build a one-operand expression around a lowered value.
    fn wrap_operand(
        &mut self,
        operand: Lowered,
        position: Position,
        build: impl FnOnce(Operand) -> Expr,
    ) -> Lowered {
        let (operand, operand_pos, stmts) = self.operand_of(operand);
        Lowered::with_stmts(
            Value::expr(build(operand)),
            vec![position, operand_pos],
            stmts,
        )
    }

    pub(crate) fn this_local(&mut self) -> Local {
        let ty = self.ctx.this_type();
        self.symbols.declare_this(ty)
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Lower an identifier read
    pub(crate) fn lower_identifier(&mut self, ident: &ast::Identifier) -> Lowered {
        let position = self.position(&ident.span);
        let name = self.name(ident.name);
        if name == "undefined" && self.symbols.lookup(name).is_none() {
            return constant(Constant::Undefined, position);
        }
        Lowered::new(self.resolve_name(name), vec![position])
    }

    /// Locals first, then names captured from enclosing methods, then globals.
    pub(crate) fn resolve_name(&mut self, name: &str) -> Value {
        if let Some(local) = self.symbols.lookup(name) {
            return Value::Local(local.clone());
        }
        if self.ctx.captures.iter().any(|captured| captured == name) {
            let closures = self
                .symbols
                .closures(Type::unclear(super::symbols::CLOSURES_NAME));
            return Value::Ref(Reference::ClosureField {
                base: closures,
                name: name.to_string(),
                ty: Type::Unknown,
            });
        }
        Value::Local(self.symbols.global(name))
    }

    /// Class addressed by a bare name used as a member base.
    pub(crate) fn static_base(&self, object: &Expression) -> Option<ClassSignature> {
        let Expression::Identifier(ident) = object.unparenthesized() else {
            return None;
        };
        let name = self.name(ident.name);
        if self.symbols.lookup(name).is_some() {
            return None;
        }
        if name == self.resolver.prototype_root() {
            return Some(self.resolver.builtin_class(name));
        }
        self.class_named(name)
    }

    /// Dotted source name of an identifier or member chain.
    pub(crate) fn dotted_name(&self, expr: &Expression) -> Option<String> {
        match expr.unparenthesized() {
            Expression::Identifier(ident) => Some(self.name(ident.name).to_string()),
            Expression::Member(member) => {
                let object = self.dotted_name(&member.object)?;
                Some(format!("{}.{}", object, self.name(member.property.name)))
            }
            _ => None,
        }
    }

    // ========================================================================
    // Member access
    // ========================================================================

    /// Field of `base`, owned by the base's class when it is known.
    pub(crate) fn instance_field(&self, base: &Local, name: impl Into<String>) -> FieldSignature {
        let class = match self.symbols.locals().ty(base.id) {
            Type::Class(class) => class.signature,
            _ => ClassSignature::unknown(),
        };
        FieldSignature::new(class, name, Type::Unknown)
    }

    /// Lower `object.property`
    fn lower_member(&mut self, member: &ast::MemberExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&member.span);
        let property = self.name(member.property.name);

        if let Some(class) = self.static_base(&member.object) {
            let field = FieldSignature::new(class, property, Type::Unknown).with_static(true);
            return Ok(Lowered::new(
                Value::Ref(Reference::StaticField { field }),
                vec![position],
            ));
        }

        let object = self.lower_expr(&member.object)?;
        let (base, base_pos, stmts) = self.local_of(object);
        let field = self.instance_field(&base, property);
        Ok(Lowered::with_stmts(
            Value::Ref(Reference::InstanceField { base, field }),
            vec![position, base_pos],
            stmts,
        ))
    }

    /// Lower `object[index]`
    fn lower_index(&mut self, index: &ast::IndexExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&index.span);
        let object = self.lower_expr(&index.object)?;
        let (base, base_pos, mut stmts) = self.local_of(object);

        // o['name'] is a field read
        if let Expression::StringLiteral(lit) = index.index.unparenthesized() {
            let field = self.instance_field(&base, self.name(lit.value));
            return Ok(Lowered::with_stmts(
                Value::Ref(Reference::InstanceField { base, field }),
                vec![position, base_pos],
                stmts,
            ));
        }

        let key = self.lower_expr(&index.index)?;
        let key_pos = key.position();
        let (index_value, key_pos, key_stmts) = match key.value {
            Value::Constant(constant) => (IndexValue::Constant(constant), key_pos, key.stmts),
            value => {
                let (local, pos, key_stmts) =
                    self.local_of(Lowered::with_stmts(value, key.positions, key.stmts));
                (IndexValue::Local(local), pos, key_stmts)
            }
        };
        stmts.extend(key_stmts);
        Ok(Lowered::with_stmts(
            Value::Ref(Reference::ArrayElement {
                base,
                index: index_value,
            }),
            vec![position, base_pos, key_pos],
            stmts,
        ))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Lower both operands left to right.
    fn lower_operands(
        &mut self,
        left: &Expression,
        right: &Expression,
    ) -> Result<(Operand, Position, Operand, Position, Vec<Stmt>), LowerError> {
        let left = self.lower_expr(left)?;
        let (left, left_pos, mut stmts) = self.operand_of(left);
        let right = self.lower_expr(right)?;
        let (right, right_pos, right_stmts) = self.operand_of(right);
        stmts.extend(right_stmts);
        Ok((left, left_pos, right, right_pos, stmts))
    }

    /// Lower a binary expression
    fn lower_binary(&mut self, binary: &ast::BinaryExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&binary.span);
        let (left, left_pos, right, right_pos, stmts) =
            self.lower_operands(&binary.left, &binary.right)?;

        let expr = match operator(binary.operator) {
            Operator::Relational(op) => Expr::Condition(ConditionExpr { op, left, right }),
            Operator::Binary(op) => Expr::Binary { op, left, right },
        };
        Ok(Lowered::with_stmts(
            Value::expr(expr),
            vec![position, left_pos, right_pos],
            stmts,
        ))
    }

    /// Lower `&&`, `||` and `??`; both sides are evaluated.
    fn lower_logical(&mut self, logical: &ast::LogicalExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&logical.span);
        let (left, left_pos, right, right_pos, stmts) =
            self.lower_operands(&logical.left, &logical.right)?;
        let op = match logical.operator {
            ast::LogicalOperator::And => BinaryOp::And,
            ast::LogicalOperator::Or => BinaryOp::Or,
            ast::LogicalOperator::NullishCoalescing => BinaryOp::NullishCoalescing,
        };
        Ok(Lowered::with_stmts(
            Value::expr(Expr::Binary { op, left, right }),
            vec![position, left_pos, right_pos],
            stmts,
        ))
    }

    /// Lower a unary expression
    fn lower_unary(&mut self, unary: &ast::UnaryExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&unary.span);
        let op = match unary.operator {
            ast::UnaryOperator::Minus => {
                // -1 is a constant
                match unary.operand.unparenthesized() {
                    Expression::IntLiteral(lit) => {
                        let value = match lit.value.checked_neg() {
                            Some(negated) => Constant::int(negated),
                            None => Constant::float(-(lit.value as f64)),
                        };
                        return Ok(constant(value, position));
                    }
                    Expression::FloatLiteral(lit) => {
                        return Ok(constant(Constant::float(-lit.value), position))
                    }
                    _ => UnaryOp::Neg,
                }
            }
            ast::UnaryOperator::Plus => UnaryOp::Plus,
            ast::UnaryOperator::Not => UnaryOp::Not,
            ast::UnaryOperator::BitwiseNot => UnaryOp::BitNot,
            ast::UnaryOperator::Void => {
                let operand = self.lower_expr(&unary.operand)?;
                let stmts = self.discard(operand);
                return Ok(Lowered::with_stmts(
                    Value::Constant(Constant::Undefined),
                    vec![position],
                    stmts,
                ));
            }
            ast::UnaryOperator::Delete => return self.lower_delete(&unary.operand, position),
        };
        let operand = self.lower_expr(&unary.operand)?;
        Ok(self.wrap_operand(operand, position, |operand| Expr::Unary { op, operand }))
    }

    fn lower_delete(
        &mut self,
        target: &Expression,
        position: Position,
    ) -> Result<Lowered, LowerError> {
        let target = self.lower_expr(target)?;
        let target_pos = target.position();
        match target.value {
            Value::Ref(reference) => Ok(Lowered::with_stmts(
                Value::expr(Expr::Delete { target: reference }),
                vec![position, target_pos],
                target.stmts,
            )),
            _ => {
                debug!("delete of a non-reference at {}", position);
                Ok(Lowered::with_stmts(
                    Value::Constant(Constant::Boolean(true)),
                    vec![position],
                    target.stmts,
                ))
            }
        }
    }

    /// Lower `object instanceof Class`; the test is materialized at once.
    fn lower_instanceof(
        &mut self,
        instanceof: &ast::InstanceOfExpression,
    ) -> Result<Lowered, LowerError> {
        let position = self.position(&instanceof.span);
        let check_ty = match self.dotted_name(&instanceof.class) {
            Some(name) => match self.class_named(&name) {
                Some(class) => Type::class(class),
                None => Type::unclear(name),
            },
            None => Type::Unknown,
        };
        let object = self.lower_expr(&instanceof.object)?;
        let (operand, operand_pos, stmts) = self.operand_of(object);
        let lowered = Lowered::with_stmts(
            Value::expr(Expr::InstanceOf { operand, check_ty }),
            vec![position, operand_pos],
            stmts,
        );
        Ok(self.materialize(lowered))
    }

    /// Lower `a, b, c`; only the last value survives.
    fn lower_sequence(&mut self, seq: &ast::SequenceExpression) -> Result<Lowered, LowerError> {
        let Some((last, init)) = seq.expressions.split_last() else {
            return Ok(constant(Constant::Undefined, self.position(&seq.span)));
        };
        let mut stmts = Vec::new();
        for expr in init {
            let lowered = self.lower_expr(expr)?;
            stmts.extend(self.discard(lowered));
        }
        let mut last = self.lower_expr(last)?;
        stmts.append(&mut last.stmts);
        last.stmts = stmts;
        Ok(last)
    }

    /// Statements of a value computed only for its effect.
    ///
    /// A call is kept as an `Invoke` statement; any other value is dropped.
    pub(crate) fn discard(&mut self, lowered: Lowered) -> Vec<Stmt> {
        let Lowered {
            value,
            positions,
            mut stmts,
        } = lowered;
        if let Value::Expr(expr) = value {
            if let Expr::Invoke(invoke) = *expr {
                let stmt = self.stmt(StmtKind::Invoke(invoke), positions);
                stmts.push(stmt);
            }
        }
        stmts
    }
}

pub(crate) fn constant(value: Constant, position: Position) -> Lowered {
    Lowered::new(Value::Constant(value), vec![position])
}

enum Operator {
    Relational(RelOp),
    Binary(BinaryOp),
}

fn operator(op: ast::BinaryOperator) -> Operator {
    use ast::BinaryOperator as B;
    let binary = match op {
        B::Equal => return Operator::Relational(RelOp::Eq),
        B::NotEqual => return Operator::Relational(RelOp::Ne),
        B::StrictEqual => return Operator::Relational(RelOp::StrictEq),
        B::StrictNotEqual => return Operator::Relational(RelOp::StrictNe),
        B::LessThan => return Operator::Relational(RelOp::Lt),
        B::LessEqual => return Operator::Relational(RelOp::Le),
        B::GreaterThan => return Operator::Relational(RelOp::Gt),
        B::GreaterEqual => return Operator::Relational(RelOp::Ge),
        B::Add => BinaryOp::Add,
        B::Subtract => BinaryOp::Sub,
        B::Multiply => BinaryOp::Mul,
        B::Divide => BinaryOp::Div,
        B::Modulo => BinaryOp::Rem,
        B::Exponent => BinaryOp::Exp,
        B::BitwiseAnd => BinaryOp::BitAnd,
        B::BitwiseOr => BinaryOp::BitOr,
        B::BitwiseXor => BinaryOp::BitXor,
        B::LeftShift => BinaryOp::Shl,
        B::RightShift => BinaryOp::Shr,
        B::UnsignedRightShift => BinaryOp::UShr,
        B::In => BinaryOp::In,
    };
    Operator::Binary(binary)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, lower_main, model};
    use crate::ir::{Constant, Expr, StmtKind, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_member_chain_is_split() {
        let body = lower_main("let y = a.b.c;");
        assert_eq!(lines(&body), vec!["%0 = a.b", "y = %0.c"]);
        let globals: Vec<&str> = body.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(globals, vec!["a"]);
    }

    #[test]
    fn test_nested_binary_uses_temporaries() {
        let body = lower_main("let r = a * b + c;");
        assert_eq!(lines(&body), vec!["%0 = a * b", "r = %0 + c"]);
    }

    #[test]
    fn test_negative_literal_is_constant() {
        let body = lower_main("let n = -1;");
        assert_eq!(lines(&body), vec!["n = -1"]);
    }

    #[test]
    fn test_instanceof_is_materialized() {
        let body = lower_main("let t = o instanceof Foo;");
        assert_eq!(lines(&body), vec!["%0 = o instanceof Foo", "t = %0"]);
    }

    #[test]
    fn test_sequence_keeps_last_value() {
        let body = lower_main("let s = (f(), 2);");
        assert_eq!(
            lines(&body),
            vec!["staticinvoke <test.ts: %dflt.f()>()", "s = 2"]
        );
    }

    #[test]
    fn test_same_literal_shares_number() {
        let body = lower_main("let p = 7;\nlet q = 7;");
        let numbers: Vec<_> = body
            .stmts
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::Assign {
                    right: Value::Constant(Constant::Number(n)),
                    ..
                } => Some(n.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(numbers.len(), 2);
        assert!(numbers[0].is_same(&numbers[1]));
    }

    #[test]
    fn test_undefined_is_a_constant() {
        let body = lower_main("let u = undefined;");
        assert_eq!(lines(&body), vec!["u = undefined"]);
        assert!(body.globals.is_empty());
    }

    #[test]
    fn test_void_discards_operand() {
        let body = lower_main("let v = void f();");
        assert_eq!(
            lines(&body),
            vec!["staticinvoke <test.ts: %dflt.f()>()", "v = undefined"]
        );
    }

    #[test]
    fn test_delete_wraps_reference() {
        let body = lower_main("let d = delete o.p;");
        assert_eq!(lines(&body), vec!["d = delete o.p"]);
        let deleted = body.stmts.iter().any(|stmt| {
            matches!(&stmt.kind, StmtKind::Assign { right: Value::Expr(expr), .. }
                if matches!(expr.as_ref(), Expr::Delete { .. }))
        });
        assert!(deleted);
    }

    #[test]
    fn test_await_operand_is_materialized() {
        let model = model("async function k() { let r = await g(); }");
        let body = model.function_body("k").unwrap();
        assert_eq!(
            lines(body),
            vec!["%0 = staticinvoke <test.ts: %dflt.g()>()", "r = await %0"]
        );
    }

    #[test]
    fn test_yield_and_typeof() {
        let model = model("function* gen() { let y = yield 1; }");
        assert_eq!(lines(model.function_body("gen").unwrap()), vec!["y = yield 1"]);

        let body = lower_main("let t = typeof a;");
        assert_eq!(lines(&body), vec!["t = typeof a"]);
    }
}
