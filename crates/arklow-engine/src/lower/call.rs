//! Call Lowering
//!
//! Calls become static, instance or pointer invokes depending on what the
//! callee resolves to; `new` becomes an allocation followed by a constructor
//! invoke.

use super::literal::ArrayItem;
use super::{Lowered, Lowerer};
use crate::error::LowerError;
use crate::ir::signature::DEFAULT_CLASS;
use crate::ir::{
    ClassSignature, ClassType, Expr, FileSignature, InvokeExpr, Local, MethodSignature,
    MethodSubSignature, Operand, Position, Stmt, StmtKind, Type, Value,
};
use crate::parser::ast::{self, Argument, Expression};
use tracing::debug;

/// Lowered call arguments.
pub(crate) struct Arguments {
    pub operands: Vec<Operand>,
    pub positions: Vec<Position>,
    pub stmts: Vec<Stmt>,
}

impl<'a> Lowerer<'a> {
    /// Lower a call expression
    pub(crate) fn lower_call(&mut self, call: &ast::CallExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&call.span);
        match call.callee.unparenthesized() {
            Expression::Super(_) => self.lower_super_call(&call.arguments, position),
            Expression::Member(member) => self.lower_method_call(member, &call.arguments, position),
            Expression::Identifier(ident) => {
                self.lower_function_call(ident, &call.arguments, position)
            }
            callee => {
                let callee = self.lower_expr(callee)?;
                let (ptr, ptr_pos, mut stmts) = self.local_of(callee);
                let args = self.lower_args(&call.arguments)?;
                stmts.extend(args.stmts);
                let method = self.pointer_target(&ptr, "%ptr");
                let invoke = InvokeExpr::new_ptr(ptr, method, args.operands);
                Ok(invoke_value(invoke, position, Some(ptr_pos), args.positions, stmts))
            }
        }
    }

    /// Lower arguments left to right; spread arguments are passed as is.
    pub(crate) fn lower_args(&mut self, arguments: &[Argument]) -> Result<Arguments, LowerError> {
        let mut lowered = Arguments {
            operands: Vec::with_capacity(arguments.len()),
            positions: Vec::with_capacity(arguments.len()),
            stmts: Vec::new(),
        };
        for argument in arguments {
            if let Argument::Spread(_) = argument {
                debug!("spread argument passed as a single operand");
            }
            let value = self.lower_expr(argument.expression())?;
            let (operand, operand_pos, stmts) = self.operand_of(value);
            lowered.stmts.extend(stmts);
            lowered.operands.push(operand);
            lowered.positions.push(operand_pos);
        }
        Ok(lowered)
    }

    /// `super(...)` runs the parent constructor on `this`.
    fn lower_super_call(
        &mut self,
        arguments: &[Argument],
        position: Position,
    ) -> Result<Lowered, LowerError> {
        let this = self.this_local();
        let args = self.lower_args(arguments)?;
        let parent = self
            .ctx
            .super_class
            .clone()
            .unwrap_or_else(ClassSignature::unknown);
        let method = self.resolver.constructor(&parent);
        let invoke = InvokeExpr::new_instance(this, method, args.operands);
        Ok(invoke_value(invoke, position, Some(position), args.positions, args.stmts))
    }

    /// `object.name(...)`
    fn lower_method_call(
        &mut self,
        member: &ast::MemberExpression,
        arguments: &[Argument],
        position: Position,
    ) -> Result<Lowered, LowerError> {
        let name = self.name(member.property.name);

        if let Expression::Super(_) = member.object.unparenthesized() {
            let this = self.this_local();
            let args = self.lower_args(arguments)?;
            let parent = self
                .ctx
                .super_class
                .clone()
                .unwrap_or_else(ClassSignature::unknown);
            let invoke =
                InvokeExpr::new_instance(this, MethodSignature::unresolved(parent, name), args.operands);
            return Ok(invoke_value(invoke, position, Some(position), args.positions, args.stmts));
        }

        if let Some(class) = self.static_base(&member.object) {
            let args = self.lower_args(arguments)?;
            let sub = MethodSubSignature::new(name, Vec::new(), Type::Unknown).with_static(true);
            let method = MethodSignature::new(class, sub);
            let invoke = InvokeExpr::new_static(method, args.operands);
            return Ok(invoke_value(invoke, position, None, args.positions, args.stmts));
        }

        let object = self.lower_expr(&member.object)?;
        let (base, base_pos, mut stmts) = self.local_of(object);
        let args = self.lower_args(arguments)?;
        stmts.extend(args.stmts);
        let class = match self.symbols.locals().ty(base.id) {
            Type::Class(class) => class.signature,
            _ => ClassSignature::unknown(),
        };
        let invoke =
            InvokeExpr::new_instance(base, MethodSignature::unresolved(class, name), args.operands);
        Ok(invoke_value(invoke, position, Some(base_pos), args.positions, stmts))
    }

    /// `name(...)`
    fn lower_function_call(
        &mut self,
        ident: &ast::Identifier,
        arguments: &[Argument],
        position: Position,
    ) -> Result<Lowered, LowerError> {
        let name = self.name(ident.name);
        let callee_pos = self.position(&ident.span);

        if let Some(local) = self.symbols.lookup(name).cloned() {
            let args = self.lower_args(arguments)?;
            let method = self.pointer_target(&local, name);
            let invoke = InvokeExpr::new_ptr(local, method, args.operands);
            return Ok(invoke_value(invoke, position, Some(callee_pos), args.positions, args.stmts));
        }

        if self.ctx.captures.iter().any(|captured| captured == name) {
            let captured = Lowered::new(self.resolve_name(name), vec![callee_pos]);
            let (ptr, ptr_pos, mut stmts) = self.local_of(captured);
            let args = self.lower_args(arguments)?;
            stmts.extend(args.stmts);
            let method = MethodSignature::unresolved(ClassSignature::unknown(), name);
            let invoke = InvokeExpr::new_ptr(ptr, method, args.operands);
            return Ok(invoke_value(invoke, position, Some(ptr_pos), args.positions, stmts));
        }

        let method = match self.ctx.scope.functions.get(name) {
            Some(signature) => signature.clone(),
            None => MethodSignature::unresolved(
                ClassSignature::new(self.ctx.scope.file.clone(), DEFAULT_CLASS),
                name,
            ),
        };
        let args = self.lower_args(arguments)?;
        let invoke = InvokeExpr::new_static(method, args.operands);
        Ok(invoke_value(invoke, position, None, args.positions, args.stmts))
    }

    /// Signature behind a function-typed local.
    fn pointer_target(&self, ptr: &Local, name: &str) -> MethodSignature {
        match self.symbols.locals().ty(ptr.id) {
            Type::Function(signature) => *signature,
            _ => MethodSignature::unresolved(ClassSignature::unknown(), name),
        }
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Lower `new Callee(...)`
    pub(crate) fn lower_new(&mut self, new_expr: &ast::NewExpression) -> Result<Lowered, LowerError> {
        let position = self.position(&new_expr.span);
        let name = self.dotted_name(&new_expr.callee);
        if name.as_deref() == Some("Array") && self.symbols.lookup("Array").is_none() {
            return self.lower_new_array(new_expr, position);
        }

        let class = match &name {
            Some(name) => self
                .class_named(name)
                .unwrap_or_else(|| ClassSignature::new(FileSignature::unknown(), name.clone())),
            None => {
                debug!("computed constructor at {} is not resolved", position);
                ClassSignature::unknown()
            }
        };
        let generics: Vec<Type> = {
            let types = self.type_scope();
            new_expr.type_args.iter().map(|arg| types.resolve(arg)).collect()
        };

        let args = self.lower_args(&new_expr.arguments)?;
        let mut stmts = args.stmts;
        let (object, object_pos, new_stmts) = self.temp_of(Lowered::new(
            Value::expr(Expr::New {
                class: ClassType::new(class.clone()).with_generics(generics),
            }),
            vec![position],
        ));
        stmts.extend(new_stmts);

        let invoke =
            InvokeExpr::new_instance(object.clone(), self.resolver.constructor(&class), args.operands);
        let mut positions = vec![position, object_pos];
        positions.extend(args.positions);
        let stmt = self.stmt(StmtKind::Invoke(invoke), positions);
        stmts.push(stmt);
        Ok(Lowered::with_stmts(Value::Local(object), vec![object_pos], stmts))
    }

    /// `new Array(n)` allocates; `new Array(a, b)` builds a literal.
    fn lower_new_array(
        &mut self,
        new_expr: &ast::NewExpression,
        position: Position,
    ) -> Result<Lowered, LowerError> {
        let element_ty = new_expr
            .type_args
            .first()
            .map(|arg| self.type_scope().resolve(arg));
        let args = self.lower_args(&new_expr.arguments)?;

        if let [size] = args.operands.as_slice() {
            if size.ty(self.symbols.locals()) == Type::Number {
                let size_pos = args.positions.first().copied().unwrap_or(position);
                return Ok(Lowered::with_stmts(
                    Value::expr(Expr::NewArray {
                        base_ty: element_ty.unwrap_or(Type::Any),
                        size: size.clone(),
                    }),
                    vec![position, size_pos],
                    args.stmts,
                ));
            }
        }

        let base_ty = element_ty.unwrap_or_else(|| {
            let types: Vec<Type> = args
                .operands
                .iter()
                .map(|operand| operand.ty(self.symbols.locals()))
                .collect();
            Type::least_common(&types)
        });
        let len = args.operands.len();
        let items = args
            .operands
            .into_iter()
            .zip(args.positions)
            .enumerate()
            .map(|(index, (operand, position))| ArrayItem {
                index,
                operand,
                position,
            })
            .collect();
        let mut array = self.build_array(base_ty, len, items, position);
        let mut stmts = args.stmts;
        stmts.append(&mut array.stmts);
        array.stmts = stmts;
        Ok(array)
    }
}

/// An unmaterialized invoke value with its operand positions.
fn invoke_value(
    invoke: InvokeExpr,
    position: Position,
    base_pos: Option<Position>,
    arg_positions: Vec<Position>,
    stmts: Vec<Stmt>,
) -> Lowered {
    let mut positions = vec![position];
    positions.extend(base_pos);
    positions.extend(arg_positions);
    Lowered::with_stmts(Value::expr(Expr::Invoke(invoke)), positions, stmts)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, lower_main};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_method_call_arguments_first() {
        let body = lower_main("obj.m(1, g());");
        assert_eq!(
            lines(&body),
            vec![
                "%0 = staticinvoke <test.ts: %dflt.g()>()",
                "instanceinvoke obj.<%unk: %unk.m()>(1, %0)",
            ]
        );
    }

    #[test]
    fn test_prototype_root_members_are_static() {
        let body = lower_main("Object.keys(o);");
        assert_eq!(lines(&body), vec!["staticinvoke <%builtin: Object.keys()>(o)"]);
    }

    #[test]
    fn test_file_function_call() {
        let body = lower_main("function sq(n: number): number { return n * n; }\nsq(2);");
        assert_eq!(lines(&body), vec!["staticinvoke <test.ts: %dflt.sq(number)>(2)"]);
    }

    #[test]
    fn test_new_allocates_then_constructs() {
        let body = lower_main("class A { constructor(v: number) {} }\nlet a = new A(1);");
        assert_eq!(
            lines(&body),
            vec![
                "%0 = new A",
                "instanceinvoke %0.<test.ts: A.constructor()>(1)",
                "a = %0",
            ]
        );
    }

    #[test]
    fn test_new_array_with_size() {
        let body = lower_main("let arr = new Array<number>(5);");
        assert_eq!(lines(&body), vec!["arr = newarray (number)[5]"]);
    }
}
