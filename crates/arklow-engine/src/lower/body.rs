//! Method Body Lowering
//!
//! Walks a whole method: the `this`/parameter prologue, then every
//! statement in source order with nested bodies flattened after their
//! headers.

use super::assign::Declaration;
use super::Lowerer;
use crate::error::LowerError;
use crate::ir::{
    FieldSignature, MethodBody, Place, Position, Reference, Stmt, StmtKind, Type, Value,
};
use crate::parser::ast::{Expression, Parameter, Pattern, Statement};
use crate::parser::Span;

/// A field initializer moved into `%instInit` or `%statInit`.
#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    pub value: Expression,
    pub span: Span,
}

/// What a method body is made of.
#[derive(Debug, Clone, Copy)]
pub enum BodyInput<'b> {
    /// A function, method or constructor body
    Block {
        params: &'b [Parameter],
        statements: &'b [Statement],
        /// Constructor parameter properties are stored on `this`
        param_properties: bool,
    },
    /// An arrow function with an expression body
    Expression {
        params: &'b [Parameter],
        expression: &'b Expression,
    },
    /// Field initializers of a class
    Initializers(&'b [FieldInit]),
}

impl<'b> BodyInput<'b> {
    fn params(&self) -> &'b [Parameter] {
        match self {
            BodyInput::Block { params, .. } | BodyInput::Expression { params, .. } => params,
            BodyInput::Initializers(_) => &[],
        }
    }
}

impl<'a> Lowerer<'a> {
    /// Lower a complete method body, consuming the session.
    pub fn lower_body(mut self, input: BodyInput<'_>) -> Result<MethodBody, LowerError> {
        let mut stmts = self.lower_prologue(input.params(), input)?;
        let prologue_len = stmts.len();

        match input {
            BodyInput::Block { statements, .. } => {
                self.hoist(statements);
                for stmt in statements {
                    self.walk(stmt, &mut stmts)?;
                }
            }
            BodyInput::Expression { expression, .. } => {
                let value = self.lower_expr(expression)?;
                let (operand, operand_pos, mut group) = self.operand_of(value);
                self.returns_value = true;
                let ty = operand.ty(self.symbols.locals());
                self.infer_return(ty);
                group.push(self.stmt(StmtKind::Return(operand), vec![operand_pos]));
                self.tag(&mut group, expression.span());
                stmts.extend(group);
            }
            BodyInput::Initializers(inits) => {
                for init in inits {
                    stmts.extend(self.lower_field_init(init)?);
                }
            }
        }

        if let Some(closures) = self.symbols.closures_used().cloned() {
            // %closures arrives as parameter 0
            for stmt in &mut stmts[..prologue_len] {
                if let StmtKind::Assign {
                    right: Value::Ref(Reference::Parameter { index, .. }),
                    ..
                } = &mut stmt.kind
                {
                    *index += 1;
                }
            }
            let ty = self.symbols.locals().ty(closures.id);
            let load = self.assign_stmt(
                Place::Local(closures),
                &[Position::UNKNOWN],
                Value::Ref(Reference::Parameter { index: 0, ty }),
                &[Position::UNKNOWN],
            );
            stmts.insert(1, load);
        }

        if self.return_type.is_unknown() && !self.returns_value {
            self.return_type = self.void_return_type();
        }

        let Lowerer {
            symbols,
            switches,
            return_type,
            ..
        } = self;
        let (locals, globals, aliases) = symbols.into_parts();
        let mut body = MethodBody::new(locals, stmts);
        body.globals = globals;
        body.aliases = aliases;
        body.switches = switches;
        body.return_type = return_type;
        Ok(body)
    }

    /// `this := this: C`, then one read per parameter.
    fn lower_prologue(
        &mut self,
        params: &[Parameter],
        input: BodyInput<'_>,
    ) -> Result<Vec<Stmt>, LowerError> {
        let this = self.this_local();
        let this_ty = self.ctx.this_type();
        let mut stmts = vec![self.assign_stmt(
            Place::Local(this.clone()),
            &[Position::UNKNOWN],
            Value::Ref(Reference::This { ty: this_ty }),
            &[Position::UNKNOWN],
        )];

        let mut properties = Vec::new();
        for (index, param) in params.iter().enumerate() {
            let ty = self
                .ctx
                .signature
                .sub
                .params
                .get(index)
                .map(|p| p.ty.clone())
                .unwrap_or(Type::Unknown);
            let position = self.position(&param.span);
            let read = super::Lowered::new(
                Value::Ref(Reference::Parameter {
                    index,
                    ty: ty.clone(),
                }),
                vec![position],
            );
            if param.default_value.is_some() {
                tracing::debug!("parameter default at {} is not lowered", position);
            }
            match &param.pattern {
                Pattern::Identifier(ident) => {
                    let name = self.name(ident.name);
                    let local = self.symbols.declare(name, ty.clone());
                    stmts.extend(self.assign(Place::Local(local.clone()), vec![position], read).stmts);
                    if param.property.is_some() {
                        properties.push((name, local, ty, position));
                    }
                }
                pattern => {
                    let declaration = Declaration {
                        is_const: false,
                        declared: Type::Unknown,
                    };
                    stmts.extend(self.bind_pattern(pattern, read, Some(&declaration))?);
                }
            }
        }

        if let BodyInput::Block {
            param_properties: true,
            ..
        } = input
        {
            for (name, local, ty, position) in properties {
                let field = FieldSignature::new(self.ctx.class.clone(), name, ty);
                let store = self.assign_stmt(
                    Place::Ref(Reference::InstanceField {
                        base: this.clone(),
                        field,
                    }),
                    &[position, position],
                    Value::Local(local),
                    &[position],
                );
                stmts.push(store);
            }
        }
        Ok(stmts)
    }

    /// `this.f = v` or `C.f = v` for one field initializer.
    fn lower_field_init(&mut self, init: &FieldInit) -> Result<Vec<Stmt>, LowerError> {
        let position = self.position(&init.span);
        let value = self.lower_expr(&init.value)?;
        let field = FieldSignature::new(self.ctx.class.clone(), init.name.as_str(), init.ty.clone());
        let target = if init.is_static {
            Reference::StaticField {
                field: field.with_static(true),
            }
        } else {
            Reference::InstanceField {
                base: self.this_local(),
                field,
            }
        };
        let mut stmts = self.assign(Place::Ref(target), vec![position], value).stmts;
        self.tag(&mut stmts, &init.span);
        Ok(stmts)
    }

    /// Emit a statement's header, then its nested bodies in source order.
    fn walk(&mut self, stmt: &Statement, out: &mut Vec<Stmt>) -> Result<(), LowerError> {
        self.enter(stmt.span())?;
        let result = self.walk_inner(stmt, out);
        self.leave();
        result
    }

    fn walk_inner(&mut self, stmt: &Statement, out: &mut Vec<Stmt>) -> Result<(), LowerError> {
        match stmt {
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.walk(stmt, out)?;
                }
            }
            Statement::If(if_stmt) => {
                out.extend(self.lower_stmt(stmt)?);
                self.walk(&if_stmt.then_branch, out)?;
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.walk(else_branch, out)?;
                }
            }
            Statement::While(while_stmt) => {
                out.extend(self.lower_stmt(stmt)?);
                self.walk(&while_stmt.body, out)?;
            }
            Statement::ForOf(for_of) | Statement::ForIn(for_of) => {
                out.extend(self.lower_stmt(stmt)?);
                self.walk(&for_of.body, out)?;
            }
            Statement::DoWhile(do_while) => {
                self.walk(&do_while.body, out)?;
                out.extend(self.lower_stmt(stmt)?);
            }
            Statement::For(for_stmt) => {
                let mut parts = self.lower_for_parts(for_stmt)?;
                self.tag(&mut parts.head, &for_stmt.span);
                out.extend(parts.head);
                self.walk(&for_stmt.body, out)?;
                out.extend(parts.update);
            }
            Statement::Switch(switch) => {
                out.extend(self.lower_stmt(stmt)?);
                for case in &switch.cases {
                    for stmt in &case.consequent {
                        self.walk(stmt, out)?;
                    }
                }
            }
            Statement::Try(try_stmt) => {
                for stmt in &try_stmt.body.statements {
                    self.walk(stmt, out)?;
                }
                if let Some(catch) = &try_stmt.catch_clause {
                    let mut binding = self.lower_catch_binding(try_stmt)?;
                    self.tag(&mut binding, &catch.span);
                    out.extend(binding);
                    for stmt in &catch.body.statements {
                        self.walk(stmt, out)?;
                    }
                }
                if let Some(finally) = &try_stmt.finally_clause {
                    for stmt in &finally.statements {
                        self.walk(stmt, out)?;
                    }
                }
            }
            Statement::Labeled(labeled) => self.walk(&labeled.body, out)?,
            _ => out.extend(self.lower_stmt(stmt)?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, model};
    use crate::ir::signature::DEFAULT_CLASS;
    use crate::ir::Type;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parameters_are_read_in_prologue() {
        let model = model("function add(a: number, b: number): number { return a + b; }");
        let body = model.function_body("add").unwrap();
        assert_eq!(
            lines(body),
            vec![
                "a = parameter0: number",
                "b = parameter1: number",
                "%0 = a + b",
                "return %0",
            ]
        );
        assert_eq!(body.return_type, Type::Number);
    }

    #[test]
    fn test_captured_names_read_through_closures() {
        let model = model(
            "function outer() { let n = 1; const f = () => n; return f(); }",
        );
        let arrow = model.body(DEFAULT_CLASS, "%AM0$outer").unwrap();
        assert_eq!(
            lines(arrow),
            vec!["%closures = parameter0: %closures", "return %closures.n"]
        );

        let outer = model.function_body("outer").unwrap();
        let lines = lines(outer);
        assert_eq!(lines[0], "n = 1");
        assert_eq!(lines[2], "%0 = ptrinvoke f.<test.ts: %dflt.%AM0$outer()>()");
        assert_eq!(lines[3], "return %0");
    }

    #[test]
    fn test_return_type_defaults_to_void() {
        let model = model("function noop() {}\nasync function later() {}");
        assert_eq!(model.function_body("noop").unwrap().return_type, Type::Void);
        assert_eq!(
            model.function_body("later").unwrap().return_type,
            Type::promise(Type::Void)
        );
    }

    #[test]
    fn test_parameter_properties_are_stored() {
        let model = model("class P { constructor(private x: number) {} }");
        let body = model.body("P", "constructor").unwrap();
        assert_eq!(lines(body), vec!["x = parameter0: number", "this.x = x"]);
        assert_eq!(body.return_type, Type::Void);
    }

    #[test]
    fn test_field_initializers() {
        let model = model("class C { n: number = 1; static k = 2; m: string; }");
        let instance = model.body("C", "%instInit").unwrap();
        let statics = model.body("C", "%statInit").unwrap();
        assert_eq!(lines(instance), vec!["this.n = 1"]);
        assert_eq!(lines(statics), vec!["C.k = 2"]);
        assert_eq!(model.class("C").unwrap().fields.len(), 3);
    }
}
