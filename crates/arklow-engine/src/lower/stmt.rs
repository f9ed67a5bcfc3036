//! Statement Lowering
//!
//! Converts AST statements to IR statements. Compound statements produce
//! only their header here; [`Lowerer::lower_body`](super::Lowerer) walks the
//! nested bodies.

use super::assign::Declaration;
use super::expr::constant;
use super::Lowerer;
use crate::error::LowerError;
use crate::ir::{AliasType, AliasTypeExpr, Constant, Reference, Stmt, StmtKind, Type, Value};
use crate::model::sink::FunctionSource;
use crate::parser::ast::{self, Expression, ForInit, ForOfLeft, Pattern, Statement, VariableKind};

impl<'a> Lowerer<'a> {
    /// Lower a statement.
    ///
    /// The first emitted statement carries the statement's source text.
    pub fn lower_stmt(&mut self, stmt: &Statement) -> Result<Vec<Stmt>, LowerError> {
        self.enter(stmt.span())?;
        let result = self.lower_stmt_inner(stmt);
        self.leave();
        let mut stmts = result?;
        self.tag(&mut stmts, stmt.span());
        Ok(stmts)
    }

    fn lower_stmt_inner(&mut self, stmt: &Statement) -> Result<Vec<Stmt>, LowerError> {
        match stmt {
            Statement::VariableDecl(decl) => self.lower_var_decl(decl),
            Statement::FunctionDecl(func) => {
                self.hoist_function(func);
                Ok(Vec::new())
            }
            Statement::ClassDecl(class) => {
                self.declare_local_class(class);
                Ok(Vec::new())
            }
            Statement::TypeAliasDecl(alias) => self.lower_type_alias(alias),
            Statement::Expression(expr) => self.lower_effect(&expr.expression),
            Statement::If(if_stmt) => self.lower_if_header(&if_stmt.condition),
            Statement::While(while_stmt) => {
                self.lower_loop_header(&while_stmt.condition, &while_stmt.span)
            }
            Statement::DoWhile(do_while) => {
                self.lower_loop_header(&do_while.condition, &do_while.span)
            }
            Statement::For(for_stmt) => {
                let parts = self.lower_for_parts(for_stmt)?;
                let mut stmts = parts.head;
                stmts.extend(parts.update);
                Ok(stmts)
            }
            Statement::ForOf(for_of) => self.lower_for_of_header(for_of, false),
            Statement::ForIn(for_in) => self.lower_for_of_header(for_in, true),
            Statement::Switch(switch) => self.lower_switch_header(switch),
            Statement::Return(ret) => self.lower_return(ret),
            Statement::Throw(throw) => {
                let value = self.lower_expr(&throw.value)?;
                let (operand, operand_pos, mut stmts) = self.operand_of(value);
                stmts.push(self.stmt(StmtKind::Throw(operand), vec![operand_pos]));
                Ok(stmts)
            }
            Statement::Try(try_stmt) => self.lower_catch_binding(try_stmt),
            Statement::Block(block) => {
                let mut stmts = Vec::new();
                for stmt in &block.statements {
                    stmts.extend(self.lower_stmt(stmt)?);
                }
                Ok(stmts)
            }
            Statement::Labeled(labeled) => self.lower_stmt(&labeled.body),
            Statement::Import(_)
            | Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Empty(_) => Ok(Vec::new()),
        }
    }

    /// An expression evaluated for its effect.
    ///
    /// Calls become `Invoke` statements, assignments and other effects keep
    /// their own statements, and a pure value is still copied to a temporary.
    pub(crate) fn lower_effect(&mut self, expr: &Expression) -> Result<Vec<Stmt>, LowerError> {
        let lowered = self.lower_expr(expr)?;
        if lowered.value.as_invoke().is_some() {
            return Ok(self.discard(lowered));
        }
        if expr.has_side_effect() {
            return Ok(lowered.stmts);
        }
        Ok(self.materialize(lowered).stmts)
    }

    /// Lower `let`/`const`/`var` declarations
    pub(crate) fn lower_var_decl(&mut self, decl: &ast::VariableDecl) -> Result<Vec<Stmt>, LowerError> {
        let is_const = decl.kind == VariableKind::Const;
        let mut stmts = Vec::new();
        for declarator in &decl.declarations {
            let position = self.position(&declarator.span);
            let declared = self.resolve_type(declarator.type_annotation.as_ref());
            let rhs = match &declarator.initializer {
                Some(init) => self.lower_expr(init)?,
                None => constant(Constant::Undefined, position),
            };
            let declaration = Declaration { is_const, declared };
            let mut group = self.bind_pattern(&declarator.pattern, rhs, Some(&declaration))?;
            self.tag(&mut group, &declarator.span);
            stmts.extend(group);
        }
        Ok(stmts)
    }

    fn lower_return(&mut self, ret: &ast::ReturnStatement) -> Result<Vec<Stmt>, LowerError> {
        let Some(value) = &ret.value else {
            let position = self.position(&ret.span);
            if self.return_type.is_unknown() {
                self.return_type = self.void_return_type();
            }
            return Ok(vec![self.stmt(StmtKind::ReturnVoid, vec![position])]);
        };
        let value = self.lower_expr(value)?;
        let (operand, operand_pos, mut stmts) = self.operand_of(value);
        self.returns_value = true;
        let ty = operand.ty(self.symbols.locals());
        self.infer_return(ty);
        stmts.push(self.stmt(StmtKind::Return(operand), vec![operand_pos]));
        Ok(stmts)
    }

    /// `catch (e)` binds the caught exception.
    pub(crate) fn lower_catch_binding(
        &mut self,
        try_stmt: &ast::TryStatement,
    ) -> Result<Vec<Stmt>, LowerError> {
        let Some(catch) = &try_stmt.catch_clause else {
            return Ok(Vec::new());
        };
        let Some(param) = &catch.param else {
            return Ok(Vec::new());
        };
        let ty = self.resolve_type(catch.type_annotation.as_ref());
        let position = self.position(param.span());
        let exception = super::Lowered::new(
            Value::Ref(Reference::CaughtException { ty: ty.clone() }),
            vec![position],
        );
        let declaration = Declaration {
            is_const: false,
            declared: ty,
        };
        self.bind_pattern(param, exception, Some(&declaration))
    }

    fn lower_type_alias(&mut self, alias: &ast::TypeAliasDecl) -> Result<Vec<Stmt>, LowerError> {
        let name = self.name(alias.name.name);
        let original = self.resolve_type(Some(&alias.type_annotation));
        let alias_type = AliasType::new(name, original.clone());
        self.symbols.define_alias(alias_type.clone());
        let position = self.position(&alias.span);
        Ok(vec![self.stmt(
            StmtKind::AliasTypeDefine {
                alias: alias_type,
                expr: AliasTypeExpr { original },
            },
            vec![position],
        )])
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declare every name bound anywhere in the body before lowering it.
    ///
    /// Variables become locals up front and nested function declarations
    /// are reported once all names are known, so they capture the whole
    /// scope.
    pub(crate) fn hoist(&mut self, statements: &[Statement]) {
        let mut functions = Vec::new();
        for stmt in statements {
            self.hoist_names(stmt, &mut functions);
        }
        for func in functions {
            self.hoist_function(func);
        }
    }

    fn hoist_names<'s>(&mut self, stmt: &'s Statement, functions: &mut Vec<&'s ast::FunctionDecl>) {
        match stmt {
            Statement::VariableDecl(decl) => {
                for declarator in &decl.declarations {
                    self.hoist_pattern(&declarator.pattern);
                }
            }
            Statement::FunctionDecl(func) => {
                if let Some(name) = &func.name {
                    let name = self.name(name.name);
                    if !self.is_file_function(name) {
                        self.symbols.declare(name, Type::Unknown);
                        functions.push(func);
                    }
                }
            }
            Statement::If(if_stmt) => {
                self.hoist_names(&if_stmt.then_branch, functions);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.hoist_names(else_branch, functions);
                }
            }
            Statement::While(while_stmt) => self.hoist_names(&while_stmt.body, functions),
            Statement::DoWhile(do_while) => self.hoist_names(&do_while.body, functions),
            Statement::For(for_stmt) => {
                if let Some(ForInit::VariableDecl(decl)) = &for_stmt.init {
                    for declarator in &decl.declarations {
                        self.hoist_pattern(&declarator.pattern);
                    }
                }
                self.hoist_names(&for_stmt.body, functions);
            }
            Statement::ForOf(for_of) | Statement::ForIn(for_of) => {
                if let ForOfLeft::VariableDecl { pattern, .. } = &for_of.left {
                    self.hoist_pattern(pattern);
                }
                self.hoist_names(&for_of.body, functions);
            }
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    for stmt in &case.consequent {
                        self.hoist_names(stmt, functions);
                    }
                }
            }
            Statement::Try(try_stmt) => {
                for stmt in &try_stmt.body.statements {
                    self.hoist_names(stmt, functions);
                }
                if let Some(catch) = &try_stmt.catch_clause {
                    if let Some(param) = &catch.param {
                        self.hoist_pattern(param);
                    }
                    for stmt in &catch.body.statements {
                        self.hoist_names(stmt, functions);
                    }
                }
                if let Some(finally) = &try_stmt.finally_clause {
                    for stmt in &finally.statements {
                        self.hoist_names(stmt, functions);
                    }
                }
            }
            Statement::Block(block) => {
                for stmt in &block.statements {
                    self.hoist_names(stmt, functions);
                }
            }
            Statement::Labeled(labeled) => self.hoist_names(&labeled.body, functions),
            _ => {}
        }
    }

    fn hoist_pattern(&mut self, pattern: &Pattern) {
        for ident in pattern.bound_names() {
            let name = self.name(ident.name);
            self.symbols.declare(name, Type::Unknown);
        }
    }

    /// Report a nested function declaration to the sink, once.
    fn hoist_function(&mut self, func: &ast::FunctionDecl) {
        let Some(name) = &func.name else {
            return;
        };
        let name = self.name(name.name);
        if self.is_file_function(name) || !self.hoisted.insert(func.span.start) {
            return;
        }
        let local = self.symbols.declare(name, Type::Unknown);
        let captures = self.visible_names();
        let signature =
            self.sink
                .declare_function(self.ctx, FunctionSource::Function(func.clone()), captures);
        self.symbols
            .locals_mut()
            .set_type(local.id, Type::Function(Box::new(signature)));
    }

    /// Top-level functions are methods of the default class, not locals.
    fn is_file_function(&self, name: &str) -> bool {
        self.at_file_level() && self.ctx.scope.functions.contains_key(name)
    }

    fn declare_local_class(&mut self, class: &ast::ClassDecl) {
        let name = self.name(class.name.name);
        if self.at_file_level() && self.ctx.scope.classes.contains_key(name) {
            return;
        }
        let captures = self.visible_names();
        let signature = self.sink.declare_class(self.ctx, class, captures);
        self.local_classes.insert(name.to_string(), signature);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{lines, lower_main, model};
    use crate::ir::signature::DEFAULT_CLASS;
    use crate::ir::Type;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declaration_without_initializer() {
        let body = lower_main("let u;");
        assert_eq!(lines(&body), vec!["u = undefined"]);
    }

    #[test]
    fn test_var_is_hoisted() {
        let body = lower_main("x = 5;\nvar x;");
        assert_eq!(lines(&body), vec!["x = 5", "x = undefined"]);
        assert!(body.globals.is_empty());

        let model = model("function f2() { if (c) { var w = 1; } return w; }");
        let body = model.function_body("f2").unwrap();
        let globals: Vec<&str> = body.globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(globals, vec!["c"]);
    }

    #[test]
    fn test_try_catch_finally_flattened() {
        let body = lower_main("try { f(); } catch (e) { g(e); } finally { h(); }");
        assert_eq!(
            lines(&body),
            vec![
                "staticinvoke <test.ts: %dflt.f()>()",
                "e = caughtexception: unknown",
                "staticinvoke <test.ts: %dflt.g()>(e)",
                "staticinvoke <test.ts: %dflt.h()>()",
            ]
        );
    }

    #[test]
    fn test_type_alias() {
        let body = lower_main("type Id = number;");
        assert_eq!(lines(&body), vec!["type Id = number"]);
        assert_eq!(body.aliases.len(), 1);
        assert_eq!(body.aliases[0].name, "Id");
    }

    #[test]
    fn test_nested_function_is_hoisted() {
        let model = model("function main() { helper(); function helper() {} }");
        let body = model.function_body("main").unwrap();
        assert_eq!(
            lines(body),
            vec!["ptrinvoke helper.<test.ts: %dflt.helper$main()>()"]
        );
        assert!(model.body(DEFAULT_CLASS, "helper$main").is_some());
    }

    #[test]
    fn test_local_class() {
        let model = model("function make() { class Box {} return new Box(); }");
        let body = model.function_body("make").unwrap();
        assert_eq!(lines(body)[0], "%0 = new Box$make");
        assert!(model.class("Box$make").is_some());
    }

    #[test]
    fn test_bare_return_fixes_return_type() {
        let model = model("function h() { return; return 1; }\nasync function j() { return; }");
        assert_eq!(model.function_body("h").unwrap().return_type, Type::Void);
        assert_eq!(
            model.function_body("j").unwrap().return_type,
            Type::promise(Type::Void)
        );
    }
}
