//! AST to IR lowering
//!
//! A [`Lowerer`] is one lowering session for one method. It owns the
//! method's symbol table and counters and borrows everything else: the
//! method's context, the source file used as position oracle, the builtin
//! signature table and a [`DeclarationSink`] that receives nested function,
//! class and object-literal declarations.
//!
//! The value engine ([`Lowerer::lower_expr`]) turns an expression into a
//! [`Lowered`] triple. The statement engine ([`Lowerer::lower_stmt`]) turns a
//! statement into a statement list, emitting only the header of compound
//! statements; [`Lowerer::lower_body`] walks a whole method.

mod assign;
mod body;
mod call;
mod control_flow;
mod expr;
mod literal;
mod stmt;
pub mod symbols;
pub mod types;

pub use body::{BodyInput, FieldInit};
pub use symbols::SymbolTable;
pub use types::TypeScope;

use crate::builtins::SignatureResolver;
use crate::config::LowerConfig;
use crate::error::LowerError;
use crate::ir::signature::DEFAULT_METHOD;
use crate::ir::{
    ClassSignature, FileSignature, Local, MethodSignature, Operand, OriginText, Place, Position,
    Stmt, StmtId, StmtKind, SwitchInfo, Type, Value,
};
use crate::model::sink::DeclarationSink;
use crate::parser::ast::TypeAnnotation;
use crate::parser::{Interner, SourceFile, Span};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Maximum nesting depth for lowering expressions and statements.
pub const MAX_LOWER_DEPTH: usize = 512;

/// Signatures declared at file level, shared read-only by every session.
#[derive(Debug, Clone)]
pub struct FileScope {
    pub file: FileSignature,
    pub classes: FxHashMap<String, ClassSignature>,
    pub functions: FxHashMap<String, MethodSignature>,
}

impl FileScope {
    pub fn new(file: FileSignature) -> Self {
        Self {
            file,
            classes: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }
}

/// What the session knows about the method being lowered.
#[derive(Debug, Clone)]
pub struct MethodContext {
    pub signature: MethodSignature,
    pub class: ClassSignature,
    pub super_class: Option<ClassSignature>,
    pub is_async: bool,
    pub is_static: bool,
    /// Names visible in enclosing methods, read through `%closures`
    pub captures: Vec<String>,
    pub scope: Arc<FileScope>,
}

impl MethodContext {
    pub fn new(signature: MethodSignature, scope: Arc<FileScope>) -> Self {
        let class = signature.class.clone();
        Self {
            is_static: signature.sub.is_static,
            signature,
            class,
            super_class: None,
            is_async: false,
            captures: Vec::new(),
            scope,
        }
    }

    pub fn this_type(&self) -> Type {
        Type::class(self.class.clone())
    }
}

/// Result of lowering one expression.
///
/// `positions[0]` is the position of the value itself, followed by one
/// position per operand. `stmts` must execute before `value` is used.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub value: Value,
    pub positions: Vec<Position>,
    pub stmts: Vec<Stmt>,
}

impl Lowered {
    pub fn new(value: Value, positions: Vec<Position>) -> Self {
        Self {
            value,
            positions,
            stmts: Vec::new(),
        }
    }

    pub fn with_stmts(value: Value, positions: Vec<Position>, stmts: Vec<Stmt>) -> Self {
        Self {
            value,
            positions,
            stmts,
        }
    }

    pub fn position(&self) -> Position {
        self.positions.first().copied().unwrap_or(Position::UNKNOWN)
    }
}

pub struct Lowerer<'a> {
    ctx: &'a MethodContext,
    source: &'a SourceFile,
    interner: &'a Interner,
    resolver: &'a dyn SignatureResolver,
    sink: &'a mut dyn DeclarationSink,
    config: &'a LowerConfig,

    symbols: SymbolTable,
    /// Classes declared inside this method
    local_classes: FxHashMap<String, ClassSignature>,
    /// Function declarations already reported to the sink, by span start
    hoisted: FxHashSet<usize>,

    next_stmt: u32,
    /// Ternary marker index, allocated on entry so nesting follows source order
    ternary_counter: u32,
    loop_counter: u32,
    /// Statements that already carry an origin snapshot
    tagged: FxHashSet<StmtId>,
    return_type: Type,
    /// Set once a `return` carries a value
    returns_value: bool,
    switches: Vec<SwitchInfo>,
    depth: usize,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        ctx: &'a MethodContext,
        source: &'a SourceFile,
        interner: &'a Interner,
        resolver: &'a dyn SignatureResolver,
        sink: &'a mut dyn DeclarationSink,
        config: &'a LowerConfig,
    ) -> Self {
        let mut symbols = SymbolTable::new();
        symbols.declare_this(ctx.this_type());
        Self {
            ctx,
            source,
            interner,
            resolver,
            sink,
            config,
            symbols,
            local_classes: FxHashMap::default(),
            hoisted: FxHashSet::default(),
            next_stmt: 0,
            ternary_counter: 0,
            loop_counter: 0,
            tagged: FxHashSet::default(),
            return_type: ctx.signature.return_type().clone(),
            returns_value: false,
            switches: Vec::new(),
            depth: 0,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    // ========================================================================
    // Statement construction
    // ========================================================================

    pub(crate) fn stmt(&mut self, kind: StmtKind, positions: Vec<Position>) -> Stmt {
        let id = StmtId(self.next_stmt);
        self.next_stmt += 1;
        Stmt::new(id, kind, positions)
    }

    /// `left = right`, with the left positions followed by the right ones.
    pub(crate) fn assign_stmt(
        &mut self,
        left: Place,
        left_positions: &[Position],
        right: Value,
        right_positions: &[Position],
    ) -> Stmt {
        let mut positions = left_positions.to_vec();
        positions.extend_from_slice(right_positions);
        self.stmt(StmtKind::Assign { left, right }, positions)
    }

    pub(crate) fn position(&self, span: &Span) -> Position {
        self.source.position(span)
    }

    pub(crate) fn name(&self, symbol: crate::parser::Symbol) -> &'a str {
        self.interner.resolve(symbol)
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Copy a value into a fresh temporary.
    ///
    /// Emits exactly one assignment, except for synthetic values without a
    /// tracked position, which are returned unchanged.
    pub(crate) fn materialize(&mut self, lowered: Lowered) -> Lowered {
        if lowered.positions.is_empty() {
            return lowered;
        }
        let (temp, position, stmts) = self.temp_of(lowered);
        Lowered::with_stmts(Value::Local(temp), vec![position], stmts)
    }

    /// Assign a value to a fresh temporary, whatever its shape.
    pub(crate) fn temp_of(&mut self, lowered: Lowered) -> (Local, Position, Vec<Stmt>) {
        let Lowered {
            value,
            mut positions,
            mut stmts,
        } = lowered;
        if positions.is_empty() {
            positions.push(Position::UNKNOWN);
        }
        let ty = value.ty(self.symbols.locals());
        let temp = self.symbols.temp(ty);
        let own = positions[0];
        let assign = self.assign_stmt(Place::Local(temp.clone()), &[own], value, &positions);
        stmts.push(assign);
        (temp, own, stmts)
    }

    /// Reduce a lowered value to an operand, materializing if needed.
    pub(crate) fn operand_of(&mut self, lowered: Lowered) -> (Operand, Position, Vec<Stmt>) {
        let position = lowered.position();
        let Lowered {
            value,
            positions,
            stmts,
        } = lowered;
        match value.into_operand() {
            Ok(operand) => (operand, position, stmts),
            Err(value) => {
                let (temp, position, stmts) =
                    self.temp_of(Lowered::with_stmts(value, positions, stmts));
                (Operand::Local(temp), position, stmts)
            }
        }
    }

    /// Reduce a lowered value to a local, materializing anything else.
    pub(crate) fn local_of(&mut self, lowered: Lowered) -> (Local, Position, Vec<Stmt>) {
        match lowered.value {
            Value::Local(local) => {
                let position = lowered.positions.first().copied().unwrap_or(Position::UNKNOWN);
                (local, position, lowered.stmts)
            }
            value => self.temp_of(Lowered::with_stmts(value, lowered.positions, lowered.stmts)),
        }
    }

    // ========================================================================
    // Session state
    // ========================================================================

    pub(crate) fn type_scope(&self) -> TypeScope<'_> {
        TypeScope {
            interner: self.interner,
            scope: &self.ctx.scope,
            resolver: self.resolver,
            aliases: Some(self.symbols.aliases()),
            local_classes: Some(&self.local_classes),
        }
    }

    pub(crate) fn resolve_type(&self, annotation: Option<&TypeAnnotation>) -> Type {
        match annotation {
            Some(annotation) => self.type_scope().resolve(annotation),
            None => Type::Unknown,
        }
    }

    pub(crate) fn class_named(&self, name: &str) -> Option<ClassSignature> {
        if self.symbols.lookup(name).is_some() {
            return None;
        }
        self.type_scope().class_named(name)
    }

    pub(crate) fn next_ternary(&mut self) -> u32 {
        let index = self.ternary_counter;
        self.ternary_counter += 1;
        index
    }

    pub(crate) fn next_loop(&mut self) -> u32 {
        let index = self.loop_counter;
        self.loop_counter += 1;
        index
    }

    /// Names a nested function may read from this method.
    pub(crate) fn visible_names(&self) -> Vec<String> {
        let mut names = self.symbols.named();
        for capture in &self.ctx.captures {
            if !names.contains(capture) {
                names.push(capture.clone());
            }
        }
        names.retain(|name| name != symbols::THIS_NAME && !name.starts_with('%'));
        names
    }

    /// True in the default method, whose top-level declarations belong to the file.
    pub(crate) fn at_file_level(&self) -> bool {
        self.ctx.class.is_default() && self.ctx.signature.name() == DEFAULT_METHOD
    }

    pub(crate) fn enter(&mut self, span: &Span) -> Result<(), LowerError> {
        self.depth += 1;
        if self.depth > MAX_LOWER_DEPTH {
            self.depth -= 1;
            return Err(LowerError::DepthExceeded {
                position: self.position(span),
            });
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Attach the node's source snapshot to the first statement of a group.
    pub(crate) fn tag(&mut self, stmts: &mut [Stmt], span: &Span) {
        if !self.config.origin_text {
            return;
        }
        let Some(first) = stmts.first_mut() else {
            return;
        };
        if !self.tagged.insert(first.id) {
            return;
        }
        let (line, column) = self.source.line_column(span.start);
        first.origin = Some(OriginText {
            text: self.source.snippet(span).to_string(),
            line,
            column,
        });
    }

    /// Record the type of a returned value when the return type is open.
    pub(crate) fn infer_return(&mut self, ty: Type) {
        if !self.return_type.is_unknown() || ty.is_unknown() {
            return;
        }
        self.return_type = if self.ctx.is_async {
            match ty {
                Type::Class(class) if class.signature.name == "Promise" => Type::Class(class),
                other => Type::promise(other),
            }
        } else {
            ty
        };
    }

    pub(crate) fn void_return_type(&self) -> Type {
        if self.ctx.is_async {
            Type::promise(Type::Void)
        } else {
            Type::Void
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::ArklowConfig;
    use crate::ir::signature::{DEFAULT_CLASS, DEFAULT_METHOD};
    use crate::ir::{MethodBody, Reference, StmtKind, Value};
    use crate::model::{lower_source, FileModel};
    use crate::parser::SourceFile;

    pub fn model(source: &str) -> FileModel {
        let mut config = ArklowConfig::default();
        config.lower.jobs = 1;
        config.lower.origin_text = false;
        lower_source(&SourceFile::new("test.ts", source), &config).unwrap()
    }

    /// Body of the file's top-level code.
    pub fn lower_main(source: &str) -> MethodBody {
        model(source)
            .body(DEFAULT_CLASS, DEFAULT_METHOD)
            .cloned()
            .unwrap()
    }

    /// Printed statements, without the `this` prologue.
    pub fn lines(body: &MethodBody) -> Vec<String> {
        body.stmts
            .iter()
            .filter(|stmt| {
                !matches!(
                    &stmt.kind,
                    StmtKind::Assign {
                        right: Value::Ref(Reference::This { .. }),
                        ..
                    }
                )
            })
            .map(|stmt| stmt.to_string())
            .collect()
    }
}
