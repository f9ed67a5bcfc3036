//! File model
//!
//! The semantic model of one source file: the default class `%dflt` whose
//! `%dflt` method holds the top-level statements, one class per class
//! declaration, and the anonymous methods and classes discovered while
//! lowering. [`driver`] fills in the method bodies.

pub mod driver;
pub mod sink;

pub use driver::{lower_file, lower_module, lower_source};
pub use sink::{CollectingSink, DeclarationSink, FunctionSource};

use crate::builtins::SignatureResolver;
use crate::error::LowerError;
use crate::ir::signature::{
    CONSTRUCTOR, DEFAULT_CLASS, DEFAULT_METHOD, INSTANCE_INIT, STATIC_INIT,
};
use crate::ir::{
    ClassSignature, FieldSignature, FileSignature, MethodBody, MethodSignature, MethodSubSignature,
    PrettyPrint, Type,
};
use crate::lower::{FieldInit, FileScope, MethodContext, TypeScope};
use crate::parser::ast::{
    ArrowBody, ClassDecl, ClassMember, Expression, MethodKind, Module, Parameter, Pattern,
    Statement,
};
use crate::parser::Interner;
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use std::fmt::Write;
use std::sync::Arc;
use sink::{PendingClass, PendingFunction, PendingObject};

/// A method whose body could not be lowered.
#[derive(Debug, Clone, Serialize)]
pub struct LowerFailure {
    /// Display form of the method signature
    pub method: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: LowerError,
}

fn serialize_display<S: Serializer>(error: &LowerError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodModel {
    pub signature: MethodSignature,
    pub is_async: bool,
    /// Enclosing names read through `%closures`
    pub captures: Vec<String>,
    /// `None` until lowered, and for methods whose lowering failed
    pub body: Option<MethodBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassModel {
    pub signature: ClassSignature,
    pub super_class: Option<ClassSignature>,
    pub is_abstract: bool,
    pub fields: Vec<FieldSignature>,
    pub methods: Vec<MethodModel>,
}

impl ClassModel {
    fn new(signature: ClassSignature) -> Self {
        Self {
            signature,
            super_class: None,
            is_abstract: false,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodModel> {
        self.methods.iter().find(|method| method.signature.name() == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileModel {
    pub signature: FileSignature,
    pub classes: Vec<ClassModel>,
    pub failures: Vec<LowerFailure>,
}

impl FileModel {
    pub fn class(&self, name: &str) -> Option<&ClassModel> {
        self.classes.iter().find(|class| class.signature.name == name)
    }

    pub fn default_class(&self) -> Option<&ClassModel> {
        self.class(DEFAULT_CLASS)
    }

    /// The lowered body of `class.method`.
    pub fn body(&self, class: &str, method: &str) -> Option<&MethodBody> {
        self.class(class)?.method(method)?.body.as_ref()
    }

    /// The lowered body of a top-level function or of the default method.
    pub fn function_body(&self, name: &str) -> Option<&MethodBody> {
        self.body(DEFAULT_CLASS, name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodModel> {
        self.classes.iter().flat_map(|class| class.methods.iter())
    }
}

impl PrettyPrint for FileModel {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "file {}", self.signature).unwrap();
        for class in &self.classes {
            writeln!(output).unwrap();
            match &class.super_class {
                Some(parent) => writeln!(output, "class {} extends {}", class.signature.name, parent).unwrap(),
                None => writeln!(output, "class {}", class.signature.name).unwrap(),
            }
            for field in &class.fields {
                let prefix = if field.is_static { "static " } else { "" };
                writeln!(output, "  {}field {}: {}", prefix, field.name, field.ty).unwrap();
            }
            for method in &class.methods {
                write!(output, "{}", method.pretty_print()).unwrap();
            }
        }
        output
    }
}

impl PrettyPrint for MethodModel {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        let return_type = self
            .body
            .as_ref()
            .map(|body| &body.return_type)
            .unwrap_or(self.signature.return_type());
        writeln!(output, "  method {}: {}", self.signature, return_type).unwrap();
        match &self.body {
            Some(body) => {
                for line in body.pretty_print().lines() {
                    writeln!(output, "  {}", line).unwrap();
                }
            }
            None => writeln!(output, "    ; no body").unwrap(),
        }
        output
    }
}

// ============================================================================
// Model building
// ============================================================================

/// Where a lowered body goes: class index, method index.
pub(crate) type Slot = (usize, usize);

/// The AST a lowering job works on.
#[derive(Debug, Clone)]
pub(crate) enum JobSource {
    Block {
        params: Vec<Parameter>,
        statements: Vec<Statement>,
        param_properties: bool,
    },
    Expression {
        params: Vec<Parameter>,
        expression: Expression,
    },
    Initializers(Vec<FieldInit>),
}

/// One method body to lower.
#[derive(Debug, Clone)]
pub(crate) struct LowerJob {
    pub slot: Slot,
    pub context: MethodContext,
    pub source: JobSource,
}

/// Builds the [`FileModel`] and the lowering jobs that fill it.
pub(crate) struct ModelBuilder<'m> {
    interner: &'m Interner,
    resolver: &'m dyn SignatureResolver,
    scope: Arc<FileScope>,
    model: FileModel,
    class_index: FxHashMap<ClassSignature, usize>,
}

impl<'m> ModelBuilder<'m> {
    /// Declare the file-level names of `module` and return the first round of jobs.
    pub fn new(
        file: FileSignature,
        module: &Module,
        interner: &'m Interner,
        resolver: &'m dyn SignatureResolver,
    ) -> (Self, Vec<LowerJob>) {
        let scope = declare_file_scope(file.clone(), module, interner, resolver);
        let mut builder = Self {
            interner,
            resolver,
            scope: Arc::new(scope),
            model: FileModel {
                signature: file.clone(),
                classes: Vec::new(),
                failures: Vec::new(),
            },
            class_index: FxHashMap::default(),
        };

        let default_class = ClassSignature::new(file, DEFAULT_CLASS);
        let class = builder.add_class(ClassModel::new(default_class.clone()));
        let signature = MethodSignature::new(
            default_class,
            MethodSubSignature::new(DEFAULT_METHOD, Vec::new(), Type::Unknown),
        );
        let context = MethodContext::new(signature, builder.scope.clone());
        let mut jobs = vec![builder.add_method(
            class,
            context,
            JobSource::Block {
                params: Vec::new(),
                statements: module.statements.clone(),
                param_properties: false,
            },
        )];

        for stmt in &module.statements {
            match stmt {
                Statement::FunctionDecl(func) => {
                    let Some(name) = &func.name else {
                        continue;
                    };
                    let name = interner.resolve(name.name);
                    let Some(signature) = builder.scope.functions.get(name).cloned() else {
                        continue;
                    };
                    let mut context = MethodContext::new(signature, builder.scope.clone());
                    context.is_async = func.is_async;
                    jobs.push(builder.add_method(
                        class,
                        context,
                        JobSource::Block {
                            params: func.params.clone(),
                            statements: func.body.statements.clone(),
                            param_properties: false,
                        },
                    ));
                }
                Statement::ClassDecl(decl) => {
                    let name = interner.resolve(decl.name.name);
                    if let Some(signature) = builder.scope.classes.get(name).cloned() {
                        jobs.extend(builder.add_class_decl(signature, decl, Vec::new()));
                    }
                }
                _ => {}
            }
        }
        (builder, jobs)
    }

    fn add_class(&mut self, class: ClassModel) -> usize {
        let index = self.model.classes.len();
        self.class_index.insert(class.signature.clone(), index);
        self.model.classes.push(class);
        index
    }

    fn add_method(&mut self, class: usize, context: MethodContext, source: JobSource) -> LowerJob {
        let methods = &mut self.model.classes[class].methods;
        let slot = (class, methods.len());
        methods.push(MethodModel {
            signature: context.signature.clone(),
            is_async: context.is_async,
            captures: context.captures.clone(),
            body: None,
        });
        LowerJob {
            slot,
            context,
            source,
        }
    }

    /// A class declaration: fields, methods, constructor and the two
    /// field-initializer methods.
    fn add_class_decl(
        &mut self,
        signature: ClassSignature,
        decl: &ClassDecl,
        captures: Vec<String>,
    ) -> Vec<LowerJob> {
        let types = TypeScope::new(self.interner, &self.scope, self.resolver);
        let super_class = decl.extends.as_ref().map(|extends| {
            let name = extends
                .path
                .iter()
                .map(|id| self.interner.resolve(id.name))
                .collect::<Vec<_>>()
                .join(".");
            types
                .class_named(&name)
                .unwrap_or_else(|| ClassSignature::new(FileSignature::unknown(), name))
        });

        let mut class = ClassModel::new(signature.clone());
        class.super_class = super_class.clone();
        class.is_abstract = decl.is_abstract;

        let mut instance_inits = Vec::new();
        let mut static_inits = Vec::new();
        let mut sources: Vec<(MethodSignature, bool, JobSource)> = Vec::new();
        let mut has_constructor = false;

        for member in &decl.members {
            match member {
                ClassMember::Field(field) => {
                    let name = self.interner.resolve(field.name.name).to_string();
                    let ty = field
                        .type_annotation
                        .as_ref()
                        .map(|annotation| types.resolve(annotation))
                        .unwrap_or(Type::Unknown);
                    class.fields.push(
                        FieldSignature::new(signature.clone(), name.as_str(), ty.clone())
                            .with_static(field.is_static),
                    );
                    if let Some(value) = &field.initializer {
                        let init = FieldInit {
                            name,
                            ty,
                            is_static: field.is_static,
                            value: value.clone(),
                            span: field.span,
                        };
                        if field.is_static {
                            static_inits.push(init);
                        } else {
                            instance_inits.push(init);
                        }
                    }
                }
                ClassMember::Method(method) => {
                    let name = self.interner.resolve(method.name.name);
                    let name = match method.kind {
                        MethodKind::Method => name.to_string(),
                        MethodKind::Getter => format!("%get-{}", name),
                        MethodKind::Setter => format!("%set-{}", name),
                    };
                    let function = &method.function;
                    let method_signature = types.method_signature(
                        signature.clone(),
                        name,
                        &function.params,
                        function.return_type.as_ref(),
                        method.is_static,
                    );
                    sources.push((
                        method_signature,
                        function.is_async,
                        JobSource::Block {
                            params: function.params.clone(),
                            statements: function.body.statements.clone(),
                            param_properties: false,
                        },
                    ));
                }
                ClassMember::Constructor(constructor) => {
                    has_constructor = true;
                    for param in constructor.params.iter().filter(|p| p.property.is_some()) {
                        if let Pattern::Identifier(ident) = &param.pattern {
                            let ty = param
                                .type_annotation
                                .as_ref()
                                .map(|annotation| types.resolve(annotation))
                                .unwrap_or(Type::Unknown);
                            class.fields.push(FieldSignature::new(
                                signature.clone(),
                                self.interner.resolve(ident.name),
                                ty,
                            ));
                        }
                    }
                    let mut constructor_signature = types.method_signature(
                        signature.clone(),
                        CONSTRUCTOR,
                        &constructor.params,
                        None,
                        false,
                    );
                    constructor_signature.sub.return_type = Type::Void;
                    sources.push((
                        constructor_signature,
                        false,
                        JobSource::Block {
                            params: constructor.params.clone(),
                            statements: constructor.body.statements.clone(),
                            param_properties: true,
                        },
                    ));
                }
            }
        }

        if !has_constructor {
            sources.push((
                self.resolver.constructor(&signature),
                false,
                JobSource::Block {
                    params: Vec::new(),
                    statements: Vec::new(),
                    param_properties: false,
                },
            ));
        }
        let initializer = |name: &str, is_static: bool| {
            MethodSignature::new(
                signature.clone(),
                MethodSubSignature::new(name, Vec::new(), Type::Void).with_static(is_static),
            )
        };
        sources.push((
            initializer(INSTANCE_INIT, false),
            false,
            JobSource::Initializers(instance_inits),
        ));
        sources.push((
            initializer(STATIC_INIT, true),
            false,
            JobSource::Initializers(static_inits),
        ));

        let index = self.add_class(class);
        sources
            .into_iter()
            .map(|(method_signature, is_async, source)| {
                let mut context = MethodContext::new(method_signature, self.scope.clone());
                context.super_class = super_class.clone();
                context.is_async = is_async;
                context.captures = captures.clone();
                self.add_method(index, context, source)
            })
            .collect()
    }

    /// Store a lowered body.
    pub fn complete(&mut self, slot: Slot, body: MethodBody) {
        let (class, method) = slot;
        if let Some(method) = self
            .model
            .classes
            .get_mut(class)
            .and_then(|class| class.methods.get_mut(method))
        {
            method.body = Some(body);
        }
    }

    /// Record a method whose lowering failed.
    pub fn fail(&mut self, job: &LowerJob, error: LowerError) {
        self.model.failures.push(LowerFailure {
            method: job.context.signature.to_string(),
            error,
        });
    }

    /// Turn the declarations a job reported into models and next-round jobs.
    pub fn absorb(
        &mut self,
        functions: Vec<PendingFunction>,
        classes: Vec<PendingClass>,
        objects: Vec<PendingObject>,
    ) -> Vec<LowerJob> {
        let mut jobs = Vec::new();
        for object in objects {
            let mut class = ClassModel::new(object.signature);
            class.fields = object.fields;
            self.add_class(class);
        }
        for function in functions {
            let class = self.owner_index(&function.outer.class);
            let mut context = MethodContext::new(function.signature, self.scope.clone());
            context.class = function.outer.class.clone();
            context.super_class = function.outer.super_class.clone();
            context.is_async = function.source.is_async();
            context.captures = function.captures;
            let source = match function.source {
                FunctionSource::Function(func) => JobSource::Block {
                    params: func.params,
                    statements: func.body.statements,
                    param_properties: false,
                },
                FunctionSource::Arrow(arrow) => match arrow.body {
                    ArrowBody::Expression(expression) => JobSource::Expression {
                        params: arrow.params,
                        expression: *expression,
                    },
                    ArrowBody::Block(block) => JobSource::Block {
                        params: arrow.params,
                        statements: block.statements,
                        param_properties: false,
                    },
                },
            };
            jobs.push(self.add_method(class, context, source));
        }
        for class in classes {
            jobs.extend(self.add_class_decl(class.signature, &class.decl, class.captures));
        }
        jobs
    }

    /// Class that receives methods declared inside `class`.
    fn owner_index(&self, class: &ClassSignature) -> usize {
        self.class_index.get(class).copied().unwrap_or(0)
    }

    pub fn finish(self) -> FileModel {
        self.model
    }
}

/// Top-level classes first, so function signatures can name them.
fn declare_file_scope(
    file: FileSignature,
    module: &Module,
    interner: &Interner,
    resolver: &dyn SignatureResolver,
) -> FileScope {
    let mut scope = FileScope::new(file.clone());
    for stmt in &module.statements {
        if let Statement::ClassDecl(class) = stmt {
            let name = interner.resolve(class.name.name);
            scope
                .classes
                .insert(name.to_string(), ClassSignature::new(file.clone(), name));
        }
    }

    let default_class = ClassSignature::new(file, DEFAULT_CLASS);
    let mut functions = FxHashMap::default();
    {
        let types = TypeScope::new(interner, &scope, resolver);
        for stmt in &module.statements {
            if let Statement::FunctionDecl(func) = stmt {
                let Some(name) = &func.name else {
                    continue;
                };
                let name = interner.resolve(name.name);
                let signature = types.method_signature(
                    default_class.clone(),
                    name,
                    &func.params,
                    func.return_type.as_ref(),
                    false,
                );
                functions.insert(name.to_string(), signature);
            }
        }
    }
    scope.functions = functions;
    scope
}
