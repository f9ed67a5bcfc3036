//! Declaration sink
//!
//! A lowering session does not build methods or classes for the nested
//! declarations it meets. It reports them to a [`DeclarationSink`] and gets
//! back the signature to refer to them by; the model driver turns the
//! collected declarations into further lowering jobs.

use crate::builtins::SignatureResolver;
use crate::ir::{ClassSignature, FieldSignature, MethodSignature, Type};
use crate::lower::{MethodContext, TypeScope};
use crate::parser::ast::{ArrowFunction, ClassDecl, FunctionDecl};
use crate::parser::Interner;
use rustc_hash::FxHashSet;

/// A function value or nested function declaration.
#[derive(Debug, Clone)]
pub enum FunctionSource {
    Function(FunctionDecl),
    Arrow(ArrowFunction),
}

impl FunctionSource {
    pub fn is_async(&self) -> bool {
        match self {
            FunctionSource::Function(func) => func.is_async,
            FunctionSource::Arrow(arrow) => arrow.is_async,
        }
    }
}

/// Receiver of nested declarations met while lowering a method.
pub trait DeclarationSink {
    /// A function expression, arrow or nested function declaration.
    fn declare_function(
        &mut self,
        outer: &MethodContext,
        source: FunctionSource,
        captures: Vec<String>,
    ) -> MethodSignature;

    /// A class declared inside a method body.
    fn declare_class(
        &mut self,
        outer: &MethodContext,
        class: &ClassDecl,
        captures: Vec<String>,
    ) -> ClassSignature;

    /// The anonymous class of an object literal.
    fn declare_object_literal(
        &mut self,
        outer: &MethodContext,
        fields: &[(String, Type)],
    ) -> ClassSignature;
}

#[derive(Debug, Clone)]
pub struct PendingFunction {
    pub signature: MethodSignature,
    pub outer: MethodContext,
    pub source: FunctionSource,
    pub captures: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PendingClass {
    pub signature: ClassSignature,
    pub outer: MethodContext,
    pub decl: ClassDecl,
    pub captures: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PendingObject {
    pub signature: ClassSignature,
    pub fields: Vec<FieldSignature>,
}

/// Sink that records declarations for the next lowering round.
///
/// One sink serves one method, so the `%AM<n>`/`%AC<n>` counters only need
/// to be unique within that method's name.
pub struct CollectingSink<'s> {
    interner: &'s Interner,
    resolver: &'s dyn SignatureResolver,
    pub functions: Vec<PendingFunction>,
    pub classes: Vec<PendingClass>,
    pub objects: Vec<PendingObject>,
    names: FxHashSet<String>,
    anonymous_methods: u32,
    anonymous_classes: u32,
}

impl<'s> CollectingSink<'s> {
    pub fn new(interner: &'s Interner, resolver: &'s dyn SignatureResolver) -> Self {
        Self {
            interner,
            resolver,
            functions: Vec::new(),
            classes: Vec::new(),
            objects: Vec::new(),
            names: FxHashSet::default(),
            anonymous_methods: 0,
            anonymous_classes: 0,
        }
    }

    fn anonymous_method_name(&mut self, outer: &MethodContext) -> String {
        let name = format!("%AM{}${}", self.anonymous_methods, outer.signature.name());
        self.anonymous_methods += 1;
        name
    }
}

/// Owner part of nested names: the method, qualified outside the default class.
fn outer_key(outer: &MethodContext) -> String {
    if outer.class.is_default() {
        outer.signature.name().to_string()
    } else {
        format!("{}-{}", outer.class.name, outer.signature.name())
    }
}

impl<'s> DeclarationSink for CollectingSink<'s> {
    fn declare_function(
        &mut self,
        outer: &MethodContext,
        source: FunctionSource,
        captures: Vec<String>,
    ) -> MethodSignature {
        let declared_name = match &source {
            FunctionSource::Function(func) => func
                .name
                .as_ref()
                .map(|name| format!("{}${}", self.interner.resolve(name.name), outer.signature.name())),
            FunctionSource::Arrow(_) => None,
        };
        let name = match declared_name {
            Some(name) if self.names.insert(name.clone()) => name,
            _ => self.anonymous_method_name(outer),
        };

        let types = TypeScope::new(self.interner, &outer.scope, self.resolver);
        let (params, return_type) = match &source {
            FunctionSource::Function(func) => (&func.params, func.return_type.as_ref()),
            FunctionSource::Arrow(arrow) => (&arrow.params, arrow.return_type.as_ref()),
        };
        let signature =
            types.method_signature(outer.class.clone(), name, params, return_type, outer.is_static);

        self.functions.push(PendingFunction {
            signature: signature.clone(),
            outer: outer.clone(),
            source,
            captures,
        });
        signature
    }

    fn declare_class(
        &mut self,
        outer: &MethodContext,
        class: &ClassDecl,
        captures: Vec<String>,
    ) -> ClassSignature {
        let name = format!(
            "{}${}",
            self.interner.resolve(class.name.name),
            outer_key(outer)
        );
        let signature = ClassSignature::new(outer.scope.file.clone(), name);
        self.classes.push(PendingClass {
            signature: signature.clone(),
            outer: outer.clone(),
            decl: class.clone(),
            captures,
        });
        signature
    }

    fn declare_object_literal(
        &mut self,
        outer: &MethodContext,
        fields: &[(String, Type)],
    ) -> ClassSignature {
        let name = format!("%AC{}${}", self.anonymous_classes, outer_key(outer));
        self.anonymous_classes += 1;
        let signature = ClassSignature::new(outer.scope.file.clone(), name);

        let mut declared: Vec<FieldSignature> = Vec::with_capacity(fields.len());
        for (name, ty) in fields {
            match declared.iter_mut().find(|field| &field.name == name) {
                Some(field) => field.ty = ty.clone(),
                None => declared.push(FieldSignature::new(signature.clone(), name.as_str(), ty.clone())),
            }
        }
        self.objects.push(PendingObject {
            signature: signature.clone(),
            fields: declared,
        });
        signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::ir::signature::DEFAULT_CLASS;
    use crate::ir::{FileSignature, MethodSubSignature};
    use crate::lower::FileScope;
    use std::sync::Arc;

    fn context(class: &str, method: &str) -> MethodContext {
        let file = FileSignature::new("p", "a.ts");
        let scope = Arc::new(FileScope::new(file.clone()));
        let signature = MethodSignature::new(
            ClassSignature::new(file, class),
            MethodSubSignature::new(method, Vec::new(), Type::Unknown),
        );
        MethodContext::new(signature, scope)
    }

    #[test]
    fn test_object_literal_names() {
        let interner = Interner::new();
        let builtins = Builtins::default();
        let mut sink = CollectingSink::new(&interner, &builtins);

        let outer = context(DEFAULT_CLASS, "main");
        let first = sink.declare_object_literal(&outer, &[("a".into(), Type::Number)]);
        let second = sink.declare_object_literal(
            &outer,
            &[("b".into(), Type::Number), ("b".into(), Type::String)],
        );
        assert_eq!(first.name, "%AC0$main");
        assert_eq!(second.name, "%AC1$main");
        assert_eq!(sink.objects[1].fields.len(), 1);
        assert_eq!(sink.objects[1].fields[0].ty, Type::String);

        let method = context("Point", "norm");
        let third = sink.declare_object_literal(&method, &[]);
        assert_eq!(third.name, "%AC2$Point-norm");
    }
}
