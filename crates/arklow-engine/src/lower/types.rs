//! Type annotations to IR types
//!
//! Only what the annotation says is resolved here. Names that do not refer
//! to a known class or alias become [`Type::UnclearReference`] for type
//! inference to settle.

use super::FileScope;
use crate::builtins::SignatureResolver;
use crate::ir::{
    AliasType, ClassSignature, ClassType, MethodParameter, MethodSignature, MethodSubSignature,
    Type,
};
use crate::parser::ast::{Parameter, Pattern, PrimitiveType, TypeAnnotation, TypeReference};
use crate::parser::Interner;
use rustc_hash::FxHashMap;

/// Everything a type annotation can refer to.
pub struct TypeScope<'a> {
    pub interner: &'a Interner,
    pub scope: &'a FileScope,
    pub resolver: &'a dyn SignatureResolver,
    /// Aliases declared in the current method
    pub aliases: Option<&'a FxHashMap<String, AliasType>>,
    /// Classes declared in the current method
    pub local_classes: Option<&'a FxHashMap<String, ClassSignature>>,
}

impl<'a> TypeScope<'a> {
    pub fn new(interner: &'a Interner, scope: &'a FileScope, resolver: &'a dyn SignatureResolver) -> Self {
        Self {
            interner,
            scope,
            resolver,
            aliases: None,
            local_classes: None,
        }
    }

    pub fn class_named(&self, name: &str) -> Option<ClassSignature> {
        self.local_classes
            .and_then(|classes| classes.get(name))
            .or_else(|| self.scope.classes.get(name))
            .cloned()
    }

    pub fn resolve(&self, annotation: &TypeAnnotation) -> Type {
        match annotation {
            TypeAnnotation::Primitive(primitive, _) => self.primitive(*primitive),
            TypeAnnotation::Reference(reference) => self.reference(reference),
            TypeAnnotation::Array(element, _) => Type::array_of(self.resolve(element)),
            TypeAnnotation::Tuple(elements, _) => {
                Type::Tuple(elements.iter().map(|e| self.resolve(e)).collect())
            }
            TypeAnnotation::Union(members, _) => {
                Type::Union(members.iter().map(|m| self.resolve(m)).collect())
            }
            TypeAnnotation::Intersection(..) => Type::Any,
            TypeAnnotation::Function(function) => {
                let params = function
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, param)| {
                        let name = match &param.name {
                            Some(id) => self.interner.resolve(id.name).to_string(),
                            None => format!("p{}", i),
                        };
                        let mut parameter = MethodParameter::new(name, self.resolve(&param.ty));
                        parameter.optional = param.optional;
                        parameter.rest = param.is_rest;
                        parameter
                    })
                    .collect();
                let sub = MethodSubSignature::new("", params, self.resolve(&function.return_type));
                Type::Function(Box::new(MethodSignature::new(ClassSignature::unknown(), sub)))
            }
            TypeAnnotation::Object(_) => Type::class(self.resolver.builtin_class("Object")),
            TypeAnnotation::StringLiteral(text, _) => {
                Type::Literal(format!("'{}'", self.interner.resolve(*text)))
            }
            TypeAnnotation::NumberLiteral(value, _) => Type::Literal(format!("{}", value)),
            TypeAnnotation::BooleanLiteral(value, _) => Type::Literal(value.to_string()),
            TypeAnnotation::Typeof(..) => Type::Unknown,
        }
    }

    fn primitive(&self, primitive: PrimitiveType) -> Type {
        match primitive {
            PrimitiveType::Number => Type::Number,
            PrimitiveType::String => Type::String,
            PrimitiveType::Boolean => Type::Boolean,
            PrimitiveType::BigInt => Type::BigInt,
            PrimitiveType::Void => Type::Void,
            PrimitiveType::Any | PrimitiveType::Unknown => Type::Any,
            PrimitiveType::Never => Type::Never,
            PrimitiveType::Null => Type::Null,
            PrimitiveType::Undefined => Type::Undefined,
            PrimitiveType::Object => Type::class(self.resolver.builtin_class("Object")),
            PrimitiveType::Symbol => Type::unclear("symbol"),
        }
    }

    fn reference(&self, reference: &TypeReference) -> Type {
        let name = reference
            .path
            .iter()
            .map(|id| self.interner.resolve(id.name))
            .collect::<Vec<_>>()
            .join(".");
        let generics: Vec<Type> = reference.type_args.iter().map(|t| self.resolve(t)).collect();

        if let Some(alias) = self.aliases.and_then(|aliases| aliases.get(&name)) {
            return Type::Alias(alias.clone());
        }
        match name.as_str() {
            "Array" | "ReadonlyArray" => {
                return Type::array_of(generics.into_iter().next().unwrap_or(Type::Any))
            }
            "Promise" => return Type::promise(generics.into_iter().next().unwrap_or(Type::Unknown)),
            _ => {}
        }
        match self.class_named(&name) {
            Some(signature) => Type::Class(ClassType::new(signature).with_generics(generics)),
            None => Type::UnclearReference { name, generics },
        }
    }

    /// Parameter list of a declared method.
    pub fn parameters(&self, params: &[Parameter]) -> Vec<MethodParameter> {
        params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = match &param.pattern {
                    Pattern::Identifier(id) => self.interner.resolve(id.name).to_string(),
                    _ => format!("%param{}", i),
                };
                let ty = match &param.type_annotation {
                    Some(annotation) => self.resolve(annotation),
                    None if param.is_rest => Type::array_of(Type::Any),
                    None => Type::Unknown,
                };
                let mut parameter = MethodParameter::new(name, ty);
                parameter.optional = param.optional || param.default_value.is_some();
                parameter.rest = param.is_rest;
                parameter
            })
            .collect()
    }

    /// Signature of a declared function or method.
    pub fn method_signature(
        &self,
        class: ClassSignature,
        name: impl Into<String>,
        params: &[Parameter],
        return_type: Option<&TypeAnnotation>,
        is_static: bool,
    ) -> MethodSignature {
        let return_type = return_type.map(|ann| self.resolve(ann)).unwrap_or(Type::Unknown);
        let sub = MethodSubSignature::new(name, self.parameters(params), return_type)
            .with_static(is_static);
        MethodSignature::new(class, sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::ir::FileSignature;
    use crate::parser::ast::Statement;
    use crate::parser::Parser;

    fn annotation_of(source: &str) -> (TypeAnnotation, Interner) {
        let (module, interner) = Parser::new(source).unwrap().parse().unwrap();
        match &module.statements[0] {
            Statement::VariableDecl(decl) => (
                decl.declarations[0].type_annotation.clone().unwrap(),
                interner,
            ),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_resolve_types() {
        let file = FileSignature::new("p", "a.ts");
        let mut scope = FileScope::new(file.clone());
        scope
            .classes
            .insert("Point".to_string(), ClassSignature::new(file, "Point"));
        let builtins = Builtins::default();

        let cases = [
            ("let a: number[];", "number[]"),
            ("let a: Array<string>;", "string[]"),
            ("let a: Point;", "@a.ts: Point"),
            ("let a: Map<string, Point>;", "Map<string, @a.ts: Point>"),
            ("let a: Promise<void>;", "@%builtin: Promise<void>"),
            ("let a: string | null;", "string|null"),
            ("let a: [number, boolean];", "[number, boolean]"),
            ("let a: 'on';", "'on'"),
        ];
        for (source, expected) in cases {
            let (annotation, interner) = annotation_of(source);
            let types = TypeScope::new(&interner, &scope, &builtins);
            assert_eq!(types.resolve(&annotation).to_string(), expected, "{}", source);
        }
    }
}
