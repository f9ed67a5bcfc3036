//! IR types
//!
//! Lowering does not resolve types: most locals start as [`Type::Unknown`]
//! and a later inference pass refines them. The lowering engine only fills
//! in types it can read off literals, annotations and known signatures.

use super::signature::{ClassSignature, FileSignature, MethodSignature, BUILTIN_FILE};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    /// Placeholder filled in by type inference
    Unknown,
    Any,
    Number,
    String,
    Boolean,
    BigInt,
    Null,
    Undefined,
    Void,
    Never,
    Class(ClassType),
    Array(Box<Type>),
    Tuple(Vec<Type>),
    Union(Vec<Type>),
    Function(Box<MethodSignature>),
    /// A type name seen in source but not resolved to a declaration
    UnclearReference { name: String, generics: Vec<Type> },
    Alias(AliasType),
    /// String, numeric or boolean literal type, kept as its source text
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassType {
    pub signature: ClassSignature,
    pub generics: Vec<Type>,
}

impl ClassType {
    pub fn new(signature: ClassSignature) -> Self {
        Self {
            signature,
            generics: Vec::new(),
        }
    }

    pub fn with_generics(mut self, generics: Vec<Type>) -> Self {
        self.generics = generics;
        self
    }
}

/// A named alias declared with `type Name = ...` inside a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AliasType {
    pub name: String,
    pub original: Box<Type>,
}

impl AliasType {
    pub fn new(name: impl Into<String>, original: Type) -> Self {
        Self {
            name: name.into(),
            original: Box::new(original),
        }
    }
}

impl Type {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn class(signature: ClassSignature) -> Self {
        Type::Class(ClassType::new(signature))
    }

    pub fn array_of(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// `Promise<inner>` from the builtin declarations.
    pub fn promise(inner: Type) -> Self {
        let signature = ClassSignature::new(FileSignature::new(BUILTIN_FILE, BUILTIN_FILE), "Promise");
        Type::Class(ClassType::new(signature).with_generics(vec![inner]))
    }

    pub fn unclear(name: impl Into<String>) -> Self {
        Type::UnclearReference {
            name: name.into(),
            generics: Vec::new(),
        }
    }

    /// Least common type of a set of values.
    ///
    /// Identical types collapse to one; otherwise known types form a union
    /// and any unknown member makes the result `any`.
    pub fn least_common(types: &[Type]) -> Type {
        let Some(first) = types.first() else {
            return Type::Any;
        };
        if types.iter().all(|ty| ty == first) {
            return first.clone();
        }
        if types.iter().any(Type::is_unknown) {
            return Type::Any;
        }
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            if !members.contains(ty) {
                members.push(ty.clone());
            }
        }
        Type::Union(members)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unknown => write!(f, "unknown"),
            Type::Any => write!(f, "any"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Boolean => write!(f, "boolean"),
            Type::BigInt => write!(f, "bigint"),
            Type::Null => write!(f, "null"),
            Type::Undefined => write!(f, "undefined"),
            Type::Void => write!(f, "void"),
            Type::Never => write!(f, "never"),
            Type::Class(class) => {
                write!(f, "@{}", class.signature)?;
                if !class.generics.is_empty() {
                    write!(f, "<")?;
                    write_list(f, &class.generics, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Array(element) => match element.as_ref() {
                Type::Union(_) | Type::Function(_) => write!(f, "({})[]", element),
                _ => write!(f, "{}[]", element),
            },
            Type::Tuple(elements) => {
                write!(f, "[")?;
                write_list(f, elements, ", ")?;
                write!(f, "]")
            }
            Type::Union(members) => write_list(f, members, "|"),
            Type::Function(signature) => write!(f, "{}", signature),
            Type::UnclearReference { name, generics } => {
                write!(f, "{}", name)?;
                if !generics.is_empty() {
                    write!(f, "<")?;
                    write_list(f, generics, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Alias(alias) => write!(f, "{}", alias.name),
            Type::Literal(text) => write!(f, "{}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_common_type() {
        assert_eq!(Type::least_common(&[Type::Number, Type::Number]), Type::Number);
        assert_eq!(
            Type::least_common(&[Type::Number, Type::String, Type::Number]),
            Type::Union(vec![Type::Number, Type::String])
        );
        assert_eq!(Type::least_common(&[Type::Number, Type::Unknown]), Type::Any);
        assert_eq!(Type::least_common(&[]), Type::Any);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::array_of(Type::Number).to_string(), "number[]");
        assert_eq!(
            Type::array_of(Type::Union(vec![Type::Number, Type::String])).to_string(),
            "(number|string)[]"
        );
        assert_eq!(Type::promise(Type::Void).to_string(), "@%builtin: Promise<void>");
        assert_eq!(Type::unclear("Foo").to_string(), "Foo");
    }
}
