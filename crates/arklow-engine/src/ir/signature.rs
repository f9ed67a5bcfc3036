//! Signatures naming files, classes, methods and fields

use super::types::Type;
use serde::Serialize;
use std::fmt;

/// Name of the pseudo-file holding builtin declarations.
pub const BUILTIN_FILE: &str = "%builtin";
/// Name used for declarations whose owner is not known at lowering time.
pub const UNKNOWN_NAME: &str = "%unk";
/// Default class holding a file's top-level code and functions.
pub const DEFAULT_CLASS: &str = "%dflt";
/// Method holding a file's top-level statements.
pub const DEFAULT_METHOD: &str = "%dflt";
pub const INSTANCE_INIT: &str = "%instInit";
pub const STATIC_INIT: &str = "%statInit";
pub const CONSTRUCTOR: &str = "constructor";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileSignature {
    pub project: String,
    pub file: String,
}

impl FileSignature {
    pub fn new(project: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            file: file.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_NAME, UNKNOWN_NAME)
    }
}

impl fmt::Display for FileSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}", self.project, self.file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassSignature {
    pub file: FileSignature,
    pub name: String,
}

impl ClassSignature {
    pub fn new(file: FileSignature, name: impl Into<String>) -> Self {
        Self {
            file,
            name: name.into(),
        }
    }

    /// Owner of members whose declaring class is not resolved yet.
    pub fn unknown() -> Self {
        Self::new(FileSignature::unknown(), UNKNOWN_NAME)
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_NAME
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_CLASS
    }
}

impl fmt::Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.file, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodParameter {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

impl MethodParameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            rest: false,
        }
    }
}

/// Name, parameters and return type of a method, independent of its class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodSubSignature {
    pub name: String,
    pub params: Vec<MethodParameter>,
    pub return_type: Type,
    pub is_static: bool,
}

impl MethodSubSignature {
    pub fn new(name: impl Into<String>, params: Vec<MethodParameter>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            is_static: false,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodSignature {
    pub class: ClassSignature,
    pub sub: MethodSubSignature,
}

impl MethodSignature {
    pub fn new(class: ClassSignature, sub: MethodSubSignature) -> Self {
        Self { class, sub }
    }

    /// A method known only by name: unknown owner, no parameters, unknown result.
    pub fn unresolved(class: ClassSignature, name: impl Into<String>) -> Self {
        Self::new(class, MethodSubSignature::new(name, Vec::new(), Type::Unknown))
    }

    pub fn name(&self) -> &str {
        &self.sub.name
    }

    pub fn return_type(&self) -> &Type {
        &self.sub.return_type
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}.{}(", self.class, self.sub.name)?;
        for (i, param) in self.sub.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if param.rest {
                write!(f, "...")?;
            }
            write!(f, "{}", param.ty)?;
        }
        write!(f, ")>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldSignature {
    pub class: ClassSignature,
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
}

impl FieldSignature {
    pub fn new(class: ClassSignature, name: impl Into<String>, ty: Type) -> Self {
        Self {
            class,
            name: name.into(),
            ty,
            is_static: false,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}.{}>", self.class, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_signature_display() {
        let class = ClassSignature::new(FileSignature::new("demo", BUILTIN_FILE), "Array");
        let sub = MethodSubSignature::new(
            "slice",
            vec![MethodParameter::new("start", Type::Number)],
            Type::Unknown,
        );
        let sig = MethodSignature::new(class, sub);
        assert_eq!(sig.to_string(), "<%builtin: Array.slice(number)>");
    }

    #[test]
    fn test_unknown_class() {
        let sig = MethodSignature::unresolved(ClassSignature::unknown(), "m");
        assert!(sig.class.is_unknown());
        assert_eq!(sig.to_string(), "<%unk: %unk.m()>");
    }
}
