//! Builtin signatures
//!
//! Desugarings invoke a handful of well-known operations by name: the
//! iterator protocol for `for..of`/`for..in`, `Array.prototype.slice` and
//! `concat` for spread and rest, and `toString` for template literals. The
//! lowering engine asks a [`SignatureResolver`] for these rather than
//! building them itself, so a caller with a richer SDK model can supply its
//! own declarations.

use crate::config::LowerConfig;
use crate::ir::signature::{
    ClassSignature, FieldSignature, FileSignature, MethodParameter, MethodSignature,
    MethodSubSignature, CONSTRUCTOR,
};
use crate::ir::Type;

pub const ITERATOR_FUNCTION: &str = "iterator";
pub const ITERATOR_NEXT: &str = "next";
pub const ITERATOR_RESULT_DONE: &str = "done";
pub const ITERATOR_RESULT_VALUE: &str = "value";
pub const ARRAY_SLICE: &str = "slice";
pub const ARRAY_CONCAT: &str = "concat";
pub const TO_STRING: &str = "toString";

/// Canonical signatures for operations the lowering engine synthesizes.
///
/// Implementations are shared by every worker of the lowering driver and
/// must be immutable once published.
pub trait SignatureResolver: Send + Sync {
    /// `iterable[Symbol.iterator]()`
    fn iterator_method(&self) -> MethodSignature;
    /// `iterator.next()`
    fn iterator_next(&self) -> MethodSignature;
    fn iterator_result_done(&self) -> FieldSignature;
    fn iterator_result_value(&self) -> FieldSignature;
    fn array_slice(&self) -> MethodSignature;
    fn array_concat(&self) -> MethodSignature;
    fn object_to_string(&self) -> MethodSignature;
    /// Name of the root object whose members are addressed statically
    fn prototype_root(&self) -> &str;
    fn constructor(&self, class: &ClassSignature) -> MethodSignature;
    /// A class of the builtin declarations, such as `Object` or `Array`
    fn builtin_class(&self, name: &str) -> ClassSignature;
}

/// The default resolver: declarations of a synthetic builtin file.
#[derive(Debug, Clone)]
pub struct Builtins {
    file: FileSignature,
    prototype_root: String,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::from_config(&LowerConfig::default())
    }
}

impl Builtins {
    pub fn from_config(config: &LowerConfig) -> Self {
        Self {
            file: FileSignature::new(config.builtin_file.clone(), config.builtin_file.clone()),
            prototype_root: config.prototype_root.clone(),
        }
    }

    fn method(
        &self,
        class: &str,
        name: &str,
        params: Vec<MethodParameter>,
        return_type: Type,
    ) -> MethodSignature {
        MethodSignature::new(
            self.builtin_class(class),
            MethodSubSignature::new(name, params, return_type),
        )
    }

    fn any_array(&self) -> Type {
        Type::array_of(Type::Any)
    }
}

impl SignatureResolver for Builtins {
    fn iterator_method(&self) -> MethodSignature {
        let iterator = Type::class(self.builtin_class("Iterator"));
        self.method("Iterable", ITERATOR_FUNCTION, Vec::new(), iterator)
    }

    fn iterator_next(&self) -> MethodSignature {
        let result = Type::class(self.builtin_class("IteratorResult"));
        self.method("Iterator", ITERATOR_NEXT, Vec::new(), result)
    }

    fn iterator_result_done(&self) -> FieldSignature {
        FieldSignature::new(self.builtin_class("IteratorResult"), ITERATOR_RESULT_DONE, Type::Boolean)
    }

    fn iterator_result_value(&self) -> FieldSignature {
        FieldSignature::new(self.builtin_class("IteratorResult"), ITERATOR_RESULT_VALUE, Type::Unknown)
    }

    fn array_slice(&self) -> MethodSignature {
        let mut start = MethodParameter::new("start", Type::Number);
        start.optional = true;
        self.method("Array", ARRAY_SLICE, vec![start], self.any_array())
    }

    fn array_concat(&self) -> MethodSignature {
        let mut items = MethodParameter::new("items", self.any_array());
        items.rest = true;
        self.method("Array", ARRAY_CONCAT, vec![items], self.any_array())
    }

    fn object_to_string(&self) -> MethodSignature {
        self.method("Object", TO_STRING, Vec::new(), Type::String)
    }

    fn prototype_root(&self) -> &str {
        &self.prototype_root
    }

    fn constructor(&self, class: &ClassSignature) -> MethodSignature {
        MethodSignature::new(
            class.clone(),
            MethodSubSignature::new(CONSTRUCTOR, Vec::new(), Type::Void),
        )
    }

    fn builtin_class(&self, name: &str) -> ClassSignature {
        ClassSignature::new(self.file.clone(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_signatures() {
        let builtins = Builtins::default();
        assert_eq!(
            builtins.iterator_next().to_string(),
            "<%builtin: Iterator.next()>"
        );
        assert_eq!(
            builtins.array_slice().to_string(),
            "<%builtin: Array.slice(number)>"
        );
        assert_eq!(
            builtins.array_concat().to_string(),
            "<%builtin: Array.concat(...any[])>"
        );
        assert_eq!(builtins.iterator_result_done().ty, Type::Boolean);
        assert_eq!(builtins.prototype_root(), "Object");
    }

    #[test]
    fn test_configured_builtin_file() {
        let config = LowerConfig {
            builtin_file: "lib.es5.d.ts".to_string(),
            ..LowerConfig::default()
        };
        let builtins = Builtins::from_config(&config);
        assert_eq!(builtins.object_to_string().to_string(), "<lib.es5.d.ts: Object.toString()>");
    }
}
