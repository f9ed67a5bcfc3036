//! Constant values
//!
//! Numeric constants are interned process-wide: lowering the same literal
//! text twice yields the same [`NumberConstant`] instance, so identity
//! comparisons ([`NumberConstant::is_same`]) are meaningful across methods
//! and across threads.

use super::types::Type;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

static NUMBER_CACHE: Lazy<DashMap<String, NumberConstant>> = Lazy::new(DashMap::new);

#[derive(Debug)]
pub struct NumberLit {
    pub text: String,
    pub value: f64,
}

/// Interned numeric constant.
#[derive(Debug, Clone)]
pub struct NumberConstant(Arc<NumberLit>);

impl NumberConstant {
    fn intern(text: String, value: f64) -> Self {
        NUMBER_CACHE
            .entry(text.clone())
            .or_insert_with(|| NumberConstant(Arc::new(NumberLit { text, value })))
            .clone()
    }

    pub fn from_int(value: i64) -> Self {
        Self::intern(value.to_string(), value as f64)
    }

    pub fn from_float(value: f64) -> Self {
        if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
            return Self::from_int(value as i64);
        }
        Self::intern(format!("{}", value), value)
    }

    pub fn text(&self) -> &str {
        &self.0.text
    }

    pub fn value(&self) -> f64 {
        self.0.value
    }

    /// True when both handles point at the same interned literal.
    pub fn is_same(&self, other: &NumberConstant) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for NumberConstant {
    fn eq(&self, other: &Self) -> bool {
        self.0.text == other.0.text
    }
}

impl Eq for NumberConstant {}

impl Hash for NumberConstant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.text.hash(state);
    }
}

impl Serialize for NumberConstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Constant {
    Number(NumberConstant),
    String(String),
    /// Digits without the `n` suffix
    BigInt(String),
    Boolean(bool),
    /// Full literal text including slashes and flags
    Regex(String),
    Null,
    Undefined,
}

impl Constant {
    pub fn int(value: i64) -> Self {
        Constant::Number(NumberConstant::from_int(value))
    }

    pub fn float(value: f64) -> Self {
        Constant::Number(NumberConstant::from_float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Constant::String(value.into())
    }

    pub fn ty(&self) -> Type {
        match self {
            Constant::Number(_) => Type::Number,
            Constant::String(_) => Type::String,
            Constant::BigInt(_) => Type::BigInt,
            Constant::Boolean(_) => Type::Boolean,
            Constant::Regex(_) => Type::unclear("RegExp"),
            Constant::Null => Type::Null,
            Constant::Undefined => Type::Undefined,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Number(n) => write!(f, "{}", n.text()),
            Constant::String(s) => {
                write!(f, "'")?;
                for ch in s.chars() {
                    match ch {
                        '\'' => write!(f, "\\'")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "'")
            }
            Constant::BigInt(digits) => write!(f, "{}n", digits),
            Constant::Boolean(b) => write!(f, "{}", b),
            Constant::Regex(text) => write!(f, "{}", text),
            Constant::Null => write!(f, "null"),
            Constant::Undefined => write!(f, "undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_interning() {
        let a = NumberConstant::from_int(42);
        let b = NumberConstant::from_int(42);
        assert!(a.is_same(&b));
        assert_eq!(a, b);

        let c = NumberConstant::from_float(42.0);
        assert!(a.is_same(&c));

        let d = NumberConstant::from_float(0.5);
        assert_eq!(d.text(), "0.5");
        assert!(!a.is_same(&d));
    }

    #[test]
    fn test_interning_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| NumberConstant::from_int(7_777)))
            .collect();
        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0].is_same(&w[1])));
    }

    #[test]
    fn test_display() {
        assert_eq!(Constant::string("it's").to_string(), "'it\\'s'");
        assert_eq!(Constant::BigInt("10".into()).to_string(), "10n");
        assert_eq!(Constant::int(-3).to_string(), "-3");
        assert_eq!(Constant::Undefined.ty(), Type::Undefined);
    }
}
