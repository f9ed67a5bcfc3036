//! String interning for identifiers and literal text.
//!
//! The parser stores [`Symbol`]s in the AST; the lowering engine resolves them
//! back to `&str` through a shared, read-only [`Interner`].

use rustc_hash::FxHashMap;
use std::num::NonZeroU32;

/// An interned string symbol (32-bit index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    #[inline]
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1).unwrap_or(u32::MAX);
        // index + 1 is never zero
        Symbol(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN))
    }

    /// Placeholder symbol for error messages that name a token kind.
    pub const fn dummy() -> Self {
        Symbol(NonZeroU32::MIN)
    }

    #[inline]
    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// String interner that deduplicates strings.
#[derive(Clone, Default)]
pub struct Interner {
    map: FxHashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            strings: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning its symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let sym = Symbol::from_index(self.strings.len());
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), sym);
        sym
    }

    /// Look up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    /// Resolve a symbol back to its string.
    ///
    /// Symbols from another interner resolve to the empty string.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings.get(sym.index()).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner").field("len", &self.strings.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut interner = Interner::new();

        let sym1 = interner.intern("hello");
        let sym2 = interner.intern("world");
        let sym3 = interner.intern("hello");

        assert_eq!(sym1, sym3);
        assert_ne!(sym1, sym2);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_resolve_and_get() {
        let mut interner = Interner::new();
        let sym = interner.intern("value");
        assert_eq!(interner.resolve(sym), "value");
        assert_eq!(interner.get("value"), Some(sym));
        assert_eq!(interner.get("missing"), None);
    }
}
