//! Per-method symbol tables
//!
//! Scoping is flat: every name declared anywhere in a method body maps to a
//! single [`Local`], so a redeclaration in a nested block reuses it.

use crate::ir::{AliasType, Local, LocalKind, LocalTable, Type};
use rustc_hash::FxHashMap;

pub const THIS_NAME: &str = "this";
pub const CLOSURES_NAME: &str = "%closures";

#[derive(Debug, Default)]
pub struct SymbolTable {
    locals: LocalTable,
    by_name: FxHashMap<String, Local>,
    /// Free identifiers promoted to globals, in first-use order
    globals: Vec<Local>,
    global_by_name: FxHashMap<String, Local>,
    aliases: FxHashMap<String, AliasType>,
    alias_order: Vec<String>,
    temp_counter: u32,
    closures: Option<Local>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named local, reusing an existing one with the same name.
    pub fn declare(&mut self, name: &str, ty: Type) -> Local {
        if let Some(local) = self.by_name.get(name) {
            return local.clone();
        }
        let local = self.locals.push(name, ty, LocalKind::Named);
        self.by_name.insert(name.to_string(), local.clone());
        local
    }

    pub fn lookup(&self, name: &str) -> Option<&Local> {
        self.by_name.get(name)
    }

    /// A fresh `%N` temporary. Temporaries are never reused.
    pub fn temp(&mut self, ty: Type) -> Local {
        let name = format!("%{}", self.temp_counter);
        self.temp_counter += 1;
        self.locals.push(name, ty, LocalKind::Temp)
    }

    /// The global standing in for an unresolved free identifier.
    pub fn global(&mut self, name: &str) -> Local {
        if let Some(local) = self.global_by_name.get(name) {
            return local.clone();
        }
        let local = self.locals.push(name, Type::Unknown, LocalKind::Global);
        self.global_by_name.insert(name.to_string(), local.clone());
        self.globals.push(local.clone());
        local
    }

    pub fn declare_this(&mut self, ty: Type) -> Local {
        if let Some(local) = self.by_name.get(THIS_NAME) {
            return local.clone();
        }
        let local = self.locals.push(THIS_NAME, ty, LocalKind::This);
        self.by_name.insert(THIS_NAME.to_string(), local.clone());
        local
    }

    pub fn this(&self) -> Option<&Local> {
        self.by_name.get(THIS_NAME)
    }

    /// The `%closures` local, created on first use.
    pub fn closures(&mut self, ty: Type) -> Local {
        if let Some(local) = &self.closures {
            return local.clone();
        }
        let local = self.locals.push(CLOSURES_NAME, ty, LocalKind::Closures);
        self.closures = Some(local.clone());
        local
    }

    pub fn closures_used(&self) -> Option<&Local> {
        self.closures.as_ref()
    }

    pub fn define_alias(&mut self, alias: AliasType) {
        if !self.aliases.contains_key(&alias.name) {
            self.alias_order.push(alias.name.clone());
        }
        self.aliases.insert(alias.name.clone(), alias);
    }

    pub fn alias(&self, name: &str) -> Option<&AliasType> {
        self.aliases.get(name)
    }

    pub fn aliases(&self) -> &FxHashMap<String, AliasType> {
        &self.aliases
    }

    /// Names of declared locals, in declaration order.
    pub fn named(&self) -> Vec<String> {
        self.locals
            .iter()
            .filter(|(_, info)| info.kind == LocalKind::Named)
            .map(|(_, info)| info.name.clone())
            .collect()
    }

    pub fn locals(&self) -> &LocalTable {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut LocalTable {
        &mut self.locals
    }

    /// Local table, globals and aliases, handed to the method body.
    pub fn into_parts(self) -> (LocalTable, Vec<Local>, Vec<AliasType>) {
        let SymbolTable {
            locals,
            globals,
            mut aliases,
            alias_order,
            ..
        } = self;
        let aliases = alias_order
            .iter()
            .filter_map(|name| aliases.remove(name))
            .collect();
        (locals, globals, aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_scope_reuses_locals() {
        let mut symbols = SymbolTable::new();
        let a = symbols.declare("a", Type::Number);
        let again = symbols.declare("a", Type::String);
        assert_eq!(a, again);
        assert_eq!(symbols.locals().ty(a.id), Type::Number);
    }

    #[test]
    fn test_temps_are_fresh() {
        let mut symbols = SymbolTable::new();
        let t0 = symbols.temp(Type::Unknown);
        let t1 = symbols.temp(Type::Unknown);
        assert_eq!(t0.name, "%0");
        assert_eq!(t1.name, "%1");
        assert_ne!(t0.id, t1.id);
    }

    #[test]
    fn test_globals_are_lazy_and_ordered() {
        let mut symbols = SymbolTable::new();
        let console = symbols.global("console");
        let _ = symbols.global("Math");
        assert_eq!(symbols.global("console"), console);
        assert!(symbols.lookup("console").is_none());

        let (locals, globals, _) = symbols.into_parts();
        let names: Vec<_> = globals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["console", "Math"]);
        assert_eq!(locals.get(console.id).map(|i| i.kind), Some(LocalKind::Global));
    }

    #[test]
    fn test_closures_local_is_created_once() {
        let mut symbols = SymbolTable::new();
        assert!(symbols.closures_used().is_none());
        let first = symbols.closures(Type::Unknown);
        let second = symbols.closures(Type::Unknown);
        assert_eq!(first, second);
        assert!(symbols.closures_used().is_some());
    }
}
