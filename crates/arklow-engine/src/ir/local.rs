//! Method locals
//!
//! A [`Local`] is a cheap handle (id plus display name) used in operand slots.
//! Mutable facts about a local (type, const flag, declaring statement) live in
//! the method's [`LocalTable`], so refining a type never touches the
//! statements that mention it.

use super::stmt::StmtId;
use super::types::Type;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LocalId(pub u32);

impl LocalId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Local {
    pub id: LocalId,
    pub name: String,
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocalKind {
    /// Declared in source or a parameter
    Named,
    /// `%N` temporaries
    Temp,
    /// Free identifier promoted to a global
    Global,
    This,
    /// The `%closures` receiver of captured variables
    Closures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalInfo {
    pub name: String,
    pub ty: Type,
    pub is_const: bool,
    pub kind: LocalKind,
    pub decl_stmt: Option<StmtId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalTable {
    locals: Vec<LocalInfo>,
}

impl LocalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, ty: Type, kind: LocalKind) -> Local {
        let id = LocalId(self.locals.len() as u32);
        let name = name.into();
        self.locals.push(LocalInfo {
            name: name.clone(),
            ty,
            is_const: false,
            kind,
            decl_stmt: None,
        });
        Local { id, name }
    }

    pub fn get(&self, id: LocalId) -> Option<&LocalInfo> {
        self.locals.get(id.as_usize())
    }

    pub fn get_mut(&mut self, id: LocalId) -> Option<&mut LocalInfo> {
        self.locals.get_mut(id.as_usize())
    }

    pub fn ty(&self, id: LocalId) -> Type {
        self.get(id).map(|info| info.ty.clone()).unwrap_or(Type::Unknown)
    }

    pub fn set_type(&mut self, id: LocalId, ty: Type) {
        if let Some(info) = self.get_mut(id) {
            info.ty = ty;
        }
    }

    /// Handle for an existing local.
    pub fn local(&self, id: LocalId) -> Option<Local> {
        self.get(id).map(|info| Local {
            id,
            name: info.name.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalId, &LocalInfo)> {
        self.locals
            .iter()
            .enumerate()
            .map(|(i, info)| (LocalId(i as u32), info))
    }

    pub fn find(&self, name: &str) -> Option<Local> {
        self.iter()
            .find(|(_, info)| info.name == name)
            .map(|(id, info)| Local {
                id,
                name: info.name.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_refine() {
        let mut table = LocalTable::new();
        let x = table.push("x", Type::Unknown, LocalKind::Named);
        let t = table.push("%0", Type::Unknown, LocalKind::Temp);
        assert_eq!(x.id, LocalId(0));
        assert_eq!(t.id, LocalId(1));

        table.set_type(x.id, Type::Number);
        assert_eq!(table.ty(x.id), Type::Number);
        assert_eq!(table.find("%0"), Some(t));
        assert_eq!(table.len(), 2);
    }
}
