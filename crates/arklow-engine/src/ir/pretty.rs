//! Pretty-printing for IR
//!
//! Textual form used by the CLI and by tests:
//!
//! ```text
//! %0 = instanceinvoke it.<%builtin: Iterator.next()>()
//! if %1 != true
//! dummy ternary-true#0
//! ```

use super::body::MethodBody;
use super::local::LocalKind;
use super::stmt::Stmt;
use std::fmt::Write;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

/// Property access suffix: `.name` for identifier-like names, `["name"]` otherwise.
pub fn property_name(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first == '$' || first == '_' || first == '%' || unicode_xid::UnicodeXID::is_xid_start(first))
                && chars.all(|c| c == '$' || unicode_xid::UnicodeXID::is_xid_continue(c))
        }
        None => false,
    };
    if plain {
        format!(".{}", name)
    } else {
        format!("[{:?}]", name)
    }
}

impl PrettyPrint for Stmt {
    fn pretty_print(&self) -> String {
        self.kind.to_string()
    }
}

impl PrettyPrint for MethodBody {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        let named: Vec<String> = self
            .locals
            .iter()
            .filter(|(_, info)| info.kind != LocalKind::Temp)
            .map(|(_, info)| format!("{}: {}", info.name, info.ty))
            .collect();
        if !named.is_empty() {
            writeln!(output, "  ; locals: {}", named.join(", ")).unwrap();
        }
        if !self.globals.is_empty() {
            let globals: Vec<&str> = self.globals.iter().map(|g| g.name.as_str()).collect();
            writeln!(output, "  ; globals: {}", globals.join(", ")).unwrap();
        }

        for stmt in &self.stmts {
            writeln!(output, "  {}", stmt.pretty_print()).unwrap();
        }

        for (i, switch) in self.switches.iter().enumerate() {
            let cases: Vec<String> = switch
                .cases
                .iter()
                .map(|case| match case {
                    Some(test) => test.to_string(),
                    None => "default".to_string(),
                })
                .collect();
            writeln!(
                output,
                "  ; switch#{} on {}: {}",
                i,
                switch.discriminant,
                cases.join(", ")
            )
            .unwrap();
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::constant::Constant;
    use crate::ir::local::LocalTable;
    use crate::ir::stmt::{StmtId, StmtKind};
    use crate::ir::types::Type;
    use crate::ir::value::{Place, Value};

    #[test]
    fn test_property_name() {
        assert_eq!(property_name("value"), ".value");
        assert_eq!(property_name("$el"), ".$el");
        assert_eq!(property_name("名前"), ".名前");
        assert_eq!(property_name("a-b"), "[\"a-b\"]");
        assert_eq!(property_name("0"), "[\"0\"]");
    }

    #[test]
    fn test_body_pretty_print() {
        let mut locals = LocalTable::new();
        let x = locals.push("x", Type::Number, LocalKind::Named);
        let stmts = vec![Stmt::new(
            StmtId(0),
            StmtKind::Assign {
                left: Place::Local(x),
                right: Value::Constant(Constant::int(1)),
            },
            Vec::new(),
        )];
        let body = MethodBody::new(locals, stmts);
        assert_eq!(body.pretty_print(), "  ; locals: x: number\n  x = 1\n");
    }
}
