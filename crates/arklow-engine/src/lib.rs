//! Arklow engine
//!
//! Static-analysis front end for TypeScript/ArkTS sources. The engine parses a
//! file, builds a small semantic model (default class, classes, methods) and
//! lowers every method body into a flat three-address IR that later passes
//! (CFG construction, type inference, call graphs, dataflow) consume.
//!
//! # Pipeline
//!
//! ```text
//! source ─► parser ─► ast ─► model builder ─► lower (per method) ─► ir
//! ```
//!
//! - [`parser`]: lexer, interner, AST and recursive-descent parser
//! - [`ir`]: values, statements, types, signatures and the pretty printer
//! - [`lower`]: the value and statement lowering engines
//! - [`model`]: file/class/method model, declaration sink and parallel driver
//! - [`builtins`]: canonical signatures used by desugarings

pub mod builtins;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod ir;
pub mod lower;
pub mod model;
pub mod parser;

pub use builtins::{Builtins, SignatureResolver};
pub use config::{ArklowConfig, LowerConfig};
pub use error::LowerError;
pub use ir::{MethodBody, PrettyPrint, Stmt, StmtKind, Value};
pub use lower::Lowerer;
pub use model::{lower_file, lower_source, FileModel};
pub use parser::{Interner, Parser, SourceFile};
