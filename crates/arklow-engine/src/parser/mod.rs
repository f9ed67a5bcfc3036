//! Front end for the TypeScript/ArkTS subset understood by the engine.
//!
//! Lexing is done with `logos`, parsing by recursive descent over the
//! pre-tokenized stream. Identifiers and literal text are interned; the
//! resulting [`Interner`] travels with the AST into the lowering engine.
//!
//! ```ignore
//! use arklow_engine::parser::Parser;
//!
//! let (module, interner) = Parser::new("let x = a + 1;")?.parse()?;
//! ```

pub mod ast;
pub mod error;
pub mod interner;
pub mod lexer;
pub mod parser;
pub mod precedence;
pub mod source;
pub mod token;

pub use error::{ParseError, ParseErrorKind};
pub use interner::{Interner, Symbol};
pub use lexer::{LexError, Lexer};
pub use parser::Parser;
pub use source::SourceFile;
pub use token::{Span, TemplatePart, Token};
