//! Token definitions for the TypeScript/ArkTS subset.
//!
//! Keywords, operators, literals and the source span attached to every token.

use crate::parser::interner::Symbol;
use std::fmt;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Declarations
    Function,
    Class,
    Type,
    Let,
    Const,
    Var,

    // Control flow
    If,
    Else,
    Switch,
    Case,
    Default,
    For,
    While,
    Do,
    Break,
    Continue,
    Return,

    // Async/Error handling
    Async,
    Await,
    Try,
    Catch,
    Finally,
    Throw,

    // Modules
    Import,
    Export,
    From,

    // OOP keywords
    New,
    This,
    Super,
    Static,
    Abstract,
    Readonly,
    Extends,
    Implements,
    Private,
    Protected,
    Public,

    // Type operators
    Typeof,
    Instanceof,
    As,
    Delete,
    Void,
    Yield,
    In,
    Of,

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    /// Digits of a bigint literal without the `n` suffix.
    BigIntLiteral(Symbol),
    StringLiteral(Symbol),
    TemplateLiteral(Vec<TemplatePart>),
    /// `/pattern/flags`, stored verbatim.
    RegexLiteral(Symbol),
    True,
    False,
    Null,

    Identifier(Symbol),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,

    // Unary
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,

    // Comparison
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Logical
    AmpAmp,
    PipePipe,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    StarStarEqual,
    SlashEqual,
    PercentEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpAmpEqual,
    PipePipeEqual,
    QuestionQuestionEqual,

    // Other
    Question,
    QuestionQuestion,
    QuestionDot,
    DotDotDot,
    Dot,
    Colon,
    Arrow,
    At,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,

    Eof,
}

/// A part of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Cooked text between interpolations.
    String(Symbol),
    /// Tokens of one `${...}` interpolation, spans absolute in the file.
    Expression(Vec<(Token, Span)>),
}

/// Source location of a token or syntax node.
///
/// `start`/`end` are byte offsets; `line`/`column` are 1-based and describe `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Smallest span covering both; line/column come from whichever starts first.
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if self.start <= other.start {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Function => "function",
            Token::Class => "class",
            Token::Type => "type",
            Token::Let => "let",
            Token::Const => "const",
            Token::Var => "var",
            Token::If => "if",
            Token::Else => "else",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Default => "default",
            Token::For => "for",
            Token::While => "while",
            Token::Do => "do",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Return => "return",
            Token::Async => "async",
            Token::Await => "await",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Finally => "finally",
            Token::Throw => "throw",
            Token::Import => "import",
            Token::Export => "export",
            Token::From => "from",
            Token::New => "new",
            Token::This => "this",
            Token::Super => "super",
            Token::Static => "static",
            Token::Abstract => "abstract",
            Token::Readonly => "readonly",
            Token::Extends => "extends",
            Token::Implements => "implements",
            Token::Private => "private",
            Token::Protected => "protected",
            Token::Public => "public",
            Token::Typeof => "typeof",
            Token::Instanceof => "instanceof",
            Token::As => "as",
            Token::Delete => "delete",
            Token::Void => "void",
            Token::Yield => "yield",
            Token::In => "in",
            Token::Of => "of",
            Token::IntLiteral(n) => return write!(f, "{}", n),
            Token::FloatLiteral(n) => return write!(f, "{}", n),
            Token::BigIntLiteral(_) => "bigint literal",
            Token::StringLiteral(_) => "string literal",
            Token::TemplateLiteral(_) => "template literal",
            Token::RegexLiteral(_) => "regular expression",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Identifier(_) => "identifier",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::StarStar => "**",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::EqualEqual => "==",
            Token::BangEqual => "!=",
            Token::EqualEqualEqual => "===",
            Token::BangEqualEqual => "!==",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::LessLess => "<<",
            Token::GreaterGreater => ">>",
            Token::GreaterGreaterGreater => ">>>",
            Token::Equal => "=",
            Token::PlusEqual => "+=",
            Token::MinusEqual => "-=",
            Token::StarEqual => "*=",
            Token::StarStarEqual => "**=",
            Token::SlashEqual => "/=",
            Token::PercentEqual => "%=",
            Token::AmpEqual => "&=",
            Token::PipeEqual => "|=",
            Token::CaretEqual => "^=",
            Token::LessLessEqual => "<<=",
            Token::GreaterGreaterEqual => ">>=",
            Token::GreaterGreaterGreaterEqual => ">>>=",
            Token::AmpAmpEqual => "&&=",
            Token::PipePipeEqual => "||=",
            Token::QuestionQuestionEqual => "??=",
            Token::Question => "?",
            Token::QuestionQuestion => "??",
            Token::QuestionDot => "?.",
            Token::DotDotDot => "...",
            Token::Dot => ".",
            Token::Colon => ":",
            Token::Arrow => "=>",
            Token::At => "@",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Eof => "EOF",
        };
        f.write_str(text)
    }
}

impl Token {
    /// Keywords that may still be used as identifiers (property names, bindings).
    pub fn is_contextual_keyword(&self) -> bool {
        matches!(
            self,
            Token::Type
                | Token::Async
                | Token::From
                | Token::Of
                | Token::As
                | Token::Static
                | Token::Abstract
                | Token::Readonly
                | Token::Private
                | Token::Protected
                | Token::Public
                | Token::Implements
        )
    }

    /// Returns true if this token ends an operand, so a following `/` is division.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Identifier(_)
                | Token::IntLiteral(_)
                | Token::FloatLiteral(_)
                | Token::BigIntLiteral(_)
                | Token::StringLiteral(_)
                | Token::TemplateLiteral(_)
                | Token::RegexLiteral(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::This
                | Token::Super
                | Token::RightParen
                | Token::RightBracket
                | Token::RightBrace
                | Token::PlusPlus
                | Token::MinusMinus
        ) || self.is_contextual_keyword()
    }

    /// Keyword text usable as a property name after `.` or in object literals.
    pub fn keyword_text(&self) -> Option<&'static str> {
        match self {
            Token::Identifier(_)
            | Token::IntLiteral(_)
            | Token::FloatLiteral(_)
            | Token::BigIntLiteral(_)
            | Token::StringLiteral(_)
            | Token::TemplateLiteral(_)
            | Token::RegexLiteral(_)
            | Token::Eof => None,
            other => {
                let text = match other {
                    Token::Function => "function",
                    Token::Class => "class",
                    Token::Type => "type",
                    Token::Let => "let",
                    Token::Const => "const",
                    Token::Var => "var",
                    Token::If => "if",
                    Token::Else => "else",
                    Token::Switch => "switch",
                    Token::Case => "case",
                    Token::Default => "default",
                    Token::For => "for",
                    Token::While => "while",
                    Token::Do => "do",
                    Token::Break => "break",
                    Token::Continue => "continue",
                    Token::Return => "return",
                    Token::Async => "async",
                    Token::Await => "await",
                    Token::Try => "try",
                    Token::Catch => "catch",
                    Token::Finally => "finally",
                    Token::Throw => "throw",
                    Token::Import => "import",
                    Token::Export => "export",
                    Token::From => "from",
                    Token::New => "new",
                    Token::This => "this",
                    Token::Super => "super",
                    Token::Static => "static",
                    Token::Abstract => "abstract",
                    Token::Readonly => "readonly",
                    Token::Extends => "extends",
                    Token::Implements => "implements",
                    Token::Private => "private",
                    Token::Protected => "protected",
                    Token::Public => "public",
                    Token::Typeof => "typeof",
                    Token::Instanceof => "instanceof",
                    Token::As => "as",
                    Token::Delete => "delete",
                    Token::Void => "void",
                    Token::Yield => "yield",
                    Token::In => "in",
                    Token::Of => "of",
                    Token::True => "true",
                    Token::False => "false",
                    Token::Null => "null",
                    _ => return None,
                };
                Some(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_keeps_first_position() {
        let a = Span::new(10, 12, 2, 5);
        let b = Span::new(3, 6, 1, 4);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 3);
        assert_eq!(merged.end, 12);
        assert_eq!((merged.line, merged.column), (1, 4));
    }

    #[test]
    fn test_regex_context() {
        assert!(Token::RightParen.ends_operand());
        assert!(!Token::LeftParen.ends_operand());
        assert!(!Token::Equal.ends_operand());
    }

    #[test]
    fn test_keyword_text() {
        assert_eq!(Token::Default.keyword_text(), Some("default"));
        assert_eq!(Token::Comma.keyword_text(), None);
    }
}
