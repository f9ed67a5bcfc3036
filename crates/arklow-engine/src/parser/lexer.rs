//! Lexer for the TypeScript/ArkTS subset.
//!
//! Regular tokens are produced by a logos-generated automaton. Whitespace,
//! comments, template literals and regular-expression literals are handled by
//! hand around it, because each of them needs context logos does not have
//! (line tracking, nested interpolations, the previous token).

use crate::parser::interner::Interner;
use crate::parser::token::{Span, TemplatePart, Token};
use logos::Logos;

/// Logos-based token enum, converted to [`Token`] after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    // Keywords (must come before identifiers)
    #[token("function")]
    Function,
    #[token("class")]
    Class,
    #[token("type")]
    Type,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,
    #[token("import")]
    Import,
    #[token("export")]
    Export,
    #[token("from")]
    From,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("static")]
    Static,
    #[token("abstract")]
    Abstract,
    #[token("readonly")]
    Readonly,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("typeof")]
    Typeof,
    #[token("instanceof")]
    Instanceof,
    #[token("as")]
    As,
    #[token("delete")]
    Delete,
    #[token("void")]
    Void,
    #[token("yield")]
    Yield,
    #[token("in")]
    In,
    #[token("of")]
    Of,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Identifiers (must come after keywords)
    #[regex(r"[\p{XID_Start}_$][\p{XID_Continue}$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Numbers with numeric separator support
    #[regex(r"0[xX][0-9a-fA-F]+(_[0-9a-fA-F]+)*", parse_hex)]
    #[regex(r"0[bB][01]+(_[01]+)*", parse_binary)]
    #[regex(r"0[oO][0-7]+(_[0-7]+)*", parse_octal)]
    #[regex(r"[0-9]+(_[0-9]+)*", parse_int)]
    IntLiteral(Numeric),

    #[regex(r"[0-9]+(_[0-9]+)*\.[0-9]*(_[0-9]+)*([eE][+-]?[0-9]+(_[0-9]+)*)?", parse_float)]
    #[regex(r"[0-9]+(_[0-9]+)*[eE][+-]?[0-9]+(_[0-9]+)*", parse_float)]
    #[regex(r"\.[0-9]+(_[0-9]+)*([eE][+-]?[0-9]+(_[0-9]+)*)?", parse_float)]
    FloatLiteral(f64),

    #[regex(r"[0-9]+(_[0-9]+)*n", parse_bigint)]
    #[regex(r"0[xX][0-9a-fA-F]+(_[0-9a-fA-F]+)*n", parse_bigint)]
    BigIntLiteral(String),

    // Strings
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    #[regex(r"'([^'\\\n]|\\.)*'", parse_string)]
    StringLiteral(String),

    // Operators (longer first)
    #[token("===")]
    EqualEqualEqual,
    #[token("!==")]
    BangEqualEqual,
    #[token(">>>=")]
    GreaterGreaterGreaterEqual,
    #[token(">>>")]
    GreaterGreaterGreater,
    #[token("**=")]
    StarStarEqual,
    #[token("**")]
    StarStar,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("&&=")]
    AmpAmpEqual,
    #[token("||=")]
    PipePipeEqual,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("<<=")]
    LessLessEqual,
    #[token(">>=")]
    GreaterGreaterEqual,
    #[token("<<")]
    LessLess,
    #[token(">>")]
    GreaterGreater,
    #[token("?.")]
    QuestionDot,
    #[token("??=")]
    QuestionQuestionEqual,
    #[token("??")]
    QuestionQuestion,
    #[token("=>")]
    Arrow,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("*=")]
    StarEqual,
    #[token("/=")]
    SlashEqual,
    #[token("%=")]
    PercentEqual,
    #[token("&=")]
    AmpEqual,
    #[token("|=")]
    PipeEqual,
    #[token("^=")]
    CaretEqual,

    // Single-character tokens
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("=")]
    Equal,
    #[token("?")]
    Question,
    #[token("...")]
    DotDotDot,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("@")]
    At,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
}

/// An integer literal, or its `f64` value when it does not fit in `i64`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Int(i64),
    Float(f64),
}

fn parse_radix(digits: &str, radix: u32) -> Option<Numeric> {
    let digits = digits.replace('_', "");
    if let Ok(n) = i64::from_str_radix(&digits, radix) {
        return Some(Numeric::Int(n));
    }
    if let Ok(n) = u128::from_str_radix(&digits, radix) {
        return Some(Numeric::Float(n as f64));
    }
    digits
        .chars()
        .try_fold(0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .map(Numeric::Float)
}

fn parse_hex(lex: &mut logos::Lexer<LogosToken>) -> Option<Numeric> {
    parse_radix(&lex.slice()[2..], 16)
}

fn parse_binary(lex: &mut logos::Lexer<LogosToken>) -> Option<Numeric> {
    parse_radix(&lex.slice()[2..], 2)
}

fn parse_octal(lex: &mut logos::Lexer<LogosToken>) -> Option<Numeric> {
    parse_radix(&lex.slice()[2..], 8)
}

fn parse_int(lex: &mut logos::Lexer<LogosToken>) -> Option<Numeric> {
    let digits = lex.slice().replace('_', "");
    match digits.parse::<i64>() {
        Ok(n) => Some(Numeric::Int(n)),
        Err(_) => digits.parse::<f64>().ok().map(Numeric::Float),
    }
}

fn parse_float(lex: &mut logos::Lexer<LogosToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_bigint(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    Some(s[..s.len() - 1].replace('_', ""))
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    Some(unescape_string(&s[1..s.len() - 1]))
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('v') => result.push('\u{b}'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let mut hex = String::new();
                if chars.peek() == Some(&'{') {
                    chars.next();
                    while let Some(&ch) = chars.peek() {
                        chars.next();
                        if ch == '}' {
                            break;
                        }
                        hex.push(ch);
                    }
                } else {
                    for _ in 0..4 {
                        match chars.peek() {
                            Some(ch) if ch.is_ascii_hexdigit() => {
                                hex.push(*ch);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => result.push(ch),
                    None => {
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some('x') => {
                let mut hex = String::new();
                for _ in 0..2 {
                    match chars.peek() {
                        Some(ch) if ch.is_ascii_hexdigit() => {
                            hex.push(*ch);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if hex.len() == 2 => result.push(byte as char),
                    _ => {
                        result.push_str("\\x");
                        result.push_str(&hex);
                    }
                }
            }
            // Line continuation
            Some('\n') => {}
            Some(other) => result.push(other),
            None => break,
        }
    }

    result
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { char: char, span: Span },
    UnterminatedTemplate { span: Span },
    UnterminatedRegex { span: Span },
    UnterminatedComment { span: Span },
}

impl LexError {
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedTemplate { span }
            | LexError::UnterminatedRegex { span }
            | LexError::UnterminatedComment { span } => span,
        }
    }

    pub fn description(&self) -> String {
        match self {
            LexError::UnexpectedCharacter { char, .. } => {
                format!("Unexpected character '{}'", char)
            }
            LexError::UnterminatedTemplate { .. } => "Unterminated template literal".to_string(),
            LexError::UnterminatedRegex { .. } => {
                "Unterminated regular expression literal".to_string()
            }
            LexError::UnterminatedComment { .. } => "Unterminated block comment".to_string(),
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            LexError::UnterminatedTemplate { .. } => {
                Some("Add a closing backtick (`) to terminate the template literal".to_string())
            }
            LexError::UnterminatedComment { .. } => {
                Some("Add `*/` to close the comment".to_string())
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.description(),
            self.span().line,
            self.span().column
        )
    }
}

impl std::error::Error for LexError {}

/// Cursor into the source: byte offset plus 1-based line/column.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    pos: usize,
    line: u32,
    column: u32,
}

impl Cursor {
    fn advance_over(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += text.len();
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
    errors: Vec<LexError>,
    interner: Interner,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_interner(source, Interner::with_capacity(256))
    }

    /// Lex with an existing interner, e.g. one shared by several files.
    pub fn with_interner(source: &'a str, interner: Interner) -> Self {
        Self {
            source,
            errors: Vec::new(),
            interner,
        }
    }

    pub fn tokenize(mut self) -> Result<(Vec<(Token, Span)>, Interner), Vec<LexError>> {
        let start = Cursor {
            pos: 0,
            line: 1,
            column: 1,
        };
        let (mut tokens, end) = self.lex_range(start, self.source.len());
        tokens.push((Token::Eof, Span::new(end.pos, end.pos, end.line, end.column)));

        if self.errors.is_empty() {
            Ok((tokens, self.interner))
        } else {
            Err(self.errors)
        }
    }

    /// Lex `source[cursor.pos..limit]`, returning the tokens and the final cursor.
    fn lex_range(&mut self, mut cursor: Cursor, limit: usize) -> (Vec<(Token, Span)>, Cursor) {
        let mut tokens: Vec<(Token, Span)> = Vec::new();

        while cursor.pos < limit {
            if !self.skip_trivia(&mut cursor, limit) {
                break;
            }
            if cursor.pos >= limit {
                break;
            }

            let bytes = self.source.as_bytes();
            let start = cursor;

            if bytes[cursor.pos] == b'`' {
                match self.lex_template(cursor, limit) {
                    Ok((parts, end)) => {
                        let span = Span::new(start.pos, end.pos, start.line, start.column);
                        tokens.push((Token::TemplateLiteral(parts), span));
                        cursor = end;
                    }
                    Err(err) => {
                        self.errors.push(err);
                        let rest = &self.source[cursor.pos..limit];
                        cursor.advance_over(rest);
                    }
                }
                continue;
            }

            let regex_allowed = tokens.last().map_or(true, |(t, _)| !t.ends_operand());
            if bytes[cursor.pos] == b'/' && regex_allowed {
                match self.scan_regex(cursor.pos, limit) {
                    Some(end) => {
                        let text = &self.source[cursor.pos..end];
                        let sym = self.interner.intern(text);
                        cursor.advance_over(text);
                        let span = Span::new(start.pos, end, start.line, start.column);
                        tokens.push((Token::RegexLiteral(sym), span));
                    }
                    None => {
                        let span = Span::new(start.pos, limit, start.line, start.column);
                        self.errors.push(LexError::UnterminatedRegex { span });
                        let rest = &self.source[cursor.pos..limit];
                        cursor.advance_over(rest);
                    }
                }
                continue;
            }

            let mut logos_lexer = LogosToken::lexer(&self.source[cursor.pos..limit]);
            let Some(result) = logos_lexer.next() else {
                break;
            };
            let range = logos_lexer.span();
            let abs_start = cursor.pos + range.start;
            let abs_end = cursor.pos + range.end;

            // logos may have skipped whitespace before the token
            cursor.advance_over(&self.source[cursor.pos..abs_start]);
            let span = Span::new(abs_start, abs_end, cursor.line, cursor.column);

            match result {
                Ok(logos_token) => {
                    let token = self.convert_token(logos_token);
                    tokens.push((token, span));
                }
                Err(_) => {
                    let char = self.source[abs_start..].chars().next().unwrap_or('\0');
                    self.errors.push(LexError::UnexpectedCharacter { char, span });
                }
            }
            cursor.advance_over(&self.source[abs_start..abs_end]);
        }

        (tokens, cursor)
    }

    /// Skip whitespace and comments. Returns false when the range is exhausted
    /// by an unterminated comment.
    fn skip_trivia(&mut self, cursor: &mut Cursor, limit: usize) -> bool {
        let bytes = self.source.as_bytes();
        while cursor.pos < limit {
            match bytes[cursor.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    let end = cursor.pos + 1;
                    cursor.advance_over(&self.source[cursor.pos..end]);
                }
                b'/' if cursor.pos + 1 < limit && bytes[cursor.pos + 1] == b'/' => {
                    let end = self.source[cursor.pos..limit]
                        .find('\n')
                        .map_or(limit, |i| cursor.pos + i);
                    cursor.advance_over(&self.source[cursor.pos..end]);
                }
                b'/' if cursor.pos + 1 < limit && bytes[cursor.pos + 1] == b'*' => {
                    let start = *cursor;
                    match self.source[cursor.pos + 2..limit].find("*/") {
                        Some(i) => {
                            let end = cursor.pos + 2 + i + 2;
                            cursor.advance_over(&self.source[cursor.pos..end]);
                        }
                        None => {
                            let span = Span::new(start.pos, limit, start.line, start.column);
                            self.errors.push(LexError::UnterminatedComment { span });
                            cursor.advance_over(&self.source[cursor.pos..limit]);
                            return false;
                        }
                    }
                }
                _ => break,
            }
        }
        true
    }

    /// Find the end of a regex literal starting at `start` (which holds `/`).
    fn scan_regex(&self, start: usize, limit: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut pos = start + 1;
        let mut in_class = false;
        while pos < limit {
            match bytes[pos] {
                b'\\' => pos += 2,
                b'\n' => return None,
                b'[' => {
                    in_class = true;
                    pos += 1;
                }
                b']' => {
                    in_class = false;
                    pos += 1;
                }
                b'/' if !in_class => {
                    pos += 1;
                    while pos < limit && bytes[pos].is_ascii_alphabetic() {
                        pos += 1;
                    }
                    return Some(pos);
                }
                _ => pos += 1,
            }
        }
        None
    }

    fn convert_token(&mut self, logos_token: LogosToken) -> Token {
        match logos_token {
            LogosToken::Function => Token::Function,
            LogosToken::Class => Token::Class,
            LogosToken::Type => Token::Type,
            LogosToken::Let => Token::Let,
            LogosToken::Const => Token::Const,
            LogosToken::Var => Token::Var,
            LogosToken::If => Token::If,
            LogosToken::Else => Token::Else,
            LogosToken::Switch => Token::Switch,
            LogosToken::Case => Token::Case,
            LogosToken::Default => Token::Default,
            LogosToken::For => Token::For,
            LogosToken::While => Token::While,
            LogosToken::Do => Token::Do,
            LogosToken::Break => Token::Break,
            LogosToken::Continue => Token::Continue,
            LogosToken::Return => Token::Return,
            LogosToken::Async => Token::Async,
            LogosToken::Await => Token::Await,
            LogosToken::Try => Token::Try,
            LogosToken::Catch => Token::Catch,
            LogosToken::Finally => Token::Finally,
            LogosToken::Throw => Token::Throw,
            LogosToken::Import => Token::Import,
            LogosToken::Export => Token::Export,
            LogosToken::From => Token::From,
            LogosToken::New => Token::New,
            LogosToken::This => Token::This,
            LogosToken::Super => Token::Super,
            LogosToken::Static => Token::Static,
            LogosToken::Abstract => Token::Abstract,
            LogosToken::Readonly => Token::Readonly,
            LogosToken::Extends => Token::Extends,
            LogosToken::Implements => Token::Implements,
            LogosToken::Private => Token::Private,
            LogosToken::Protected => Token::Protected,
            LogosToken::Public => Token::Public,
            LogosToken::Typeof => Token::Typeof,
            LogosToken::Instanceof => Token::Instanceof,
            LogosToken::As => Token::As,
            LogosToken::Delete => Token::Delete,
            LogosToken::Void => Token::Void,
            LogosToken::Yield => Token::Yield,
            LogosToken::In => Token::In,
            LogosToken::Of => Token::Of,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Null => Token::Null,
            LogosToken::Identifier(s) => Token::Identifier(self.interner.intern(&s)),
            LogosToken::IntLiteral(Numeric::Int(n)) => Token::IntLiteral(n),
            LogosToken::IntLiteral(Numeric::Float(n)) => Token::FloatLiteral(n),
            LogosToken::FloatLiteral(n) => Token::FloatLiteral(n),
            LogosToken::BigIntLiteral(s) => Token::BigIntLiteral(self.interner.intern(&s)),
            LogosToken::StringLiteral(s) => Token::StringLiteral(self.interner.intern(&s)),
            LogosToken::EqualEqualEqual => Token::EqualEqualEqual,
            LogosToken::BangEqualEqual => Token::BangEqualEqual,
            LogosToken::GreaterGreaterGreaterEqual => Token::GreaterGreaterGreaterEqual,
            LogosToken::GreaterGreaterGreater => Token::GreaterGreaterGreater,
            LogosToken::StarStarEqual => Token::StarStarEqual,
            LogosToken::StarStar => Token::StarStar,
            LogosToken::EqualEqual => Token::EqualEqual,
            LogosToken::BangEqual => Token::BangEqual,
            LogosToken::LessEqual => Token::LessEqual,
            LogosToken::GreaterEqual => Token::GreaterEqual,
            LogosToken::AmpAmpEqual => Token::AmpAmpEqual,
            LogosToken::PipePipeEqual => Token::PipePipeEqual,
            LogosToken::AmpAmp => Token::AmpAmp,
            LogosToken::PipePipe => Token::PipePipe,
            LogosToken::PlusPlus => Token::PlusPlus,
            LogosToken::MinusMinus => Token::MinusMinus,
            LogosToken::LessLessEqual => Token::LessLessEqual,
            LogosToken::GreaterGreaterEqual => Token::GreaterGreaterEqual,
            LogosToken::LessLess => Token::LessLess,
            LogosToken::GreaterGreater => Token::GreaterGreater,
            LogosToken::QuestionDot => Token::QuestionDot,
            LogosToken::QuestionQuestionEqual => Token::QuestionQuestionEqual,
            LogosToken::QuestionQuestion => Token::QuestionQuestion,
            LogosToken::Arrow => Token::Arrow,
            LogosToken::PlusEqual => Token::PlusEqual,
            LogosToken::MinusEqual => Token::MinusEqual,
            LogosToken::StarEqual => Token::StarEqual,
            LogosToken::SlashEqual => Token::SlashEqual,
            LogosToken::PercentEqual => Token::PercentEqual,
            LogosToken::AmpEqual => Token::AmpEqual,
            LogosToken::PipeEqual => Token::PipeEqual,
            LogosToken::CaretEqual => Token::CaretEqual,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::Bang => Token::Bang,
            LogosToken::Tilde => Token::Tilde,
            LogosToken::Less => Token::Less,
            LogosToken::Greater => Token::Greater,
            LogosToken::Amp => Token::Amp,
            LogosToken::Pipe => Token::Pipe,
            LogosToken::Caret => Token::Caret,
            LogosToken::Equal => Token::Equal,
            LogosToken::Question => Token::Question,
            LogosToken::DotDotDot => Token::DotDotDot,
            LogosToken::Dot => Token::Dot,
            LogosToken::Colon => Token::Colon,
            LogosToken::At => Token::At,
            LogosToken::LeftParen => Token::LeftParen,
            LogosToken::RightParen => Token::RightParen,
            LogosToken::LeftBrace => Token::LeftBrace,
            LogosToken::RightBrace => Token::RightBrace,
            LogosToken::LeftBracket => Token::LeftBracket,
            LogosToken::RightBracket => Token::RightBracket,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Comma => Token::Comma,
            // Whitespace is skipped by its callback and never yielded
            LogosToken::Whitespace => Token::Eof,
        }
    }

    /// Lex a template literal whose opening backtick is at `open.pos`.
    fn lex_template(
        &mut self,
        open: Cursor,
        limit: usize,
    ) -> Result<(Vec<TemplatePart>, Cursor), LexError> {
        let bytes = self.source.as_bytes();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut cursor = open;
        cursor.advance_over("`");

        while cursor.pos < limit {
            match bytes[cursor.pos] {
                b'`' => {
                    if !text.is_empty() {
                        parts.push(TemplatePart::String(self.interner.intern(&text)));
                    }
                    cursor.advance_over("`");
                    return Ok((parts, cursor));
                }
                b'\\' if cursor.pos + 1 < limit => {
                    let esc_end = self.escape_end(cursor.pos, limit);
                    let escape = &self.source[cursor.pos..esc_end];
                    text.push_str(&unescape_string(escape));
                    cursor.advance_over(escape);
                }
                b'$' if cursor.pos + 1 < limit && bytes[cursor.pos + 1] == b'{' => {
                    if !text.is_empty() {
                        parts.push(TemplatePart::String(self.interner.intern(&text)));
                        text.clear();
                    }
                    let interp_open = cursor;
                    cursor.advance_over("${");
                    let close = self.matching_brace(cursor.pos, limit).ok_or_else(|| {
                        LexError::UnterminatedTemplate {
                            span: Span::new(
                                interp_open.pos,
                                limit,
                                interp_open.line,
                                interp_open.column,
                            ),
                        }
                    })?;
                    let (inner, end) = self.lex_range(cursor, close);
                    parts.push(TemplatePart::Expression(inner));
                    cursor = end;
                    cursor.advance_over(&self.source[cursor.pos..close]);
                    cursor.advance_over("}");
                }
                _ => {
                    let ch_len = self.source[cursor.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    let piece = &self.source[cursor.pos..cursor.pos + ch_len];
                    text.push_str(piece);
                    cursor.advance_over(piece);
                }
            }
        }

        Err(LexError::UnterminatedTemplate {
            span: Span::new(open.pos, limit, open.line, open.column),
        })
    }

    /// End offset of the escape sequence starting at `pos` (a backslash).
    fn escape_end(&self, pos: usize, limit: usize) -> usize {
        let rest = &self.source[pos + 1..limit];
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, 'u')) if rest[1..].starts_with('{') => rest
                .find('}')
                .map_or(limit, |i| pos + 1 + i + 1),
            Some((_, 'u')) => (pos + 6).min(limit),
            Some((_, 'x')) => (pos + 4).min(limit),
            Some((_, c)) => pos + 1 + c.len_utf8(),
            None => limit,
        }
    }

    /// Offset of the `}` closing an interpolation whose body starts at `pos`.
    fn matching_brace(&self, mut pos: usize, limit: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut depth = 1usize;
        while pos < limit {
            match bytes[pos] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(pos);
                    }
                }
                quote @ (b'"' | b'\'' | b'`') => {
                    pos += 1;
                    while pos < limit && bytes[pos] != quote {
                        if bytes[pos] == b'\\' {
                            pos += 1;
                        }
                        pos += 1;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Interner) {
        let (tokens, interner) = Lexer::new(source).tokenize().expect("should lex");
        (tokens.into_iter().map(|(t, _)| t).collect(), interner)
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let (tokens, interner) = lex("let value = this.x;");
        assert_eq!(tokens[0], Token::Let);
        match &tokens[1] {
            Token::Identifier(sym) => assert_eq!(interner.resolve(*sym), "value"),
            other => panic!("expected identifier, got {:?}", other),
        }
        assert_eq!(tokens[3], Token::This);
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }

    #[test]
    fn test_numbers() {
        let (tokens, interner) = lex("1_000 0x1F 2.5 .5 12n");
        assert_eq!(tokens[0], Token::IntLiteral(1000));
        assert_eq!(tokens[1], Token::IntLiteral(31));
        assert_eq!(tokens[2], Token::FloatLiteral(2.5));
        assert_eq!(tokens[3], Token::FloatLiteral(0.5));
        match &tokens[4] {
            Token::BigIntLiteral(sym) => assert_eq!(interner.resolve(*sym), "12"),
            other => panic!("expected bigint, got {:?}", other),
        }
    }

    #[test]
    fn test_integers_past_i64_become_floats() {
        let (tokens, _) = lex("0xFFFFFFFFFFFFFFFFFF 18446744073709551616 9223372036854775807");
        assert_eq!(tokens[0], Token::FloatLiteral(2f64.powi(72)));
        assert_eq!(tokens[1], Token::FloatLiteral(2f64.powi(64)));
        assert_eq!(tokens[2], Token::IntLiteral(i64::MAX));
    }

    #[test]
    fn test_unicode_identifiers() {
        let (tokens, interner) = lex("let café = 1; let 名字 = café;");
        let names: Vec<&str> = tokens
            .iter()
            .filter_map(|token| match token {
                Token::Identifier(sym) => Some(interner.resolve(*sym)),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["café", "名字", "café"]);
    }

    #[test]
    fn test_comments_track_lines() {
        let source = "// comment\n/* block\n */ x";
        let (tokens, _) = Lexer::new(source).tokenize().expect("should lex");
        let (token, span) = &tokens[0];
        assert!(matches!(token, Token::Identifier(_)));
        assert_eq!(span.line, 3);
        assert_eq!(span.column, 5);
    }

    #[test]
    fn test_template_with_interpolation() {
        let source = "`a${x + 1}b`";
        let (tokens, interner) = Lexer::new(source).tokenize().expect("should lex");
        let Token::TemplateLiteral(parts) = &tokens[0].0 else {
            panic!("expected template, got {:?}", tokens[0].0);
        };
        assert_eq!(parts.len(), 3);
        match &parts[0] {
            TemplatePart::String(sym) => assert_eq!(interner.resolve(*sym), "a"),
            other => panic!("unexpected part {:?}", other),
        }
        match &parts[1] {
            TemplatePart::Expression(tokens) => {
                assert_eq!(tokens.len(), 3);
                // spans are absolute in the file
                assert_eq!(tokens[0].1.start, 3);
                assert_eq!(tokens[0].1.column, 4);
            }
            other => panic!("unexpected part {:?}", other),
        }
    }

    #[test]
    fn test_regex_versus_division() {
        let (tokens, interner) = lex("x = /ab+c/gi; y = a / b;");
        match &tokens[2] {
            Token::RegexLiteral(sym) => assert_eq!(interner.resolve(*sym), "/ab+c/gi"),
            other => panic!("expected regex, got {:?}", other),
        }
        assert!(tokens.contains(&Token::Slash));
    }

    #[test]
    fn test_string_escapes() {
        let (tokens, interner) = lex(r#""a\nb" 'cA'"#);
        match (&tokens[0], &tokens[1]) {
            (Token::StringLiteral(a), Token::StringLiteral(b)) => {
                assert_eq!(interner.resolve(*a), "a\nb");
                assert_eq!(interner.resolve(*b), "cA");
            }
            other => panic!("unexpected tokens {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_character() {
        let errors = Lexer::new("let # = 1").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnexpectedCharacter { char: '#', .. }));
    }
}
