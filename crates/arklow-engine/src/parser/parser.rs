//! Recursive descent parser.
//!
//! Transforms the token stream from the lexer into an AST. Ambiguous
//! constructs (arrow functions against parenthesized expressions, function
//! types against parenthesized types) are resolved by bounded backtracking:
//! the parser records its position, tries one reading and rewinds on failure.

pub mod expr;
pub mod pattern;
pub mod stmt;
pub mod types;

use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::interner::{Interner, Symbol};
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};

/// Maximum nesting depth for statements and expressions.
pub const MAX_PARSE_DEPTH: usize = 512;

pub struct Parser {
    /// Pre-tokenized input
    tokens: Vec<(Token, Span)>,

    /// Current position in token stream
    pos: usize,

    /// Accumulated parse errors (allows continuing after errors)
    errors: Vec<ParseError>,

    interner: Interner,

    /// Current nesting depth, checked against [`MAX_PARSE_DEPTH`]
    pub(crate) depth: usize,

    /// False while parsing a `for (...)` head, where `in` is a keyword
    pub(crate) allow_in: bool,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, Vec<LexError>> {
        Self::with_interner(source, Interner::with_capacity(256))
    }

    pub fn with_interner(source: &str, interner: Interner) -> Result<Self, Vec<LexError>> {
        let (tokens, interner) = Lexer::with_interner(source, interner).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            interner,
            depth: 0,
            allow_in: true,
        })
    }

    /// Parse the entire source file into a Module AST.
    ///
    /// Returns the module together with the interner that resolves its
    /// symbols, or every error collected while resynchronizing.
    pub fn parse(mut self) -> Result<(Module, Interner), Vec<ParseError>> {
        let start_span = self.current_span();
        let mut statements = Vec::new();

        while !self.at_eof() {
            let before = self.pos;
            match stmt::parse_statement(&mut self) {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.sync_to_statement_boundary(before);
                }
            }
        }

        let span = match statements.last() {
            Some(last) => self.combine_spans(&start_span, last.span()),
            None => start_span,
        };

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        Ok((Module::new(statements, span), self.interner))
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].1
    }

    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(1)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// Advance to the next token, returning the previous current token.
    pub fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    /// Check if the current token matches the given kind.
    #[inline]
    pub fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(expected)
    }

    pub fn check_any(&self, expected: &[Token]) -> bool {
        expected.iter().any(|tok| self.check(tok))
    }

    #[inline]
    pub fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, expected: Token) -> Result<Token, ParseError> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected_token(&[expected]))
        }
    }

    /// Consume `>` closing a type argument list, splitting `>>` and `>>>`.
    pub fn expect_type_close(&mut self) -> Result<(), ParseError> {
        let span = self.current_span();
        let rest = match self.current() {
            Token::Greater => {
                self.advance();
                return Ok(());
            }
            Token::GreaterGreater => Token::Greater,
            Token::GreaterGreaterGreater => Token::GreaterGreater,
            Token::GreaterEqual => Token::Equal,
            Token::GreaterGreaterEqual => Token::GreaterEqual,
            _ => return Err(self.unexpected_token(&[Token::Greater])),
        };
        let split = Span::new(span.start + 1, span.end, span.line, span.column + 1);
        self.tokens[self.pos] = (rest, split);
        Ok(())
    }

    /// True when the current token is on a later line than the previous one.
    pub fn newline_before(&self) -> bool {
        self.pos > 0 && self.current_span().line > self.previous_span().line
    }

    /// Optional statement terminator.
    pub fn consume_semicolon(&mut self) {
        self.eat(&Token::Semicolon);
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        self.interner.intern(text)
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// True if the current token is an identifier spelled `word`.
    pub fn check_word(&self, word: &str) -> bool {
        match self.current() {
            Token::Identifier(sym) => self.interner.resolve(*sym) == word,
            _ => false,
        }
    }

    /// True if the current token can name a binding (identifiers and
    /// contextual keywords such as `type` or `of`).
    pub fn at_binding_identifier(&self) -> bool {
        matches!(self.current(), Token::Identifier(_)) || self.current().is_contextual_keyword()
    }

    /// Parse a binding identifier, accepting contextual keywords.
    pub fn expect_identifier(&mut self) -> Result<Identifier, ParseError> {
        let span = self.current_span();
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Identifier::new(name, span))
            }
            tok if tok.is_contextual_keyword() => {
                let text = tok.keyword_text().unwrap_or_default();
                let name = self.interner.intern(text);
                self.advance();
                Ok(Identifier::new(name, span))
            }
            _ => Err(self.unexpected_token(&[Token::Identifier(Symbol::dummy())])),
        }
    }

    /// Parse a property name after `.` or in a class body; any keyword is allowed.
    pub fn expect_property_name(&mut self) -> Result<Identifier, ParseError> {
        let span = self.current_span();
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Identifier::new(name, span))
            }
            tok => match tok.keyword_text() {
                Some(text) => {
                    let name = self.interner.intern(text);
                    self.advance();
                    Ok(Identifier::new(name, span))
                }
                None => Err(self.unexpected_token(&[Token::Identifier(Symbol::dummy())])),
            },
        }
    }

    // ========================================================================
    // Backtracking
    // ========================================================================

    pub(crate) fn checkpoint(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    /// Parse an expression from the tokens of a template interpolation.
    pub(crate) fn parse_embedded_expression(
        &mut self,
        mut tokens: Vec<(Token, Span)>,
        end: Span,
    ) -> Result<Expression, ParseError> {
        tokens.push((Token::Eof, end));
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let saved_allow_in = std::mem::replace(&mut self.allow_in, true);

        let result = expr::parse_expression(self).and_then(|expression| {
            if self.at_eof() {
                Ok(expression)
            } else {
                Err(self.unexpected_token(&[Token::RightBrace]))
            }
        });

        self.tokens = saved_tokens;
        self.pos = saved_pos;
        self.allow_in = saved_allow_in;
        result
    }

    /// Enter one nesting level, failing past [`MAX_PARSE_DEPTH`].
    pub(crate) fn enter(&mut self, what: &str) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            self.depth -= 1;
            return Err(ParseError::parser_limit_exceeded(
                format!("Maximum nesting depth ({}) exceeded in {}", MAX_PARSE_DEPTH, what),
                self.current_span(),
            ));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ========================================================================
    // Error Handling
    // ========================================================================

    pub(crate) fn unexpected_token(&self, expected: &[Token]) -> ParseError {
        let span = self.current_span();
        if self.at_eof() {
            ParseError::unexpected_eof(expected.to_vec(), span)
        } else {
            ParseError::unexpected_token(expected.to_vec(), self.current().clone(), span)
        }
    }

    /// Skip tokens until a plausible statement start.
    fn sync_to_statement_boundary(&mut self, error_pos: usize) {
        // Always make progress past the token that failed
        if self.pos == error_pos {
            self.advance();
        }
        while !self.at_eof() {
            match self.current() {
                Token::Function
                | Token::Class
                | Token::Let
                | Token::Const
                | Token::Var
                | Token::If
                | Token::While
                | Token::For
                | Token::Switch
                | Token::Try
                | Token::Return
                | Token::Throw
                | Token::Import
                | Token::Export => return,
                Token::Semicolon | Token::RightBrace => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ========================================================================
    // Utilities
    // ========================================================================

    pub fn combine_spans(&self, start: &Span, end: &Span) -> Span {
        Span {
            start: start.start,
            end: end.end.max(start.end),
            line: start.line,
            column: start.column,
        }
    }

    /// Span from `start` to the end of the last consumed token.
    pub fn span_from(&self, start: &Span) -> Span {
        let end = self.previous_span();
        self.combine_spans(start, &end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_new() {
        let parser = Parser::new("let x = 42;").unwrap();
        assert!(matches!(parser.current(), Token::Let));
        assert!(matches!(parser.peek(), Some(Token::Identifier(_))));
    }

    #[test]
    fn test_parser_at_eof() {
        let parser = Parser::new("").unwrap();
        assert!(parser.at_eof());
    }

    #[test]
    fn test_type_close_splits_shift() {
        let mut parser = Parser::new(">> x").unwrap();
        parser.expect_type_close().unwrap();
        assert!(matches!(parser.current(), Token::Greater));
        parser.expect_type_close().unwrap();
        assert!(matches!(parser.current(), Token::Identifier(_)));
    }

    #[test]
    fn test_errors_are_collected() {
        let errors = Parser::new("let = ; let y = 1; )").unwrap().parse().unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_contextual_keyword_binding() {
        let (module, interner) = Parser::new("let type = 1; let of = type;")
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(module.len(), 2);
        match &module.statements[0] {
            Statement::VariableDecl(decl) => match &decl.declarations[0].pattern {
                Pattern::Identifier(id) => assert_eq!(interner.resolve(id.name), "type"),
                other => panic!("unexpected pattern {:?}", other),
            },
            other => panic!("unexpected statement {:?}", other),
        }
    }
}
