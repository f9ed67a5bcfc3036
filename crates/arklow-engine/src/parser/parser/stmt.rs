//! Statement and declaration parsing

use super::{expr, pattern, types, Parser};
use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::interner::Symbol;
use crate::parser::token::{Span, Token};

/// Parse a single statement.
pub fn parse_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    parser.enter("statement")?;
    let result = parse_statement_inner(parser);
    parser.leave();
    result
}

fn parse_statement_inner(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();

    match parser.current() {
        Token::At => {
            skip_decorators(parser)?;
            parse_statement(parser)
        }
        Token::Let | Token::Const | Token::Var => {
            if parser.check(&Token::Const) && peek_word(parser, 1, "enum") {
                return skip_declaration(parser, start);
            }
            let decl = parse_variable_decl(parser)?;
            parser.consume_semicolon();
            Ok(Statement::VariableDecl(decl))
        }
        Token::Function => parse_function_declaration(parser, false),
        Token::Async if matches!(parser.peek(), Some(Token::Function)) => {
            parser.advance();
            parse_function_declaration(parser, true)
        }
        Token::Class => parse_class(parser, false).map(Statement::ClassDecl),
        Token::Abstract if matches!(parser.peek(), Some(Token::Class)) => {
            parser.advance();
            parse_class(parser, true).map(Statement::ClassDecl)
        }
        Token::Type if matches!(parser.peek(), Some(Token::Identifier(_))) => {
            parse_type_alias(parser)
        }
        Token::Import if !matches!(parser.peek(), Some(Token::LeftParen | Token::Dot)) => {
            parse_import(parser)
        }
        Token::Export => parse_export(parser),
        Token::If => parse_if(parser),
        Token::Switch => parse_switch(parser),
        Token::While => parse_while(parser),
        Token::Do => parse_do_while(parser),
        Token::For => parse_for(parser),
        Token::Break => {
            parser.advance();
            let label = parse_jump_label(parser)?;
            parser.consume_semicolon();
            let span = parser.span_from(&start);
            Ok(Statement::Break(BreakStatement { label, span }))
        }
        Token::Continue => {
            parser.advance();
            let label = parse_jump_label(parser)?;
            parser.consume_semicolon();
            let span = parser.span_from(&start);
            Ok(Statement::Continue(ContinueStatement { label, span }))
        }
        Token::Return => parse_return(parser),
        Token::Throw => {
            parser.advance();
            let value = expr::parse_expression(parser)?;
            parser.consume_semicolon();
            let span = parser.span_from(&start);
            Ok(Statement::Throw(ThrowStatement { value, span }))
        }
        Token::Try => parse_try(parser),
        Token::LeftBrace => parse_block(parser).map(Statement::Block),
        Token::Semicolon => {
            parser.advance();
            Ok(Statement::Empty(start))
        }
        Token::Identifier(_) => {
            if is_skipped_declaration(parser) {
                return skip_declaration(parser, start);
            }
            if peek_word(parser, 0, "struct") && matches!(parser.peek(), Some(Token::Identifier(_)))
            {
                return parse_class(parser, false).map(Statement::ClassDecl);
            }
            if matches!(parser.peek(), Some(Token::Colon)) {
                return parse_labeled(parser);
            }
            parse_expression_statement(parser)
        }
        _ => parse_expression_statement(parser),
    }
}

fn peek_word(parser: &Parser, n: usize, word: &str) -> bool {
    matches!(parser.peek_nth(n), Some(Token::Identifier(sym)) if parser.resolve(*sym) == word)
}

/// `interface`, `enum`, `namespace`, `module` and `declare` forms carry no
/// executable code.
fn is_skipped_declaration(parser: &Parser) -> bool {
    let names_follow = matches!(
        parser.peek(),
        Some(Token::Identifier(_) | Token::StringLiteral(_))
    );
    if peek_word(parser, 0, "declare") {
        return names_follow
            || matches!(
                parser.peek(),
                Some(
                    Token::Const
                        | Token::Let
                        | Token::Var
                        | Token::Function
                        | Token::Class
                        | Token::Abstract
                        | Token::Type
                )
            );
    }
    names_follow
        && ["interface", "enum", "namespace", "module"]
            .iter()
            .any(|word| peek_word(parser, 0, word))
}

/// Skip a declaration up to its closing brace or terminating semicolon.
fn skip_declaration(parser: &mut Parser, start: Span) -> Result<Statement, ParseError> {
    let mut depth = 0usize;
    loop {
        match parser.current() {
            Token::Eof => break,
            Token::LeftBrace | Token::LeftParen | Token::LeftBracket => depth += 1,
            Token::RightBrace | Token::RightParen | Token::RightBracket => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                if depth == 0 && parser.check(&Token::RightBrace) {
                    parser.advance();
                    parser.eat(&Token::Semicolon);
                    break;
                }
            }
            Token::Semicolon if depth == 0 => {
                parser.advance();
                break;
            }
            _ => {}
        }
        parser.advance();
    }
    let span = parser.span_from(&start);
    Ok(Statement::Empty(span))
}

/// Skip any number of `@decorator` or `@decorator(args)` prefixes.
pub fn skip_decorators(parser: &mut Parser) -> Result<(), ParseError> {
    while parser.eat(&Token::At) {
        parser.expect_identifier()?;
        while parser.eat(&Token::Dot) {
            parser.expect_property_name()?;
        }
        if parser.check(&Token::LeftParen) && !parser.newline_before() {
            skip_balanced(parser)?;
        }
    }
    Ok(())
}

/// Skip a parenthesized group, including nested groups.
fn skip_balanced(parser: &mut Parser) -> Result<(), ParseError> {
    let mut depth = 0usize;
    loop {
        match parser.advance() {
            Token::LeftParen | Token::LeftBrace | Token::LeftBracket => depth += 1,
            Token::RightParen | Token::RightBrace | Token::RightBracket => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            }
            Token::Eof => return Err(parser.unexpected_token(&[Token::RightParen])),
            _ => {}
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Parse `let`/`const`/`var` with one or more declarators (no semicolon).
pub fn parse_variable_decl(parser: &mut Parser) -> Result<VariableDecl, ParseError> {
    let start = parser.current_span();
    let kind = match parser.advance() {
        Token::Const => VariableKind::Const,
        Token::Var => VariableKind::Var,
        _ => VariableKind::Let,
    };

    let mut declarations = Vec::new();
    loop {
        let decl_start = parser.current_span();
        let pattern = pattern::parse_binding_pattern(parser)?;
        // definite assignment assertion: `let x!: T`
        parser.eat(&Token::Bang);
        let type_annotation = if parser.eat(&Token::Colon) {
            Some(types::parse_type(parser)?)
        } else {
            None
        };
        let initializer = if parser.eat(&Token::Equal) {
            Some(expr::parse_assignment(parser)?)
        } else {
            None
        };
        let span = parser.span_from(&decl_start);
        declarations.push(VariableDeclarator {
            pattern,
            type_annotation,
            initializer,
            span,
        });
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    let span = parser.span_from(&start);
    Ok(VariableDecl {
        kind,
        declarations,
        span,
    })
}

struct Signature {
    type_params: Vec<TypeParameter>,
    params: Vec<Parameter>,
    return_type: Option<TypeAnnotation>,
}

fn parse_signature(parser: &mut Parser) -> Result<Signature, ParseError> {
    let type_params = if parser.check(&Token::Less) {
        types::parse_type_parameters(parser)?
    } else {
        Vec::new()
    };
    let params = pattern::parse_parameters(parser)?;
    let return_type = if parser.eat(&Token::Colon) {
        Some(types::parse_return_type(parser)?)
    } else {
        None
    };
    Ok(Signature {
        type_params,
        params,
        return_type,
    })
}

/// Parse a function from its type parameters onwards: `<T>(params): R { body }`.
pub fn parse_function_rest(
    parser: &mut Parser,
    start: Span,
    name: Option<Identifier>,
    is_async: bool,
    is_generator: bool,
) -> Result<FunctionDecl, ParseError> {
    let signature = parse_signature(parser)?;
    let body = parse_block(parser)?;
    let span = parser.span_from(&start);
    Ok(FunctionDecl {
        name,
        type_params: signature.type_params,
        params: signature.params,
        return_type: signature.return_type,
        body,
        is_async,
        is_generator,
        span,
    })
}

fn parse_function_declaration(parser: &mut Parser, is_async: bool) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Function)?;
    let is_generator = parser.eat(&Token::Star);
    let name = parser.expect_identifier()?;
    let signature = parse_signature(parser)?;

    // overload signature without a body
    if !parser.check(&Token::LeftBrace) {
        parser.consume_semicolon();
        return Ok(Statement::Empty(parser.span_from(&start)));
    }

    let body = parse_block(parser)?;
    let span = parser.span_from(&start);
    Ok(Statement::FunctionDecl(FunctionDecl {
        name: Some(name),
        type_params: signature.type_params,
        params: signature.params,
        return_type: signature.return_type,
        body,
        is_async,
        is_generator,
        span,
    }))
}

/// Parse `class` (or ArkTS `struct`) declarations.
fn parse_class(parser: &mut Parser, is_abstract: bool) -> Result<ClassDecl, ParseError> {
    let start = parser.current_span();
    if !parser.eat(&Token::Class) {
        // `struct`
        parser.advance();
    }
    let name = parser.expect_identifier()?;
    let type_params = if parser.check(&Token::Less) {
        types::parse_type_parameters(parser)?
    } else {
        Vec::new()
    };

    let extends = if parser.eat(&Token::Extends) {
        Some(types::parse_type_reference(parser)?)
    } else {
        None
    };

    let mut implements = Vec::new();
    if parser.eat(&Token::Implements) {
        loop {
            implements.push(types::parse_type_reference(parser)?);
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
    }

    parser.expect(Token::LeftBrace)?;
    let mut members = Vec::new();
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        if parser.eat(&Token::Semicolon) {
            continue;
        }
        if let Some(member) = parse_class_member(parser)? {
            members.push(member);
        }
    }
    parser.expect(Token::RightBrace)?;

    let span = parser.span_from(&start);
    Ok(ClassDecl {
        name,
        type_params,
        extends,
        implements,
        members,
        is_abstract,
        span,
    })
}

/// True when the current modifier-like token is actually a member name.
fn names_member(parser: &Parser) -> bool {
    matches!(
        parser.peek(),
        Some(
            Token::LeftParen
                | Token::Less
                | Token::Colon
                | Token::Equal
                | Token::Semicolon
                | Token::Question
                | Token::Bang
                | Token::RightBrace
        )
    )
}

fn parse_class_member(parser: &mut Parser) -> Result<Option<ClassMember>, ParseError> {
    let start = parser.current_span();
    skip_decorators(parser)?;

    let mut visibility = None;
    let mut is_static = false;
    let mut is_abstract = false;
    let mut is_readonly = false;
    let mut is_async = false;

    loop {
        if names_member(parser) {
            break;
        }
        match parser.current() {
            Token::Public => visibility = Some(Visibility::Public),
            Token::Private => visibility = Some(Visibility::Private),
            Token::Protected => visibility = Some(Visibility::Protected),
            Token::Static => {
                if matches!(parser.peek(), Some(Token::LeftBrace)) {
                    // static initialization block
                    parser.advance();
                    parse_block(parser)?;
                    return Ok(None);
                }
                is_static = true;
            }
            Token::Abstract => is_abstract = true,
            Token::Readonly => is_readonly = true,
            Token::Async => is_async = true,
            Token::Identifier(_) if peek_word(parser, 0, "declare") || peek_word(parser, 0, "override") => {}
            _ => break,
        }
        parser.advance();
    }

    let is_generator = parser.eat(&Token::Star);

    let mut kind = MethodKind::Method;
    if (peek_word(parser, 0, "get") || peek_word(parser, 0, "set")) && !names_member(parser) {
        kind = if peek_word(parser, 0, "get") {
            MethodKind::Getter
        } else {
            MethodKind::Setter
        };
        parser.advance();
    }

    if peek_word(parser, 0, "constructor") && matches!(parser.peek(), Some(Token::LeftParen)) {
        parser.advance();
        let params = pattern::parse_parameters(parser)?;
        if !parser.check(&Token::LeftBrace) {
            parser.consume_semicolon();
            return Ok(None);
        }
        let body = parse_block(parser)?;
        let span = parser.span_from(&start);
        return Ok(Some(ClassMember::Constructor(ConstructorDecl { params, body, span })));
    }

    let name = parse_member_name(parser)?;
    // optional `?` and definite `!` markers
    parser.eat(&Token::Question);
    parser.eat(&Token::Bang);

    if parser.check(&Token::LeftParen) || parser.check(&Token::Less) {
        let signature = parse_signature(parser)?;
        let has_body = parser.check(&Token::LeftBrace);
        let body = if has_body {
            parse_block(parser)?
        } else {
            parser.consume_semicolon();
            BlockStatement {
                statements: Vec::new(),
                span: parser.previous_span(),
            }
        };
        let span = parser.span_from(&start);
        let function = FunctionDecl {
            name: Some(name),
            type_params: signature.type_params,
            params: signature.params,
            return_type: signature.return_type,
            body,
            is_async,
            is_generator,
            span,
        };
        return Ok(Some(ClassMember::Method(MethodDecl {
            name,
            kind,
            function,
            is_static,
            is_abstract: is_abstract || !has_body,
            visibility,
            span,
        })));
    }

    let type_annotation = if parser.eat(&Token::Colon) {
        Some(types::parse_type(parser)?)
    } else {
        None
    };
    let initializer = if parser.eat(&Token::Equal) {
        Some(expr::parse_assignment(parser)?)
    } else {
        None
    };
    parser.consume_semicolon();
    let span = parser.span_from(&start);
    Ok(Some(ClassMember::Field(FieldDecl {
        name,
        type_annotation,
        initializer,
        is_static,
        is_readonly,
        visibility,
        span,
    })))
}

/// Member names may be keywords, string or numeric literals.
fn parse_member_name(parser: &mut Parser) -> Result<Identifier, ParseError> {
    let span = parser.current_span();
    match parser.current().clone() {
        Token::StringLiteral(name) => {
            parser.advance();
            Ok(Identifier::new(name, span))
        }
        Token::IntLiteral(value) => {
            parser.advance();
            Ok(Identifier::new(parser.intern(&value.to_string()), span))
        }
        Token::LeftBracket => Err(ParseError::invalid_syntax(
            "computed class member names are not supported",
            span,
        )),
        _ => parser.expect_property_name(),
    }
}

fn parse_type_alias(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Type)?;
    let name = parser.expect_identifier()?;
    let type_params = if parser.check(&Token::Less) {
        types::parse_type_parameters(parser)?
    } else {
        Vec::new()
    };
    parser.expect(Token::Equal)?;
    let type_annotation = types::parse_type(parser)?;
    parser.consume_semicolon();
    let span = parser.span_from(&start);
    Ok(Statement::TypeAliasDecl(TypeAliasDecl {
        name,
        type_params,
        type_annotation,
        span,
    }))
}

fn parse_import(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Import)?;
    // `import type { A } from ...`
    if parser.check(&Token::Type)
        && matches!(parser.peek(), Some(Token::LeftBrace | Token::Identifier(_) | Token::Star))
    {
        parser.advance();
    }

    let mut specifiers = Vec::new();
    if !matches!(parser.current(), Token::StringLiteral(_)) {
        if parser.at_binding_identifier() {
            specifiers.push(ImportSpecifier::Default(parser.expect_identifier()?));
            parser.eat(&Token::Comma);
        }
        if parser.eat(&Token::Star) {
            parser.expect(Token::As)?;
            specifiers.push(ImportSpecifier::Namespace(parser.expect_identifier()?));
        } else if parser.eat(&Token::LeftBrace) {
            while !parser.check(&Token::RightBrace) && !parser.at_eof() {
                if parser.check(&Token::Type) && !matches!(parser.peek(), Some(Token::Comma | Token::RightBrace | Token::As)) {
                    parser.advance();
                }
                let imported = parser.expect_property_name()?;
                let local = if parser.eat(&Token::As) {
                    parser.expect_identifier()?
                } else {
                    imported
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !parser.check(&Token::RightBrace) {
                    parser.expect(Token::Comma)?;
                }
            }
            parser.expect(Token::RightBrace)?;
        }
        parser.expect(Token::From)?;
    }

    let span = parser.current_span();
    let source = match parser.advance() {
        Token::StringLiteral(value) => StringLiteral { value, span },
        found => {
            return Err(ParseError::unexpected_token(
                vec![Token::StringLiteral(Symbol::dummy())],
                found,
                span,
            ))
        }
    };
    parser.consume_semicolon();
    let span = parser.span_from(&start);
    Ok(Statement::Import(ImportDecl {
        specifiers,
        source,
        span,
    }))
}

/// `export` is stripped; re-export lists carry no code.
fn parse_export(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Export)?;

    if parser.check(&Token::LeftBrace) || parser.check(&Token::Star) {
        return skip_declaration(parser, start);
    }
    if parser.check(&Token::Type) && matches!(parser.peek(), Some(Token::LeftBrace)) {
        return skip_declaration(parser, start);
    }

    if parser.eat(&Token::Default) {
        let is_declaration = matches!(
            parser.current(),
            Token::Function | Token::Class | Token::Abstract | Token::At
        ) || (parser.check(&Token::Async) && matches!(parser.peek(), Some(Token::Function)))
            || (peek_word(parser, 0, "struct") && matches!(parser.peek(), Some(Token::Identifier(_))));
        if !is_declaration {
            return parse_expression_statement(parser);
        }
    }
    parse_statement(parser)
}

// ============================================================================
// Control Flow
// ============================================================================

/// Parse a `{ ... }` block.
pub fn parse_block(parser: &mut Parser) -> Result<BlockStatement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBrace)?;
    let mut statements = Vec::new();
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        statements.push(parse_statement(parser)?);
    }
    parser.expect(Token::RightBrace)?;
    let span = parser.span_from(&start);
    Ok(BlockStatement { statements, span })
}

fn parse_parenthesized_condition(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.expect(Token::LeftParen)?;
    let condition = expr::parse_expression(parser)?;
    parser.expect(Token::RightParen)?;
    Ok(condition)
}

fn parse_if(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::If)?;
    let condition = parse_parenthesized_condition(parser)?;
    let then_branch = Box::new(parse_statement(parser)?);
    let else_branch = if parser.eat(&Token::Else) {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };
    let span = parser.span_from(&start);
    Ok(Statement::If(IfStatement {
        condition,
        then_branch,
        else_branch,
        span,
    }))
}

fn parse_switch(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Switch)?;
    let discriminant = parse_parenthesized_condition(parser)?;
    parser.expect(Token::LeftBrace)?;

    let mut cases = Vec::new();
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        let case_start = parser.current_span();
        let test = if parser.eat(&Token::Default) {
            None
        } else {
            parser.expect(Token::Case)?;
            Some(expr::parse_expression(parser)?)
        };
        parser.expect(Token::Colon)?;

        let mut consequent = Vec::new();
        while !parser.check_any(&[Token::Case, Token::Default, Token::RightBrace])
            && !parser.at_eof()
        {
            consequent.push(parse_statement(parser)?);
        }
        let span = parser.span_from(&case_start);
        cases.push(SwitchCase {
            test,
            consequent,
            span,
        });
    }
    parser.expect(Token::RightBrace)?;

    let span = parser.span_from(&start);
    Ok(Statement::Switch(SwitchStatement {
        discriminant,
        cases,
        span,
    }))
}

fn parse_while(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::While)?;
    let condition = parse_parenthesized_condition(parser)?;
    let body = Box::new(parse_statement(parser)?);
    let span = parser.span_from(&start);
    Ok(Statement::While(WhileStatement {
        condition,
        body,
        span,
    }))
}

fn parse_do_while(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Do)?;
    let body = Box::new(parse_statement(parser)?);
    parser.expect(Token::While)?;
    let condition = parse_parenthesized_condition(parser)?;
    parser.consume_semicolon();
    let span = parser.span_from(&start);
    Ok(Statement::DoWhile(DoWhileStatement {
        body,
        condition,
        span,
    }))
}

fn parse_for(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::For)?;
    parser.eat(&Token::Await);
    parser.expect(Token::LeftParen)?;

    let saved_in = std::mem::replace(&mut parser.allow_in, false);
    let head = parse_for_head(parser);
    parser.allow_in = saved_in;

    match head? {
        ForHead::Each { left, is_of } => {
            let right = if is_of {
                expr::parse_assignment(parser)?
            } else {
                expr::parse_expression(parser)?
            };
            parser.expect(Token::RightParen)?;
            let body = Box::new(parse_statement(parser)?);
            let span = parser.span_from(&start);
            let statement = ForOfStatement {
                left,
                right,
                body,
                span,
            };
            Ok(if is_of {
                Statement::ForOf(statement)
            } else {
                Statement::ForIn(statement)
            })
        }
        ForHead::Classic(init) => {
            parser.expect(Token::Semicolon)?;
            let test = if parser.check(&Token::Semicolon) {
                None
            } else {
                Some(expr::parse_expression(parser)?)
            };
            parser.expect(Token::Semicolon)?;
            let update = if parser.check(&Token::RightParen) {
                None
            } else {
                Some(expr::parse_expression(parser)?)
            };
            parser.expect(Token::RightParen)?;
            let body = Box::new(parse_statement(parser)?);
            let span = parser.span_from(&start);
            Ok(Statement::For(ForStatement {
                init,
                test,
                update,
                body,
                span,
            }))
        }
    }
}

enum ForHead {
    Classic(Option<ForInit>),
    /// `of` or `in` has been consumed
    Each { left: ForOfLeft, is_of: bool },
}

fn parse_for_head(parser: &mut Parser) -> Result<ForHead, ParseError> {
    if parser.check(&Token::Semicolon) {
        return Ok(ForHead::Classic(None));
    }

    if parser.check_any(&[Token::Let, Token::Const, Token::Var]) {
        let start = parser.current_span();
        let kind = match parser.current() {
            Token::Const => VariableKind::Const,
            Token::Var => VariableKind::Var,
            _ => VariableKind::Let,
        };

        // single binding followed by `of`/`in`
        let checkpoint = parser.checkpoint();
        parser.advance();
        let pattern = pattern::parse_binding_pattern(parser)?;
        let type_annotation = if parser.eat(&Token::Colon) {
            Some(types::parse_type(parser)?)
        } else {
            None
        };
        if parser.check(&Token::Of) || parser.check(&Token::In) {
            let is_of = parser.check(&Token::Of);
            parser.advance();
            return Ok(ForHead::Each {
                left: ForOfLeft::VariableDecl {
                    kind,
                    pattern,
                    type_annotation,
                },
                is_of,
            });
        }

        parser.rewind(checkpoint);
        let mut decl = parse_variable_decl(parser)?;
        decl.span = parser.span_from(&start);
        return Ok(ForHead::Classic(Some(ForInit::VariableDecl(decl))));
    }

    let target = expr::parse_expression(parser)?;
    if parser.check(&Token::Of) || parser.check(&Token::In) {
        let is_of = parser.check(&Token::Of);
        parser.advance();
        return Ok(ForHead::Each {
            left: ForOfLeft::Target(target),
            is_of,
        });
    }
    Ok(ForHead::Classic(Some(ForInit::Expression(target))))
}

fn parse_jump_label(parser: &mut Parser) -> Result<Option<Identifier>, ParseError> {
    if parser.at_binding_identifier() && !parser.newline_before() {
        Ok(Some(parser.expect_identifier()?))
    } else {
        Ok(None)
    }
}

fn parse_return(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Return)?;
    let value = if parser.check_any(&[Token::Semicolon, Token::RightBrace, Token::Eof])
        || parser.newline_before()
    {
        None
    } else {
        Some(expr::parse_expression(parser)?)
    };
    parser.consume_semicolon();
    let span = parser.span_from(&start);
    Ok(Statement::Return(ReturnStatement { value, span }))
}

fn parse_try(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Try)?;
    let body = parse_block(parser)?;

    let catch_clause = if parser.check(&Token::Catch) {
        let catch_start = parser.current_span();
        parser.advance();
        let (param, type_annotation) = if parser.eat(&Token::LeftParen) {
            let param = pattern::parse_binding_pattern(parser)?;
            let type_annotation = if parser.eat(&Token::Colon) {
                Some(types::parse_type(parser)?)
            } else {
                None
            };
            parser.expect(Token::RightParen)?;
            (Some(param), type_annotation)
        } else {
            (None, None)
        };
        let body = parse_block(parser)?;
        let span = parser.span_from(&catch_start);
        Some(CatchClause {
            param,
            type_annotation,
            body,
            span,
        })
    } else {
        None
    };

    let finally_clause = if parser.eat(&Token::Finally) {
        Some(parse_block(parser)?)
    } else {
        None
    };

    if catch_clause.is_none() && finally_clause.is_none() {
        return Err(ParseError::invalid_syntax(
            "try statement requires a catch or finally clause",
            parser.current_span(),
        ));
    }

    let span = parser.span_from(&start);
    Ok(Statement::Try(TryStatement {
        body,
        catch_clause,
        finally_clause,
        span,
    }))
}

fn parse_labeled(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    let label = parser.expect_identifier()?;
    parser.expect(Token::Colon)?;
    let body = Box::new(parse_statement(parser)?);
    let span = parser.span_from(&start);
    Ok(Statement::Labeled(LabeledStatement { label, body, span }))
}

fn parse_expression_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    let expression = expr::parse_expression(parser)?;
    parser.consume_semicolon();
    let span = parser.span_from(&start);
    Ok(Statement::Expression(ExpressionStatement { expression, span }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::interner::Interner;

    fn parse(source: &str) -> (Module, Interner) {
        Parser::new(source)
            .expect("lexer error")
            .parse()
            .expect("parse error")
    }

    #[test]
    fn test_variable_declarations() {
        let (module, _) = parse("let a = 1, b: string; const [x, y] = pair;");
        assert_eq!(module.len(), 2);
        let Statement::VariableDecl(decl) = &module.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.declarations.len(), 2);
        assert!(decl.declarations[1].initializer.is_none());
    }

    #[test]
    fn test_class_members() {
        let source = r#"
            @Component
            export abstract class Shape<T> extends Base implements Drawable {
                private static count: number = 0;
                readonly name = "shape";
                constructor(public id: number) { super(); }
                abstract area(): number;
                get label(): string { return this.name; }
                static create(): Shape<T> { return null; }
            }
        "#;
        let (module, interner) = parse(source);
        let Statement::ClassDecl(class) = &module.statements[0] else {
            panic!("expected class, got {:?}", module.statements[0]);
        };
        assert_eq!(interner.resolve(class.name.name), "Shape");
        assert!(class.is_abstract);
        assert_eq!(class.members.len(), 6);
        assert!(matches!(&class.members[0], ClassMember::Field(f) if f.is_static));
        assert!(matches!(&class.members[2], ClassMember::Constructor(c) if c.params[0].property.is_some()));
        assert!(matches!(&class.members[3], ClassMember::Method(m) if m.is_abstract));
        assert!(matches!(&class.members[4], ClassMember::Method(m) if m.kind == MethodKind::Getter));
    }

    #[test]
    fn test_arkts_struct() {
        let source = "@Entry\n@Component\nstruct Index {\n  message: string = 'hi';\n  build() { Text(this.message); }\n}";
        let (module, _) = parse(source);
        let Statement::ClassDecl(class) = &module.statements[0] else {
            panic!("expected struct as class");
        };
        assert_eq!(class.members.len(), 2);
    }

    #[test]
    fn test_skipped_declarations() {
        let source = "interface A { x: number; }\nenum Color { Red, Green }\ndeclare const g: number;\nnamespace N { let x = 1; }\nlet y = 2;";
        let (module, _) = parse(source);
        let kept: Vec<_> = module
            .statements
            .iter()
            .filter(|s| !matches!(s, Statement::Empty(_)))
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(matches!(kept[0], Statement::VariableDecl(_)));
    }

    #[test]
    fn test_function_overloads_have_no_body() {
        let (module, _) = parse("function f(a: number): void;\nfunction f(a: any) { return a; }");
        assert!(matches!(module.statements[0], Statement::Empty(_)));
        assert!(matches!(module.statements[1], Statement::FunctionDecl(_)));
    }

    #[test]
    fn test_for_variants() {
        let (module, _) = parse(
            "for (let i = 0; i < n; i++) {}\nfor (const [k, v] of entries) {}\nfor (key in obj) {}\nfor (;;) { break; }",
        );
        assert!(matches!(module.statements[0], Statement::For(_)));
        assert!(matches!(
            &module.statements[1],
            Statement::ForOf(ForOfStatement { left: ForOfLeft::VariableDecl { .. }, .. })
        ));
        assert!(matches!(
            &module.statements[2],
            Statement::ForIn(ForOfStatement { left: ForOfLeft::Target(_), .. })
        ));
        assert!(matches!(&module.statements[3], Statement::For(f) if f.init.is_none() && f.test.is_none()));
    }

    #[test]
    fn test_for_in_operator_inside_init() {
        let (module, _) = parse("for (let x = ('a' in o); x; ) {}");
        assert!(matches!(module.statements[0], Statement::For(_)));
    }

    #[test]
    fn test_return_newline_has_no_value() {
        let (module, _) = parse("function f() { return\n42; }");
        let Statement::FunctionDecl(function) = &module.statements[0] else {
            panic!("expected function");
        };
        assert!(matches!(
            function.body.statements[0],
            Statement::Return(ReturnStatement { value: None, .. })
        ));
    }

    #[test]
    fn test_try_catch_finally() {
        let (module, _) = parse("try { f(); } catch (e: Error) { g(e); } finally { h(); }");
        let Statement::Try(stmt) = &module.statements[0] else {
            panic!("expected try");
        };
        assert!(stmt.catch_clause.as_ref().is_some_and(|c| c.param.is_some()));
        assert!(stmt.finally_clause.is_some());
    }

    #[test]
    fn test_imports_and_exports() {
        let (module, _) = parse(
            "import def, { a, b as c } from './m';\nimport * as ns from 'ns';\nexport { a };\nexport default function main() {}",
        );
        let Statement::Import(import) = &module.statements[0] else {
            panic!("expected import");
        };
        assert_eq!(import.specifiers.len(), 3);
        assert!(matches!(module.statements[1], Statement::Import(_)));
        assert!(matches!(module.statements[2], Statement::Empty(_)));
        assert!(matches!(module.statements[3], Statement::FunctionDecl(_)));
    }

    #[test]
    fn test_switch_and_labels() {
        let (module, _) = parse("outer: while (true) { switch (x) { case 1: break outer; default: continue; } }");
        let Statement::Labeled(labeled) = &module.statements[0] else {
            panic!("expected labeled statement");
        };
        assert!(matches!(*labeled.body, Statement::While(_)));
    }
}
