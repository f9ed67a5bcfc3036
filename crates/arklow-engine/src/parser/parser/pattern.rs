//! Binding patterns and parameter lists

use super::{expr, stmt, types, Parser};
use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::interner::Symbol;
use crate::parser::token::Token;

/// Parse a binding target: identifier, array pattern or object pattern.
pub fn parse_binding_pattern(parser: &mut Parser) -> Result<Pattern, ParseError> {
    match parser.current() {
        Token::LeftBracket => parse_array_pattern(parser).map(Pattern::Array),
        Token::LeftBrace => parse_object_pattern(parser).map(Pattern::Object),
        _ if parser.at_binding_identifier() => parser.expect_identifier().map(Pattern::Identifier),
        _ => Err(parser.unexpected_token(&[
            Token::Identifier(Symbol::dummy()),
            Token::LeftBracket,
            Token::LeftBrace,
        ])),
    }
}

fn parse_default(parser: &mut Parser) -> Result<Option<Expression>, ParseError> {
    if parser.eat(&Token::Equal) {
        Ok(Some(expr::parse_assignment(parser)?))
    } else {
        Ok(None)
    }
}

fn parse_array_pattern(parser: &mut Parser) -> Result<ArrayPattern, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBracket)?;

    let mut elements = Vec::new();
    let mut rest = None;
    while !parser.check(&Token::RightBracket) && !parser.at_eof() {
        if parser.eat(&Token::Comma) {
            elements.push(None);
            continue;
        }
        if parser.eat(&Token::DotDotDot) {
            rest = Some(Box::new(parse_binding_pattern(parser)?));
            parser.eat(&Token::Comma);
            break;
        }
        let pattern = parse_binding_pattern(parser)?;
        let default = parse_default(parser)?;
        elements.push(Some(PatternElement { pattern, default }));
        if !parser.check(&Token::RightBracket) {
            parser.expect(Token::Comma)?;
        }
    }

    parser.expect(Token::RightBracket)?;
    let span = parser.span_from(&start);
    Ok(ArrayPattern {
        elements,
        rest,
        span,
    })
}

fn parse_object_pattern(parser: &mut Parser) -> Result<ObjectPattern, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBrace)?;

    let mut properties = Vec::new();
    let mut rest = None;
    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        if parser.eat(&Token::DotDotDot) {
            rest = Some(parser.expect_identifier()?);
            parser.eat(&Token::Comma);
            break;
        }

        let prop_start = parser.current_span();
        let key = expr::parse_property_key(parser)?;
        let (value, shorthand) = if parser.eat(&Token::Colon) {
            (parse_binding_pattern(parser)?, false)
        } else {
            match &key {
                PropertyKey::Identifier(id) => (Pattern::Identifier(*id), true),
                _ => return Err(parser.unexpected_token(&[Token::Colon])),
            }
        };
        let default = parse_default(parser)?;
        let span = parser.span_from(&prop_start);
        properties.push(ObjectPatternProperty {
            key,
            value,
            default,
            shorthand,
            span,
        });

        if !parser.check(&Token::RightBrace) {
            parser.expect(Token::Comma)?;
        }
    }

    parser.expect(Token::RightBrace)?;
    let span = parser.span_from(&start);
    Ok(ObjectPattern {
        properties,
        rest,
        span,
    })
}

/// Parse a parenthesized parameter list.
///
/// Accepts decorators, constructor parameter properties
/// (`private readonly x: T`), optional and rest parameters. A leading
/// `this: T` parameter only types the receiver and is dropped.
pub fn parse_parameters(parser: &mut Parser) -> Result<Vec<Parameter>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let saved_in = std::mem::replace(&mut parser.allow_in, true);
    let result = parse_parameter_list(parser);
    parser.allow_in = saved_in;
    result
}

fn parse_parameter_list(parser: &mut Parser) -> Result<Vec<Parameter>, ParseError> {
    let mut params = Vec::new();

    while !parser.check(&Token::RightParen) && !parser.at_eof() {
        let start = parser.current_span();
        stmt::skip_decorators(parser)?;

        if parser.check(&Token::This) && matches!(parser.peek(), Some(Token::Colon)) {
            parser.advance();
            parser.advance();
            types::parse_type(parser)?;
            if !parser.check(&Token::RightParen) {
                parser.expect(Token::Comma)?;
            }
            continue;
        }

        let property = parse_parameter_modifiers(parser);
        let is_rest = parser.eat(&Token::DotDotDot);
        let pattern = parse_binding_pattern(parser)?;
        let optional = parser.eat(&Token::Question);
        let type_annotation = if parser.eat(&Token::Colon) {
            Some(types::parse_type(parser)?)
        } else {
            None
        };
        let default_value = parse_default(parser)?;
        let span = parser.span_from(&start);
        params.push(Parameter {
            pattern,
            type_annotation,
            default_value,
            optional,
            is_rest,
            property,
            span,
        });

        if !parser.check(&Token::RightParen) {
            parser.expect(Token::Comma)?;
        }
    }

    parser.expect(Token::RightParen)?;
    Ok(params)
}

/// Accessibility and `readonly` on constructor parameters.
///
/// A bare `readonly` makes a public parameter property.
fn parse_parameter_modifiers(parser: &mut Parser) -> Option<Visibility> {
    let mut property = None;
    loop {
        let is_modifier = matches!(
            parser.current(),
            Token::Public | Token::Private | Token::Protected | Token::Readonly
        ) && matches!(
            parser.peek(),
            Some(Token::Identifier(_) | Token::LeftBrace | Token::LeftBracket | Token::Readonly)
        );
        if !is_modifier {
            return property;
        }
        property = match parser.advance() {
            Token::Private => Some(Visibility::Private),
            Token::Protected => Some(Visibility::Protected),
            Token::Public => Some(Visibility::Public),
            _ => property.or(Some(Visibility::Public)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_pattern_str(source: &str) -> (Pattern, Parser) {
        let mut parser = Parser::new(source).expect("lexer error");
        let pattern = parse_binding_pattern(&mut parser).expect("parse error");
        (pattern, parser)
    }

    #[test]
    fn test_array_pattern_with_holes_and_rest() {
        let (pattern, parser) = parse_pattern_str("[a, , b = 1, ...rest]");
        let Pattern::Array(array) = &pattern else {
            panic!("expected array pattern");
        };
        assert_eq!(array.elements.len(), 3);
        assert!(array.elements[1].is_none());
        assert!(array.elements[2].as_ref().is_some_and(|e| e.default.is_some()));
        let names: Vec<_> = pattern
            .bound_names()
            .iter()
            .map(|id| parser.resolve(id.name).to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "rest"]);
    }

    #[test]
    fn test_object_pattern_renames() {
        let (pattern, parser) = parse_pattern_str("{ a, b: { c }, ...others }");
        let Pattern::Object(object) = &pattern else {
            panic!("expected object pattern");
        };
        assert!(object.properties[0].shorthand);
        assert!(!object.properties[1].shorthand);
        let names: Vec<_> = pattern
            .bound_names()
            .iter()
            .map(|id| parser.resolve(id.name).to_string())
            .collect();
        assert_eq!(names, vec!["a", "c", "others"]);
    }

    #[test]
    fn test_parameter_properties_and_this() {
        let mut parser =
            Parser::new("(this: Foo, private readonly x: number, y?: string, ...z: number[])")
                .expect("lexer error");
        let params = parse_parameters(&mut parser).expect("parse error");
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].property, Some(Visibility::Private));
        assert!(params[1].optional);
        assert!(params[2].is_rest);
    }
}
