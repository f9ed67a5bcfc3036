//! Type annotation parsing

use super::{pattern, Parser};
use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::interner::Symbol;
use crate::parser::token::{Span, Token};

/// Parse a type annotation (unions, intersections, conditional types).
pub fn parse_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    parser.enter("type")?;
    let result = parse_conditional_type(parser);
    parser.leave();
    result
}

/// Parse a return type, reading `x is T` predicates as boolean.
pub fn parse_return_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start = parser.current_span();
    if parser.check_word("asserts") && !matches!(parser.peek(), Some(Token::Dot | Token::Less)) {
        parser.advance();
        parser.advance();
        if parser.check_word("is") {
            parser.advance();
            parse_type(parser)?;
        }
        return Ok(TypeAnnotation::Primitive(PrimitiveType::Void, start));
    }

    let predicate = (parser.at_binding_identifier() || parser.check(&Token::This))
        && matches!(parser.peek(), Some(Token::Identifier(sym)) if parser.resolve(*sym) == "is");
    if predicate {
        parser.advance();
        parser.advance();
        parse_type(parser)?;
        let span = parser.span_from(&start);
        return Ok(TypeAnnotation::Primitive(PrimitiveType::Boolean, span));
    }

    parse_type(parser)
}

fn parse_conditional_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start = parser.current_span();
    let checked = parse_union_type(parser)?;
    if !parser.check(&Token::Extends) {
        return Ok(checked);
    }

    // `A extends B ? X : Y` is approximated by `X | Y`
    parser.advance();
    parse_union_type(parser)?;
    parser.expect(Token::Question)?;
    let when_true = parse_type(parser)?;
    parser.expect(Token::Colon)?;
    let when_false = parse_type(parser)?;
    let span = parser.span_from(&start);
    Ok(TypeAnnotation::Union(vec![when_true, when_false], span))
}

fn parse_union_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start = parser.current_span();
    parser.eat(&Token::Pipe);
    let first = parse_intersection_type(parser)?;
    if !parser.check(&Token::Pipe) {
        return Ok(first);
    }

    let mut members = vec![first];
    while parser.eat(&Token::Pipe) {
        members.push(parse_intersection_type(parser)?);
    }
    let span = parser.span_from(&start);
    Ok(TypeAnnotation::Union(members, span))
}

fn parse_intersection_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start = parser.current_span();
    parser.eat(&Token::Amp);
    let first = parse_postfix_type(parser)?;
    if !parser.check(&Token::Amp) {
        return Ok(first);
    }

    let mut members = vec![first];
    while parser.eat(&Token::Amp) {
        members.push(parse_postfix_type(parser)?);
    }
    let span = parser.span_from(&start);
    Ok(TypeAnnotation::Intersection(members, span))
}

/// `T[]` and indexed access `T[K]`.
fn parse_postfix_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start = parser.current_span();
    let mut ty = parse_primary_type(parser)?;

    while parser.check(&Token::LeftBracket) && !parser.newline_before() {
        parser.advance();
        if parser.eat(&Token::RightBracket) {
            let span = parser.span_from(&start);
            ty = TypeAnnotation::Array(Box::new(ty), span);
        } else {
            parse_type(parser)?;
            parser.expect(Token::RightBracket)?;
            let span = parser.span_from(&start);
            ty = TypeAnnotation::Primitive(PrimitiveType::Any, span);
        }
    }

    Ok(ty)
}

fn primitive_named(name: &str) -> Option<PrimitiveType> {
    let primitive = match name {
        "number" => PrimitiveType::Number,
        "string" => PrimitiveType::String,
        "boolean" => PrimitiveType::Boolean,
        "bigint" => PrimitiveType::BigInt,
        "any" => PrimitiveType::Any,
        "unknown" => PrimitiveType::Unknown,
        "never" => PrimitiveType::Never,
        "undefined" => PrimitiveType::Undefined,
        "object" => PrimitiveType::Object,
        "symbol" => PrimitiveType::Symbol,
        _ => return None,
    };
    Some(primitive)
}

fn parse_primary_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let span = parser.current_span();

    match parser.current().clone() {
        Token::LeftParen => {
            if is_function_type_start(parser) {
                return parse_function_type(parser).map(TypeAnnotation::Function);
            }
            parser.advance();
            let inner = parse_type(parser)?;
            parser.expect(Token::RightParen)?;
            Ok(inner)
        }
        Token::Less => parse_function_type(parser).map(TypeAnnotation::Function),
        Token::New => {
            parser.advance();
            parse_function_type(parser).map(TypeAnnotation::Function)
        }
        Token::LeftBracket => parse_tuple_type(parser),
        Token::LeftBrace => parse_object_type(parser).map(TypeAnnotation::Object),
        Token::StringLiteral(text) => {
            parser.advance();
            Ok(TypeAnnotation::StringLiteral(text, span))
        }
        Token::IntLiteral(value) => {
            parser.advance();
            Ok(TypeAnnotation::NumberLiteral(value as f64, span))
        }
        Token::FloatLiteral(value) => {
            parser.advance();
            Ok(TypeAnnotation::NumberLiteral(value, span))
        }
        Token::Minus => {
            parser.advance();
            let value = match parser.advance() {
                Token::IntLiteral(v) => -(v as f64),
                Token::FloatLiteral(v) => -v,
                _ => return Err(ParseError::invalid_syntax("expected a number after `-`", span)),
            };
            let span = parser.span_from(&span);
            Ok(TypeAnnotation::NumberLiteral(value, span))
        }
        Token::True | Token::False => {
            let value = parser.check(&Token::True);
            parser.advance();
            Ok(TypeAnnotation::BooleanLiteral(value, span))
        }
        Token::Null => {
            parser.advance();
            Ok(TypeAnnotation::Primitive(PrimitiveType::Null, span))
        }
        Token::Void => {
            parser.advance();
            Ok(TypeAnnotation::Primitive(PrimitiveType::Void, span))
        }
        Token::Typeof => {
            parser.advance();
            let mut path = vec![parser.expect_identifier()?];
            while parser.eat(&Token::Dot) {
                path.push(parser.expect_property_name()?);
            }
            let span = parser.span_from(&span);
            Ok(TypeAnnotation::Typeof(path, span))
        }
        Token::Readonly => {
            parser.advance();
            parse_postfix_type(parser)
        }
        Token::This => {
            parser.advance();
            let name = parser.intern("this");
            Ok(TypeAnnotation::Reference(TypeReference {
                path: vec![Identifier::new(name, span)],
                type_args: Vec::new(),
                span,
            }))
        }
        Token::Identifier(sym) => {
            let name = parser.resolve(sym).to_string();
            if let Some(primitive) = primitive_named(&name) {
                if !matches!(parser.peek(), Some(Token::Dot)) {
                    parser.advance();
                    return Ok(TypeAnnotation::Primitive(primitive, span));
                }
            }
            match name.as_str() {
                // keyof T: property names are strings here
                "keyof" => {
                    parser.advance();
                    parse_postfix_type(parser)?;
                    let span = parser.span_from(&span);
                    Ok(TypeAnnotation::Primitive(PrimitiveType::String, span))
                }
                "unique" if matches!(parser.peek(), Some(Token::Identifier(_))) => {
                    parser.advance();
                    parse_primary_type(parser)
                }
                "infer" if matches!(parser.peek(), Some(Token::Identifier(_))) => {
                    parser.advance();
                    parser.advance();
                    Ok(TypeAnnotation::Primitive(PrimitiveType::Unknown, span))
                }
                _ => parse_type_reference(parser).map(TypeAnnotation::Reference),
            }
        }
        _ if parser.at_binding_identifier() => {
            parse_type_reference(parser).map(TypeAnnotation::Reference)
        }
        _ => Err(parser.unexpected_token(&[Token::Identifier(Symbol::dummy())])),
    }
}

/// Parse a possibly dotted, possibly generic type name.
pub fn parse_type_reference(parser: &mut Parser) -> Result<TypeReference, ParseError> {
    let start = parser.current_span();
    let mut path = vec![parser.expect_identifier()?];
    while parser.eat(&Token::Dot) {
        path.push(parser.expect_property_name()?);
    }
    let type_args = if parser.check(&Token::Less) && !parser.newline_before() {
        parse_type_arguments(parser)?
    } else {
        Vec::new()
    };
    let span = parser.span_from(&start);
    Ok(TypeReference {
        path,
        type_args,
        span,
    })
}

/// Parse `<A, B>`.
pub fn parse_type_arguments(parser: &mut Parser) -> Result<Vec<TypeAnnotation>, ParseError> {
    parser.expect(Token::Less)?;
    let mut args = Vec::new();
    loop {
        args.push(parse_type(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    parser.expect_type_close()?;
    Ok(args)
}

/// Parse `<T extends Bound = Default, ...>`.
pub fn parse_type_parameters(parser: &mut Parser) -> Result<Vec<TypeParameter>, ParseError> {
    parser.expect(Token::Less)?;
    let mut params = Vec::new();
    while !parser.check(&Token::Greater) && !parser.at_eof() {
        let start = parser.current_span();
        // `in`/`out` variance and `const` modifiers
        parser.eat(&Token::Const);
        parser.eat(&Token::In);
        let name = parser.expect_identifier()?;
        let constraint = if parser.eat(&Token::Extends) {
            Some(parse_type(parser)?)
        } else {
            None
        };
        let default = if parser.eat(&Token::Equal) {
            Some(parse_type(parser)?)
        } else {
            None
        };
        let span = parser.span_from(&start);
        params.push(TypeParameter {
            name,
            constraint,
            default,
            span,
        });
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    parser.expect_type_close()?;
    Ok(params)
}

fn is_function_type_start(parser: &Parser) -> bool {
    let mut depth = 0usize;
    let mut n = 0;
    while let Some(token) = parser.peek_nth(n) {
        match token {
            Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
            Token::RightParen | Token::RightBracket | Token::RightBrace => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return matches!(parser.peek_nth(n + 1), Some(Token::Arrow));
                }
            }
            Token::Eof => return false,
            _ => {}
        }
        n += 1;
    }
    false
}

fn parse_function_type(parser: &mut Parser) -> Result<FunctionType, ParseError> {
    let start = parser.current_span();
    if parser.check(&Token::Less) {
        parse_type_parameters(parser)?;
    }
    parser.expect(Token::LeftParen)?;

    let mut params = Vec::new();
    while !parser.check(&Token::RightParen) && !parser.at_eof() {
        params.push(parse_function_type_param(parser)?);
        if !parser.check(&Token::RightParen) {
            parser.expect(Token::Comma)?;
        }
    }
    parser.expect(Token::RightParen)?;
    parser.expect(Token::Arrow)?;
    let return_type = parse_return_type(parser)?;
    let span = parser.span_from(&start);
    Ok(FunctionType {
        params,
        return_type: Box::new(return_type),
        span,
    })
}

fn parse_function_type_param(parser: &mut Parser) -> Result<FunctionTypeParam, ParseError> {
    let is_rest = parser.eat(&Token::DotDotDot);

    if parser.check(&Token::LeftBrace) || parser.check(&Token::LeftBracket) {
        pattern::parse_binding_pattern(parser)?;
        let optional = parser.eat(&Token::Question);
        let ty = if parser.eat(&Token::Colon) {
            parse_type(parser)?
        } else {
            TypeAnnotation::Primitive(PrimitiveType::Any, parser.previous_span())
        };
        return Ok(FunctionTypeParam {
            name: None,
            ty,
            optional,
            is_rest,
        });
    }

    let named = (parser.at_binding_identifier() || parser.check(&Token::This))
        && matches!(
            parser.peek(),
            Some(Token::Colon | Token::Question | Token::Comma | Token::RightParen)
        );
    if !named {
        let ty = parse_type(parser)?;
        return Ok(FunctionTypeParam {
            name: None,
            ty,
            optional: false,
            is_rest,
        });
    }

    let name = if parser.check(&Token::This) {
        let span = parser.current_span();
        parser.advance();
        Identifier::new(parser.intern("this"), span)
    } else {
        parser.expect_identifier()?
    };
    let optional = parser.eat(&Token::Question);
    let ty = if parser.eat(&Token::Colon) {
        parse_type(parser)?
    } else {
        TypeAnnotation::Primitive(PrimitiveType::Any, name.span)
    };
    Ok(FunctionTypeParam {
        name: Some(name),
        ty,
        optional,
        is_rest,
    })
}

fn parse_tuple_type(parser: &mut Parser) -> Result<TypeAnnotation, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBracket)?;
    let mut elements = Vec::new();
    while !parser.check(&Token::RightBracket) && !parser.at_eof() {
        let is_rest = parser.eat(&Token::DotDotDot);
        // labelled element: `[x: number, y?: number]`
        if parser.at_binding_identifier()
            && matches!(parser.peek(), Some(Token::Colon | Token::Question))
            && !matches!(parser.peek_nth(2), Some(Token::Comma | Token::RightBracket))
        {
            parser.advance();
            parser.eat(&Token::Question);
            parser.expect(Token::Colon)?;
        }
        let mut ty = parse_type(parser)?;
        parser.eat(&Token::Question);
        if is_rest {
            if let TypeAnnotation::Array(inner, _) = ty {
                ty = *inner;
            }
        }
        elements.push(ty);
        if !parser.check(&Token::RightBracket) {
            parser.expect(Token::Comma)?;
        }
    }
    parser.expect(Token::RightBracket)?;
    let span = parser.span_from(&start);
    Ok(TypeAnnotation::Tuple(elements, span))
}

fn parse_object_type(parser: &mut Parser) -> Result<ObjectType, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBrace)?;
    let mut members = Vec::new();

    while !parser.check(&Token::RightBrace) && !parser.at_eof() {
        parser.eat(&Token::Readonly);

        // index signature `[key: string]: T` or mapped type `[K in T]: V`
        if parser.check(&Token::LeftBracket) {
            parser.advance();
            parser.expect_identifier()?;
            if parser.eat(&Token::Colon) || parser.eat(&Token::In) {
                parse_type(parser)?;
            }
            parser.expect(Token::RightBracket)?;
            parser.eat(&Token::Question);
            if parser.eat(&Token::Colon) {
                parse_type(parser)?;
            }
            skip_member_separator(parser);
            continue;
        }

        // call signature `(x: T): R`
        if parser.check(&Token::LeftParen) || parser.check(&Token::Less) {
            parse_method_signature(parser, start)?;
            skip_member_separator(parser);
            continue;
        }

        let name = match parser.current().clone() {
            Token::StringLiteral(sym) => {
                let span = parser.current_span();
                parser.advance();
                Identifier::new(sym, span)
            }
            _ => parser.expect_property_name()?,
        };
        let optional = parser.eat(&Token::Question);
        let ty = if parser.check(&Token::LeftParen) || parser.check(&Token::Less) {
            TypeAnnotation::Function(parse_method_signature(parser, name.span)?)
        } else if parser.eat(&Token::Colon) {
            parse_type(parser)?
        } else {
            TypeAnnotation::Primitive(PrimitiveType::Any, name.span)
        };
        members.push(ObjectTypeMember { name, ty, optional });
        skip_member_separator(parser);
    }

    parser.expect(Token::RightBrace)?;
    let span = parser.span_from(&start);
    Ok(ObjectType { members, span })
}

/// `(a: A): R` inside an object type.
fn parse_method_signature(parser: &mut Parser, start: Span) -> Result<FunctionType, ParseError> {
    if parser.check(&Token::Less) {
        parse_type_parameters(parser)?;
    }
    let params = pattern::parse_parameters(parser)?
        .into_iter()
        .map(|param| FunctionTypeParam {
            name: match param.pattern {
                Pattern::Identifier(id) => Some(id),
                _ => None,
            },
            ty: param
                .type_annotation
                .unwrap_or(TypeAnnotation::Primitive(PrimitiveType::Any, param.span)),
            optional: param.optional,
            is_rest: param.is_rest,
        })
        .collect();
    let return_type = if parser.eat(&Token::Colon) {
        parse_return_type(parser)?
    } else {
        TypeAnnotation::Primitive(PrimitiveType::Any, parser.previous_span())
    };
    let span = parser.span_from(&start);
    Ok(FunctionType {
        params,
        return_type: Box::new(return_type),
        span,
    })
}

fn skip_member_separator(parser: &mut Parser) {
    if !parser.eat(&Token::Semicolon) {
        parser.eat(&Token::Comma);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_type_str(source: &str) -> (TypeAnnotation, Parser) {
        let mut parser = Parser::new(source).expect("lexer error");
        let ty = parse_type(&mut parser).expect("parse error");
        (ty, parser)
    }

    #[test]
    fn test_primitive_and_array() {
        let (ty, _) = parse_type_str("number[][]");
        let TypeAnnotation::Array(inner, _) = ty else {
            panic!("expected array");
        };
        assert!(matches!(*inner, TypeAnnotation::Array(_, _)));
    }

    #[test]
    fn test_union_of_literals() {
        let (ty, _) = parse_type_str("'a' | 'b' | null");
        let TypeAnnotation::Union(members, _) = ty else {
            panic!("expected union");
        };
        assert_eq!(members.len(), 3);
        assert!(matches!(members[2], TypeAnnotation::Primitive(PrimitiveType::Null, _)));
    }

    #[test]
    fn test_generic_reference_with_shift_close() {
        let (ty, parser) = parse_type_str("Map<string, Array<number>>");
        let TypeAnnotation::Reference(reference) = ty else {
            panic!("expected reference");
        };
        assert_eq!(parser.resolve(reference.path[0].name), "Map");
        assert_eq!(reference.type_args.len(), 2);
        assert!(parser.at_eof());
    }

    #[test]
    fn test_function_type() {
        let (ty, _) = parse_type_str("(a: number, ...rest: string[]) => void");
        let TypeAnnotation::Function(function) = ty else {
            panic!("expected function type");
        };
        assert_eq!(function.params.len(), 2);
        assert!(function.params[1].is_rest);
        assert!(matches!(*function.return_type, TypeAnnotation::Primitive(PrimitiveType::Void, _)));
    }

    #[test]
    fn test_parenthesized_type_is_not_function() {
        let (ty, _) = parse_type_str("(string | number)[]");
        assert!(matches!(ty, TypeAnnotation::Array(_, _)));
    }

    #[test]
    fn test_object_type_members() {
        let (ty, _) = parse_type_str("{ x: number; y?: string, f(a: number): void }");
        let TypeAnnotation::Object(object) = ty else {
            panic!("expected object type");
        };
        assert_eq!(object.members.len(), 3);
        assert!(object.members[1].optional);
        assert!(matches!(object.members[2].ty, TypeAnnotation::Function(_)));
    }

    #[test]
    fn test_type_predicate_is_boolean() {
        let mut parser = Parser::new("x is string").expect("lexer error");
        let ty = parse_return_type(&mut parser).expect("parse error");
        assert!(matches!(ty, TypeAnnotation::Primitive(PrimitiveType::Boolean, _)));
    }
}
