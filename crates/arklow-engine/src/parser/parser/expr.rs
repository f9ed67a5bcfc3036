//! Expression parsing

use super::{pattern, stmt, types, Parser};
use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::precedence::{
    get_precedence, is_assignment_operator, is_right_associative, Precedence,
};
use crate::parser::token::{Span, TemplatePart, Token};

/// Parse an expression, including comma sequences.
pub fn parse_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    let first = parse_assignment(parser)?;
    if !parser.check(&Token::Comma) {
        return Ok(first);
    }

    let mut expressions = vec![first];
    while parser.eat(&Token::Comma) {
        expressions.push(parse_assignment(parser)?);
    }
    let span = parser.span_from(&start);
    Ok(Expression::Sequence(SequenceExpression { expressions, span }))
}

/// Parse an assignment-level expression (no top-level comma).
pub fn parse_assignment(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.enter("expression")?;
    let result = parse_assignment_inner(parser);
    parser.leave();
    result
}

fn parse_assignment_inner(parser: &mut Parser) -> Result<Expression, ParseError> {
    if let Some(arrow) = try_parse_arrow(parser)? {
        return Ok(arrow);
    }
    if parser.check(&Token::Yield) {
        return parse_yield(parser);
    }

    let start = parser.current_span();
    let left = parse_conditional(parser)?;

    if is_assignment_operator(parser.current()) {
        let operator = assignment_operator(&parser.advance());
        let right = parse_assignment(parser)?;
        let span = parser.combine_spans(&start, right.span());
        return Ok(Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }));
    }

    Ok(left)
}

fn assignment_operator(token: &Token) -> AssignmentOperator {
    match token {
        Token::PlusEqual => AssignmentOperator::AddAssign,
        Token::MinusEqual => AssignmentOperator::SubAssign,
        Token::StarEqual => AssignmentOperator::MulAssign,
        Token::SlashEqual => AssignmentOperator::DivAssign,
        Token::PercentEqual => AssignmentOperator::ModAssign,
        Token::StarStarEqual => AssignmentOperator::ExpAssign,
        Token::AmpEqual => AssignmentOperator::BitAndAssign,
        Token::PipeEqual => AssignmentOperator::BitOrAssign,
        Token::CaretEqual => AssignmentOperator::BitXorAssign,
        Token::LessLessEqual => AssignmentOperator::LeftShiftAssign,
        Token::GreaterGreaterEqual => AssignmentOperator::RightShiftAssign,
        Token::GreaterGreaterGreaterEqual => AssignmentOperator::UnsignedRightShiftAssign,
        Token::AmpAmpEqual => AssignmentOperator::AndAssign,
        Token::PipePipeEqual => AssignmentOperator::OrAssign,
        Token::QuestionQuestionEqual => AssignmentOperator::NullishAssign,
        _ => AssignmentOperator::Assign,
    }
}

// ============================================================================
// Arrow Functions
// ============================================================================

/// Parse an arrow function if one starts here.
///
/// Handles `x => ...`, `async x => ...`, `(a, b) => ...` and
/// `(a): T => ...`; anything else leaves the parser untouched.
fn try_parse_arrow(parser: &mut Parser) -> Result<Option<Expression>, ParseError> {
    let is_async = parser.check(&Token::Async)
        && matches!(
            parser.peek(),
            Some(Token::Identifier(_)) | Some(Token::LeftParen)
        );
    let offset = usize::from(is_async);

    let single_param = matches!(parser.peek_nth(offset), Some(Token::Identifier(_)))
        && matches!(parser.peek_nth(offset + 1), Some(Token::Arrow));
    if single_param {
        let start = parser.current_span();
        if is_async {
            parser.advance();
        }
        let id = parser.expect_identifier()?;
        parser.expect(Token::Arrow)?;
        let params = vec![Parameter {
            pattern: Pattern::Identifier(id),
            type_annotation: None,
            default_value: None,
            optional: false,
            is_rest: false,
            property: None,
            span: id.span,
        }];
        return parse_arrow_body(parser, start, params, None, is_async).map(Some);
    }

    if !matches!(parser.peek_nth(offset), Some(Token::LeftParen)) {
        return Ok(None);
    }
    let after = match token_after_parens(parser, offset) {
        Some(token) => token,
        None => return Ok(None),
    };
    if !matches!(after, Token::Arrow | Token::Colon) {
        return Ok(None);
    }

    let checkpoint = parser.checkpoint();
    let start = parser.current_span();
    let attempt = (|| -> Result<Expression, ParseError> {
        if is_async {
            parser.advance();
        }
        let params = pattern::parse_parameters(parser)?;
        let return_type = if parser.eat(&Token::Colon) {
            Some(types::parse_return_type(parser)?)
        } else {
            None
        };
        parser.expect(Token::Arrow)?;
        parse_arrow_body(parser, start, params, return_type, is_async)
    })();

    match attempt {
        Ok(arrow) => Ok(Some(arrow)),
        // `(a) : b` inside a conditional is not an arrow
        Err(_) if matches!(after, Token::Colon) => {
            parser.rewind(checkpoint);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// The token following the parenthesis group that starts `offset` tokens ahead.
fn token_after_parens(parser: &Parser, offset: usize) -> Option<Token> {
    let mut depth = 0usize;
    let mut n = offset;
    loop {
        match parser.peek_nth(n)? {
            Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
            Token::RightParen | Token::RightBracket | Token::RightBrace => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return parser.peek_nth(n + 1).cloned();
                }
            }
            Token::Eof => return None,
            _ => {}
        }
        n += 1;
    }
}

fn parse_arrow_body(
    parser: &mut Parser,
    start: Span,
    params: Vec<Parameter>,
    return_type: Option<TypeAnnotation>,
    is_async: bool,
) -> Result<Expression, ParseError> {
    let body = if parser.check(&Token::LeftBrace) {
        ArrowBody::Block(stmt::parse_block(parser)?)
    } else {
        ArrowBody::Expression(Box::new(parse_assignment(parser)?))
    };
    let span = parser.span_from(&start);
    Ok(Expression::Arrow(ArrowFunction {
        params,
        return_type,
        body,
        is_async,
        span,
    }))
}

fn parse_yield(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Yield)?;
    let delegate = parser.eat(&Token::Star);
    let ends_here = parser.newline_before()
        || parser.check_any(&[
            Token::RightParen,
            Token::RightBracket,
            Token::RightBrace,
            Token::Comma,
            Token::Semicolon,
            Token::Colon,
            Token::Eof,
        ]);
    let argument = if ends_here {
        None
    } else {
        Some(Box::new(parse_assignment(parser)?))
    };
    let span = parser.span_from(&start);
    Ok(Expression::Yield(YieldExpression {
        argument,
        delegate,
        span,
    }))
}

// ============================================================================
// Conditional and Binary Expressions
// ============================================================================

fn parse_conditional(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    let test = parse_binary(parser, Precedence::NullCoalescing)?;
    if !parser.eat(&Token::Question) {
        return Ok(test);
    }

    let saved_in = std::mem::replace(&mut parser.allow_in, true);
    let consequent = parse_assignment(parser);
    parser.allow_in = saved_in;
    let consequent = consequent?;

    parser.expect(Token::Colon)?;
    let alternate = parse_assignment(parser)?;
    let span = parser.combine_spans(&start, alternate.span());
    Ok(Expression::Conditional(ConditionalExpression {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
        span,
    }))
}

/// Precedence climbing over binary, logical, `instanceof` and `as`.
fn parse_binary(parser: &mut Parser, min: Precedence) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    let mut left = parse_unary(parser)?;

    loop {
        let op = parser.current().clone();
        let prec = get_precedence(&op, parser.allow_in);
        if prec == Precedence::None || prec < min {
            break;
        }
        parser.advance();

        match op {
            Token::As => {
                if parser.eat(&Token::Const) {
                    // `as const` only narrows literal types
                    continue;
                }
                let target_type = types::parse_type(parser)?;
                let span = parser.span_from(&start);
                left = Expression::TypeCast(TypeCastExpression {
                    object: Box::new(left),
                    target_type,
                    span,
                });
                continue;
            }
            Token::Instanceof => {
                let class = parse_binary(parser, prec.next())?;
                let span = parser.combine_spans(&start, class.span());
                left = Expression::InstanceOf(InstanceOfExpression {
                    object: Box::new(left),
                    class: Box::new(class),
                    span,
                });
                continue;
            }
            _ => {}
        }

        let next_min = if is_right_associative(&op) {
            prec
        } else {
            prec.next()
        };
        let right = parse_binary(parser, next_min)?;
        let span = parser.combine_spans(&start, right.span());

        left = match op {
            Token::AmpAmp | Token::PipePipe | Token::QuestionQuestion => {
                let operator = match op {
                    Token::AmpAmp => LogicalOperator::And,
                    Token::PipePipe => LogicalOperator::Or,
                    _ => LogicalOperator::NullishCoalescing,
                };
                Expression::Logical(LogicalExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                })
            }
            other => Expression::Binary(BinaryExpression {
                operator: binary_operator(&other),
                left: Box::new(left),
                right: Box::new(right),
                span,
            }),
        };
    }

    Ok(left)
}

fn binary_operator(token: &Token) -> BinaryOperator {
    match token {
        Token::Plus => BinaryOperator::Add,
        Token::Minus => BinaryOperator::Subtract,
        Token::Star => BinaryOperator::Multiply,
        Token::Slash => BinaryOperator::Divide,
        Token::Percent => BinaryOperator::Modulo,
        Token::StarStar => BinaryOperator::Exponent,
        Token::EqualEqual => BinaryOperator::Equal,
        Token::BangEqual => BinaryOperator::NotEqual,
        Token::EqualEqualEqual => BinaryOperator::StrictEqual,
        Token::BangEqualEqual => BinaryOperator::StrictNotEqual,
        Token::Less => BinaryOperator::LessThan,
        Token::LessEqual => BinaryOperator::LessEqual,
        Token::Greater => BinaryOperator::GreaterThan,
        Token::GreaterEqual => BinaryOperator::GreaterEqual,
        Token::Amp => BinaryOperator::BitwiseAnd,
        Token::Pipe => BinaryOperator::BitwiseOr,
        Token::Caret => BinaryOperator::BitwiseXor,
        Token::LessLess => BinaryOperator::LeftShift,
        Token::GreaterGreater => BinaryOperator::RightShift,
        Token::GreaterGreaterGreater => BinaryOperator::UnsignedRightShift,
        _ => BinaryOperator::In,
    }
}

// ============================================================================
// Unary and Postfix Expressions
// ============================================================================

fn parse_unary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    let operator = match parser.current() {
        Token::Bang => Some(UnaryOperator::Not),
        Token::Minus => Some(UnaryOperator::Minus),
        Token::Plus => Some(UnaryOperator::Plus),
        Token::Tilde => Some(UnaryOperator::BitwiseNot),
        Token::Void => Some(UnaryOperator::Void),
        Token::Delete => Some(UnaryOperator::Delete),
        _ => None,
    };
    if let Some(operator) = operator {
        parser.advance();
        let operand = parse_unary(parser)?;
        let span = parser.combine_spans(&start, operand.span());
        return Ok(Expression::Unary(UnaryExpression {
            operator,
            operand: Box::new(operand),
            span,
        }));
    }

    match parser.current() {
        Token::Typeof => {
            parser.advance();
            let argument = parse_unary(parser)?;
            let span = parser.combine_spans(&start, argument.span());
            Ok(Expression::Typeof(TypeofExpression {
                argument: Box::new(argument),
                span,
            }))
        }
        Token::Await => {
            parser.advance();
            let argument = parse_unary(parser)?;
            let span = parser.combine_spans(&start, argument.span());
            Ok(Expression::Await(AwaitExpression {
                argument: Box::new(argument),
                span,
            }))
        }
        Token::PlusPlus | Token::MinusMinus => {
            let operator = if parser.check(&Token::PlusPlus) {
                UpdateOperator::Increment
            } else {
                UpdateOperator::Decrement
            };
            parser.advance();
            let argument = parse_unary(parser)?;
            let span = parser.combine_spans(&start, argument.span());
            Ok(Expression::Update(UpdateExpression {
                operator,
                prefix: true,
                argument: Box::new(argument),
                span,
            }))
        }
        _ => parse_postfix(parser),
    }
}

fn parse_postfix(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    let expression = parse_left_hand_side(parser)?;

    let operator = match parser.current() {
        Token::PlusPlus => UpdateOperator::Increment,
        Token::MinusMinus => UpdateOperator::Decrement,
        _ => return Ok(expression),
    };
    if parser.newline_before() {
        return Ok(expression);
    }
    parser.advance();
    let span = parser.span_from(&start);
    Ok(Expression::Update(UpdateExpression {
        operator,
        prefix: false,
        argument: Box::new(expression),
        span,
    }))
}

/// Calls, member and index accesses, non-null assertions.
fn parse_left_hand_side(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    let mut expression = if parser.check(&Token::New) {
        parse_new(parser)?
    } else {
        parse_primary(parser)?
    };

    loop {
        match parser.current() {
            Token::Dot => {
                parser.advance();
                let property = parser.expect_property_name()?;
                let span = parser.span_from(&start);
                expression = Expression::Member(MemberExpression {
                    object: Box::new(expression),
                    property,
                    optional: false,
                    span,
                });
            }
            Token::QuestionDot => {
                parser.advance();
                expression = match parser.current() {
                    Token::LeftParen => finish_call(parser, start, expression, true)?,
                    Token::LeftBracket => finish_index(parser, start, expression, true)?,
                    _ => {
                        let property = parser.expect_property_name()?;
                        let span = parser.span_from(&start);
                        Expression::Member(MemberExpression {
                            object: Box::new(expression),
                            property,
                            optional: true,
                            span,
                        })
                    }
                };
            }
            Token::LeftBracket => {
                expression = finish_index(parser, start, expression, false)?;
            }
            Token::LeftParen => {
                expression = finish_call(parser, start, expression, false)?;
            }
            Token::Bang if !parser.newline_before() => {
                parser.advance();
                let span = parser.span_from(&start);
                expression = Expression::NonNull(NonNullExpression {
                    expression: Box::new(expression),
                    span,
                });
            }
            _ => break,
        }
    }

    Ok(expression)
}

fn finish_call(
    parser: &mut Parser,
    start: Span,
    callee: Expression,
    optional: bool,
) -> Result<Expression, ParseError> {
    let arguments = parse_arguments(parser)?;
    let span = parser.span_from(&start);
    Ok(Expression::Call(CallExpression {
        callee: Box::new(callee),
        type_args: Vec::new(),
        arguments,
        optional,
        span,
    }))
}

fn finish_index(
    parser: &mut Parser,
    start: Span,
    object: Expression,
    optional: bool,
) -> Result<Expression, ParseError> {
    parser.expect(Token::LeftBracket)?;
    let saved_in = std::mem::replace(&mut parser.allow_in, true);
    let index = parse_expression(parser);
    parser.allow_in = saved_in;
    let index = index?;
    parser.expect(Token::RightBracket)?;
    let span = parser.span_from(&start);
    Ok(Expression::Index(IndexExpression {
        object: Box::new(object),
        index: Box::new(index),
        optional,
        span,
    }))
}

fn parse_new(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::New)?;

    let mut callee = if parser.check(&Token::New) {
        parse_new(parser)?
    } else {
        parse_primary(parser)?
    };
    loop {
        match parser.current() {
            Token::Dot => {
                parser.advance();
                let property = parser.expect_property_name()?;
                let span = parser.span_from(&start);
                callee = Expression::Member(MemberExpression {
                    object: Box::new(callee),
                    property,
                    optional: false,
                    span,
                });
            }
            Token::LeftBracket => callee = finish_index(parser, start, callee, false)?,
            _ => break,
        }
    }

    let type_args = if parser.check(&Token::Less) {
        types::parse_type_arguments(parser)?
    } else {
        Vec::new()
    };
    let arguments = if parser.check(&Token::LeftParen) {
        parse_arguments(parser)?
    } else {
        Vec::new()
    };
    let span = parser.span_from(&start);
    Ok(Expression::New(NewExpression {
        callee: Box::new(callee),
        type_args,
        arguments,
        span,
    }))
}

fn parse_arguments(parser: &mut Parser) -> Result<Vec<Argument>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let saved_in = std::mem::replace(&mut parser.allow_in, true);
    let result = (|| -> Result<Vec<Argument>, ParseError> {
        let mut arguments = Vec::new();
        while !parser.check(&Token::RightParen) && !parser.at_eof() {
            if parser.eat(&Token::DotDotDot) {
                arguments.push(Argument::Spread(parse_assignment(parser)?));
            } else {
                arguments.push(Argument::Expression(parse_assignment(parser)?));
            }
            if !parser.check(&Token::RightParen) {
                parser.expect(Token::Comma)?;
            }
        }
        parser.expect(Token::RightParen)?;
        Ok(arguments)
    })();
    parser.allow_in = saved_in;
    result
}

// ============================================================================
// Primary Expressions
// ============================================================================

pub fn parse_primary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let span = parser.current_span();
    match parser.current().clone() {
        Token::IntLiteral(value) => {
            parser.advance();
            Ok(Expression::IntLiteral(IntLiteral { value, span }))
        }
        Token::FloatLiteral(value) => {
            parser.advance();
            Ok(Expression::FloatLiteral(FloatLiteral { value, span }))
        }
        Token::BigIntLiteral(digits) => {
            parser.advance();
            Ok(Expression::BigIntLiteral(BigIntLiteral { digits, span }))
        }
        Token::StringLiteral(value) => {
            parser.advance();
            Ok(Expression::StringLiteral(StringLiteral { value, span }))
        }
        Token::RegexLiteral(pattern) => {
            parser.advance();
            Ok(Expression::RegexLiteral(RegexLiteral { pattern, span }))
        }
        Token::TemplateLiteral(parts) => {
            parser.advance();
            parse_template(parser, parts, span)
        }
        Token::True | Token::False => {
            let value = parser.check(&Token::True);
            parser.advance();
            Ok(Expression::BooleanLiteral(BooleanLiteral { value, span }))
        }
        Token::Null => {
            parser.advance();
            Ok(Expression::NullLiteral(span))
        }
        Token::This => {
            parser.advance();
            Ok(Expression::This(span))
        }
        Token::Super => {
            parser.advance();
            Ok(Expression::Super(span))
        }
        Token::LeftParen => {
            parser.advance();
            let saved_in = std::mem::replace(&mut parser.allow_in, true);
            let expression = parse_expression(parser);
            parser.allow_in = saved_in;
            let expression = expression?;
            parser.expect(Token::RightParen)?;
            let span = parser.span_from(&span);
            Ok(Expression::Parenthesized(ParenthesizedExpression {
                expression: Box::new(expression),
                span,
            }))
        }
        Token::LeftBracket => parse_array_literal(parser),
        Token::LeftBrace => parse_object_literal(parser),
        Token::Function => parse_function_expression(parser, false),
        Token::Async if matches!(parser.peek(), Some(Token::Function)) => {
            parser.advance();
            parse_function_expression(parser, true)
        }
        _ if parser.at_binding_identifier() => {
            let id = parser.expect_identifier()?;
            Ok(Expression::Identifier(id))
        }
        _ => Err(parser.unexpected_token(&[
            Token::Identifier(crate::parser::interner::Symbol::dummy()),
            Token::LeftParen,
            Token::LeftBracket,
            Token::LeftBrace,
        ])),
    }
}

fn parse_template(
    parser: &mut Parser,
    parts: Vec<TemplatePart>,
    span: Span,
) -> Result<Expression, ParseError> {
    let end = Span::new(span.end, span.end, span.line, span.column);
    let mut elements = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            TemplatePart::String(text) => elements.push(TemplateElement::String(text)),
            TemplatePart::Expression(tokens) => {
                let expression = parser.parse_embedded_expression(tokens, end)?;
                elements.push(TemplateElement::Expression(Box::new(expression)));
            }
        }
    }
    Ok(Expression::TemplateLiteral(TemplateLiteral {
        parts: elements,
        span,
    }))
}

fn parse_array_literal(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBracket)?;
    let saved_in = std::mem::replace(&mut parser.allow_in, true);

    let result = (|| -> Result<Vec<Option<ArrayElement>>, ParseError> {
        let mut elements = Vec::new();
        while !parser.check(&Token::RightBracket) && !parser.at_eof() {
            if parser.eat(&Token::Comma) {
                elements.push(None);
                continue;
            }
            let element = if parser.eat(&Token::DotDotDot) {
                ArrayElement::Spread(parse_assignment(parser)?)
            } else {
                ArrayElement::Expression(parse_assignment(parser)?)
            };
            elements.push(Some(element));
            if !parser.check(&Token::RightBracket) {
                parser.expect(Token::Comma)?;
            }
        }
        parser.expect(Token::RightBracket)?;
        Ok(elements)
    })();
    parser.allow_in = saved_in;

    let elements = result?;
    let span = parser.span_from(&start);
    Ok(Expression::Array(ArrayExpression { elements, span }))
}

/// Parse a property key in an object literal or pattern.
pub fn parse_property_key(parser: &mut Parser) -> Result<PropertyKey, ParseError> {
    let span = parser.current_span();
    match parser.current().clone() {
        Token::StringLiteral(value) => {
            parser.advance();
            Ok(PropertyKey::StringLiteral(StringLiteral { value, span }))
        }
        Token::IntLiteral(value) => {
            parser.advance();
            Ok(PropertyKey::IntLiteral(IntLiteral { value, span }))
        }
        Token::FloatLiteral(value) => {
            parser.advance();
            let value = parser.intern(&value.to_string());
            Ok(PropertyKey::StringLiteral(StringLiteral { value, span }))
        }
        Token::LeftBracket => {
            parser.advance();
            let expression = parse_assignment(parser)?;
            parser.expect(Token::RightBracket)?;
            Ok(PropertyKey::Computed(Box::new(expression)))
        }
        _ => Ok(PropertyKey::Identifier(parser.expect_property_name()?)),
    }
}

fn parse_object_literal(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::LeftBrace)?;
    let saved_in = std::mem::replace(&mut parser.allow_in, true);

    let result = (|| -> Result<Vec<ObjectProperty>, ParseError> {
        let mut properties = Vec::new();
        while !parser.check(&Token::RightBrace) && !parser.at_eof() {
            properties.push(parse_object_property(parser)?);
            if !parser.check(&Token::RightBrace) {
                parser.expect(Token::Comma)?;
            }
        }
        parser.expect(Token::RightBrace)?;
        Ok(properties)
    })();
    parser.allow_in = saved_in;

    let properties = result?;
    let span = parser.span_from(&start);
    Ok(Expression::Object(ObjectExpression { properties, span }))
}

fn parse_object_property(parser: &mut Parser) -> Result<ObjectProperty, ParseError> {
    let start = parser.current_span();

    if parser.eat(&Token::DotDotDot) {
        let argument = parse_assignment(parser)?;
        let span = parser.span_from(&start);
        return Ok(ObjectProperty::Spread(SpreadProperty { argument, span }));
    }

    // `get x() {}`, `set x(v) {}`, `async m() {}`
    let is_prefixed = (parser.check_word("get")
        || parser.check_word("set")
        || parser.check(&Token::Async))
        && !matches!(
            parser.peek(),
            Some(
                Token::Colon | Token::LeftParen | Token::Comma | Token::RightBrace | Token::Equal
            )
        );
    let is_async = is_prefixed && parser.check(&Token::Async);
    if is_prefixed {
        parser.advance();
    }
    let is_generator = parser.eat(&Token::Star);

    let key = parse_property_key(parser)?;

    if parser.check(&Token::LeftParen) || parser.check(&Token::Less) {
        let function = stmt::parse_function_rest(parser, start, None, is_async, is_generator)?;
        let span = function.span;
        let value = Expression::Function(FunctionExpression {
            function: Box::new(function),
            span,
        });
        return Ok(ObjectProperty::Property(Property {
            key,
            value,
            shorthand: false,
            span,
        }));
    }

    if parser.eat(&Token::Colon) {
        let value = parse_assignment(parser)?;
        let span = parser.span_from(&start);
        return Ok(ObjectProperty::Property(Property {
            key,
            value,
            shorthand: false,
            span,
        }));
    }

    let PropertyKey::Identifier(id) = key else {
        return Err(parser.unexpected_token(&[Token::Colon]));
    };
    let mut value = Expression::Identifier(id);
    // `{ a = 1 } = source` carries a default in shorthand position
    if parser.eat(&Token::Equal) {
        let default = parse_assignment(parser)?;
        let span = parser.span_from(&start);
        value = Expression::Assignment(AssignmentExpression {
            operator: AssignmentOperator::Assign,
            left: Box::new(value),
            right: Box::new(default),
            span,
        });
    }
    let span = parser.span_from(&start);
    Ok(ObjectProperty::Property(Property {
        key: PropertyKey::Identifier(id),
        value,
        shorthand: true,
        span,
    }))
}

fn parse_function_expression(parser: &mut Parser, is_async: bool) -> Result<Expression, ParseError> {
    let start = parser.current_span();
    parser.expect(Token::Function)?;
    let is_generator = parser.eat(&Token::Star);
    let name = if parser.at_binding_identifier() {
        Some(parser.expect_identifier()?)
    } else {
        None
    };
    let function = stmt::parse_function_rest(parser, start, name, is_async, is_generator)?;
    let span = function.span;
    Ok(Expression::Function(FunctionExpression {
        function: Box::new(function),
        span,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::interner::Interner;

    fn parse_expr(source: &str) -> (Expression, Interner) {
        let (module, interner) = Parser::new(source)
            .expect("lexer error")
            .parse()
            .expect("parse error");
        match module.statements.into_iter().next() {
            Some(Statement::Expression(stmt)) => (stmt.expression, interner),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let (expr, _) = parse_expr("a + b * c;");
        let Expression::Binary(add) = expr else {
            panic!("expected binary");
        };
        assert_eq!(add.operator, BinaryOperator::Add);
        assert!(matches!(*add.right, Expression::Binary(ref m) if m.operator == BinaryOperator::Multiply));
    }

    #[test]
    fn test_exponent_right_associative() {
        let (expr, _) = parse_expr("a ** b ** c;");
        let Expression::Binary(outer) = expr else {
            panic!("expected binary");
        };
        assert!(matches!(*outer.left, Expression::Identifier(_)));
        assert!(matches!(*outer.right, Expression::Binary(_)));
    }

    #[test]
    fn test_arrow_functions() {
        let (expr, _) = parse_expr("(a: number, b) => a + b;");
        let Expression::Arrow(arrow) = expr else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 2);
        assert!(matches!(arrow.body, ArrowBody::Expression(_)));

        let (expr, _) = parse_expr("async x => { await x; };");
        assert!(matches!(expr, Expression::Arrow(ArrowFunction { is_async: true, .. })));
    }

    #[test]
    fn test_parenthesized_is_not_arrow() {
        let (expr, _) = parse_expr("c ? (a) : b;");
        assert!(matches!(expr, Expression::Conditional(_)));
    }

    #[test]
    fn test_member_call_chain() {
        let (expr, interner) = parse_expr("obj?.items[0].map(x => x)!;");
        let Expression::NonNull(non_null) = expr else {
            panic!("expected non-null assertion");
        };
        let Expression::Call(call) = *non_null.expression else {
            panic!("expected call");
        };
        let Expression::Member(member) = *call.callee else {
            panic!("expected member");
        };
        assert_eq!(interner.resolve(member.property.name), "map");
    }

    #[test]
    fn test_template_literal_parts() {
        let (expr, interner) = parse_expr("`sum: ${a + b}!`;");
        let Expression::TemplateLiteral(template) = expr else {
            panic!("expected template");
        };
        assert_eq!(template.parts.len(), 3);
        match &template.parts[0] {
            TemplateElement::String(sym) => assert_eq!(interner.resolve(*sym), "sum: "),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&template.parts[1], TemplateElement::Expression(e) if matches!(**e, Expression::Binary(_))));
    }

    #[test]
    fn test_array_holes_and_spread() {
        let (expr, _) = parse_expr("[1, , ...rest];");
        let Expression::Array(array) = expr else {
            panic!("expected array");
        };
        assert_eq!(array.elements.len(), 3);
        assert!(array.elements[1].is_none());
        assert!(matches!(array.elements[2], Some(ArrayElement::Spread(_))));
    }

    #[test]
    fn test_object_literal_forms() {
        let (expr, _) = parse_expr("({ a, b: 1, [k]: 2, m() { return 1; }, ...rest });");
        let Expression::Parenthesized(paren) = expr else {
            panic!("expected parenthesized");
        };
        let Expression::Object(object) = *paren.expression else {
            panic!("expected object");
        };
        assert_eq!(object.properties.len(), 5);
        assert!(matches!(&object.properties[0], ObjectProperty::Property(p) if p.shorthand));
        assert!(matches!(&object.properties[3], ObjectProperty::Property(p) if matches!(p.value, Expression::Function(_))));
        assert!(matches!(&object.properties[4], ObjectProperty::Spread(_)));
    }

    #[test]
    fn test_new_with_type_arguments() {
        let (expr, _) = parse_expr("new Map<string, Array<number>>();");
        let Expression::New(new) = expr else {
            panic!("expected new");
        };
        assert_eq!(new.type_args.len(), 2);
    }

    #[test]
    fn test_compound_assignment_and_update() {
        let (expr, _) = parse_expr("arr[f()] += 1;");
        assert!(matches!(expr, Expression::Assignment(AssignmentExpression { operator: AssignmentOperator::AddAssign, .. })));
        let (expr, _) = parse_expr("i++;");
        assert!(matches!(expr, Expression::Update(UpdateExpression { prefix: false, .. })));
    }

    #[test]
    fn test_instanceof_and_cast() {
        let (expr, _) = parse_expr("x instanceof Foo && (y as Bar) != null;");
        let Expression::Logical(logical) = expr else {
            panic!("expected logical");
        };
        assert!(matches!(*logical.left, Expression::InstanceOf(_)));
    }
}
