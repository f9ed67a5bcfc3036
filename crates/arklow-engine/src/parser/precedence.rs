//! Operator precedence table for expression parsing.
//!
//! Follows the TypeScript precedence rules. Assignment and the conditional
//! operator are parsed by dedicated functions, so only binary operators
//! appear here.

use crate::parser::token::Token;

/// Operator precedence level (higher = tighter binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    NullCoalescing = 1,  // ??
    LogicalOr = 2,       // ||
    LogicalAnd = 3,      // &&
    BitwiseOr = 4,       // |
    BitwiseXor = 5,      // ^
    BitwiseAnd = 6,      // &
    Equality = 7,        // ==, !=, ===, !==
    Relational = 8,      // <, >, <=, >=, instanceof, in, as
    Shift = 9,           // <<, >>, >>>
    Additive = 10,       // +, -
    Multiplicative = 11, // *, /, %
    Exponentiation = 12, // **
}

impl Precedence {
    /// The next tighter level, used for left-associative operators.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::NullCoalescing,
            Precedence::NullCoalescing => Precedence::LogicalOr,
            Precedence::LogicalOr => Precedence::LogicalAnd,
            Precedence::LogicalAnd => Precedence::BitwiseOr,
            Precedence::BitwiseOr => Precedence::BitwiseXor,
            Precedence::BitwiseXor => Precedence::BitwiseAnd,
            Precedence::BitwiseAnd => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Shift,
            Precedence::Shift => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative | Precedence::Exponentiation => {
                Precedence::Exponentiation
            }
        }
    }
}

/// Get the precedence of a binary operator token.
///
/// `allow_in` is false while parsing the head of a `for` statement, where
/// `in` starts a for-in loop instead of being an operator.
pub fn get_precedence(token: &Token, allow_in: bool) -> Precedence {
    match token {
        Token::QuestionQuestion => Precedence::NullCoalescing,
        Token::PipePipe => Precedence::LogicalOr,
        Token::AmpAmp => Precedence::LogicalAnd,
        Token::Pipe => Precedence::BitwiseOr,
        Token::Caret => Precedence::BitwiseXor,
        Token::Amp => Precedence::BitwiseAnd,
        Token::EqualEqual | Token::BangEqual | Token::EqualEqualEqual | Token::BangEqualEqual => {
            Precedence::Equality
        }
        Token::Less
        | Token::LessEqual
        | Token::Greater
        | Token::GreaterEqual
        | Token::Instanceof
        | Token::As => Precedence::Relational,
        Token::In if allow_in => Precedence::Relational,
        Token::LessLess | Token::GreaterGreater | Token::GreaterGreaterGreater => Precedence::Shift,
        Token::Plus | Token::Minus => Precedence::Additive,
        Token::Star | Token::Slash | Token::Percent => Precedence::Multiplicative,
        Token::StarStar => Precedence::Exponentiation,
        _ => Precedence::None,
    }
}

/// Check if an operator is right-associative.
pub fn is_right_associative(token: &Token) -> bool {
    matches!(token, Token::StarStar)
}

/// True for `=` and every compound assignment operator.
pub fn is_assignment_operator(token: &Token) -> bool {
    matches!(
        token,
        Token::Equal
            | Token::PlusEqual
            | Token::MinusEqual
            | Token::StarEqual
            | Token::StarStarEqual
            | Token::SlashEqual
            | Token::PercentEqual
            | Token::AmpEqual
            | Token::PipeEqual
            | Token::CaretEqual
            | Token::LessLessEqual
            | Token::GreaterGreaterEqual
            | Token::GreaterGreaterGreaterEqual
            | Token::AmpAmpEqual
            | Token::PipePipeEqual
            | Token::QuestionQuestionEqual
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicative_binds_tighter() {
        assert!(
            get_precedence(&Token::Star, true) > get_precedence(&Token::Plus, true)
        );
    }

    #[test]
    fn test_in_disabled_in_for_head() {
        assert_eq!(get_precedence(&Token::In, false), Precedence::None);
        assert_eq!(get_precedence(&Token::In, true), Precedence::Relational);
    }

    #[test]
    fn test_assignment_operators() {
        assert!(is_assignment_operator(&Token::QuestionQuestionEqual));
        assert!(!is_assignment_operator(&Token::EqualEqual));
    }
}
