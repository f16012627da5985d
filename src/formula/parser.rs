use super::ast::{Expr, Function};
use super::lexer::{lexer, Lexer, TokenKind};
use crate::common::Float;
use logos_iter::LogosIter;
use std::fmt;
use std::ops::Range;

type PResult<T = Expr> = Result<T, ParseError>;

/// How deep a formula's tree may grow before it is rejected.
pub const MAX_DEPTH: usize = 256;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("error at position {} ({slice:?}): {kind}", .span.start)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub slice: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken {
        found: Option<TokenKind>,
        expected: Vec<TokenKind>,
    },
    UnexpectedString {
        expected: Vec<TokenKind>,
    },
    UnknownFunction(String),
    Arity {
        func: Function,
        found: usize,
    },
    TrailingInput,
    TooDeep,
    NonFinite,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found: None, expected } => {
                write!(f, "unexpected end of input, expected ")?;
                fmt_expected(expected, f)
            }
            Self::UnexpectedToken {
                found: Some(found),
                expected,
            } => {
                write!(f, "unexpected token: found {}, expected ", found)?;
                fmt_expected(expected, f)
            }
            Self::UnexpectedString { expected } => {
                write!(f, "expected ")?;
                fmt_expected(expected, f)
            }
            Self::UnknownFunction(name) => write!(f, "{:?} is not an allowed function", name),
            Self::Arity { func, found } => match func.arity() {
                Some(n) => write!(f, "{} takes {} argument(s), found {}", func, n, found),
                None => write!(f, "{} takes at least one argument", func),
            },
            Self::TrailingInput => write!(f, "unexpected input after the end of the formula"),
            Self::NonFinite => write!(f, "number is too large"),
            Self::TooDeep => write!(f, "formula nests deeper than {} levels", MAX_DEPTH),
        }
    }
}

fn fmt_expected(expected: &[TokenKind], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expected {
        [] => Ok(()),
        [a] => f.write_str(a.as_str()),
        [a, b] => write!(f, "{} or {}", a, b),
        [init @ .., last] => {
            for exp in init {
                write!(f, "{}, ", exp)?;
            }
            write!(f, "or {}", last)
        }
    }
}

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            lexer: lexer(s),
            depth: 0,
        }
    }

    pub fn parse(mut self) -> PResult {
        let expr = self.parse_comparison()?;
        if self.lexer.peek().is_some() {
            self.lexer.next();
            return self.error(ParseErrorKind::TrailingInput);
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        self.lexer.next()
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        self.lexer.peek().map_or(false, |&peeked| peeked == kind)
    }

    fn matches_any(&mut self, options: &[TokenKind]) -> Option<TokenKind> {
        self.lexer
            .peek()
            .copied()
            .filter(|peeked| options.contains(peeked))
    }

    fn consume(&mut self, expected: TokenKind) -> PResult<()> {
        if self.matches(expected) {
            self.advance();
            Ok(())
        } else {
            self.unexpected_token(vec![expected])
        }
    }

    fn error<T>(&mut self, kind: ParseErrorKind) -> PResult<T> {
        Err(ParseError {
            kind,
            span: self.lexer.span(),
            slice: self.lexer.slice().to_string(),
        })
    }

    /// Steps one level down the tree being built.
    fn descend(&mut self) -> PResult<()> {
        if self.depth >= MAX_DEPTH {
            return self.error(ParseErrorKind::TooDeep);
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn unexpected_token<T>(&mut self, expected: Vec<TokenKind>) -> PResult<T> {
        let found = self.advance();
        if found == Some(TokenKind::Error) {
            self.error(ParseErrorKind::UnexpectedString { expected })
        } else {
            self.error(ParseErrorKind::UnexpectedToken { found, expected })
        }
    }

    fn parse_comparison(&mut self) -> PResult {
        let start = self.depth;
        let mut lhs = self.parse_addition()?;

        while let Some(op) = self.matches_any(TokenKind::COMPARISON_OPS) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_addition()?;
            lhs = binary(op, lhs, rhs);
        }

        self.depth = start;
        Ok(lhs)
    }

    fn parse_addition(&mut self) -> PResult {
        let start = self.depth;
        let mut lhs = self.parse_multiplication()?;

        while let Some(op) = self.matches_any(TokenKind::ADDITION_OPS) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_multiplication()?;
            lhs = binary(op, lhs, rhs);
        }

        self.depth = start;
        Ok(lhs)
    }

    fn parse_multiplication(&mut self) -> PResult {
        let start = self.depth;
        let mut lhs = self.parse_unary_prefix()?;

        while let Some(op) = self.matches_any(TokenKind::MULTIPLICATION_OPS) {
            self.advance();
            self.descend()?;
            let rhs = self.parse_unary_prefix()?;
            lhs = binary(op, lhs, rhs);
        }

        self.depth = start;
        Ok(lhs)
    }

    fn parse_unary_prefix(&mut self) -> PResult {
        match self
            .matches_any(TokenKind::UNARY_OPS)
            .and_then(|kind| kind.as_unary_op())
        {
            Some(op) => {
                self.advance();
                self.descend()?;
                let rhs = self.parse_unary_prefix()?;
                self.ascend();
                Ok(Expr::unary(op, rhs))
            }
            None => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> PResult {
        match self.lexer.peek() {
            Some(TokenKind::LeftParen) => self.parse_grouping(),
            Some(TokenKind::Integer | TokenKind::Decimal) => self.parse_number(),
            Some(TokenKind::Ident) => self.parse_call(),
            _ => self.unexpected_token(TokenKind::ATOMS.to_vec()),
        }
    }

    fn parse_grouping(&mut self) -> PResult {
        self.consume(TokenKind::LeftParen)?;
        self.descend()?;
        let inner = self.parse_comparison()?;
        self.ascend();
        self.consume(TokenKind::RightParen)?;
        Ok(Expr::grouping(inner))
    }

    fn parse_number(&mut self) -> PResult {
        self.advance();
        match self.lexer.slice().parse::<Float>() {
            Ok(x) if x.is_finite() => Ok(Expr::literal(x)),
            Ok(_) => self.error(ParseErrorKind::NonFinite),
            Err(_) => self.unexpected_token(vec![TokenKind::Integer, TokenKind::Decimal]),
        }
    }

    fn parse_call(&mut self) -> PResult {
        self.consume(TokenKind::Ident)?;
        let name = self.lexer.slice();
        let func = match name.parse::<Function>() {
            Ok(func) => func,
            Err(()) => {
                let name = name.to_string();
                return self.error(ParseErrorKind::UnknownFunction(name));
            }
        };

        self.consume(TokenKind::LeftParen)?;
        self.descend()?;
        let mut args = Vec::new();
        if !self.matches(TokenKind::RightParen) {
            args.push(self.parse_comparison()?);
            while self.matches(TokenKind::Comma) {
                self.advance();
                args.push(self.parse_comparison()?);
            }
        }
        self.ascend();
        self.consume(TokenKind::RightParen)?;

        if !func.accepts(args.len()) {
            return self.error(ParseErrorKind::Arity {
                func,
                found: args.len(),
            });
        }
        Ok(Expr::call(func, args))
    }
}

fn binary(op: TokenKind, lhs: Expr, rhs: Expr) -> Expr {
    match op.as_binary_op() {
        Some(op) => Expr::binary(op, lhs, rhs),
        None => lhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BinaryOperator, UnaryOperator};

    fn parse(s: &str) -> PResult {
        Parser::new(s).parse()
    }

    fn check(s: &str, expected: Expr) {
        assert_eq!(parse(s).unwrap(), expected);
    }

    fn check_err(s: &str, kind: ParseErrorKind) {
        assert_eq!(parse(s).unwrap_err().kind, kind);
    }

    fn lit(x: Float) -> Expr {
        Expr::literal(x)
    }

    #[test]
    fn test_parse_numbers() {
        check("32", lit(32.0));
        check("3.25", lit(3.25));
        check(".5", lit(0.5));
    }

    #[test]
    fn test_parse_precedence() {
        check(
            "1 + 2 * 3",
            Expr::binary(
                BinaryOperator::Add,
                lit(1.0),
                Expr::binary(BinaryOperator::Mul, lit(2.0), lit(3.0)),
            ),
        );
        check(
            "-2 * 3",
            Expr::binary(
                BinaryOperator::Mul,
                Expr::unary(UnaryOperator::Neg, lit(2.0)),
                lit(3.0),
            ),
        );
    }

    #[test]
    fn test_parse_left_associative() {
        check(
            "8 - 3 - 2",
            Expr::binary(
                BinaryOperator::Sub,
                Expr::binary(BinaryOperator::Sub, lit(8.0), lit(3.0)),
                lit(2.0),
            ),
        );
        check(
            "8 / 4 / 2",
            Expr::binary(
                BinaryOperator::Div,
                Expr::binary(BinaryOperator::Div, lit(8.0), lit(4.0)),
                lit(2.0),
            ),
        );
    }

    #[test]
    fn test_parse_calls() {
        check(
            "max(1, (2))",
            Expr::call(Function::Max, vec![lit(1.0), Expr::grouping(lit(2.0))]),
        );
        check(
            "abs(-1)",
            Expr::call(Function::Abs, vec![Expr::unary(UnaryOperator::Neg, lit(1.0))]),
        );
    }

    #[test]
    fn test_parse_errors() {
        check_err("system(1)", ParseErrorKind::UnknownFunction("system".into()));
        check_err(
            "floor(1, 2)",
            ParseErrorKind::Arity {
                func: Function::Floor,
                found: 2,
            },
        );
        check_err(
            "min()",
            ParseErrorKind::Arity {
                func: Function::Min,
                found: 0,
            },
        );
        check_err("1 2", ParseErrorKind::TrailingInput);
        check_err(
            "1 +",
            ParseErrorKind::UnexpectedToken {
                found: None,
                expected: TokenKind::ATOMS.to_vec(),
            },
        );
        check_err("x = 1", ParseErrorKind::UnknownFunction("x".into()));
        check_err(
            "1 + @str",
            ParseErrorKind::UnexpectedString {
                expected: TokenKind::ATOMS.to_vec(),
            },
        );
        check_err(&"9".repeat(400), ParseErrorKind::NonFinite);
    }

    #[test]
    fn test_parse_depth_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert!(parse(&nested(MAX_DEPTH)).is_ok());
        check_err(&nested(MAX_DEPTH + 1), ParseErrorKind::TooDeep);
        check_err(&nested(100_000), ParseErrorKind::TooDeep);
        check_err(&format!("{}1", "-".repeat(100_000)), ParseErrorKind::TooDeep);
        check_err(&format!("1{}", " + 1".repeat(100_000)), ParseErrorKind::TooDeep);
        check_err(
            &format!("{}1{}", "abs(".repeat(1_000), ")".repeat(1_000)),
            ParseErrorKind::TooDeep,
        );
        assert!(parse(&format!("1{}", " + 1".repeat(MAX_DEPTH))).is_ok());
    }
}
