use super::{ast::*, lexer::*};
use crate::common::*;
use logos_iter::LogosIter;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

type PResult<T> = Result<T, ParseError>;

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
    BadDice,
    NumberTooLarge,
    InvalidMinMaxSelector(Selector),
    PositionalSelector(TokenKind),
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
            Self::BadDice => write!(f, "dice need at least one die and one side"),
            Self::NumberTooLarge => write!(f, "number is too large"),
            Self::InvalidMinMaxSelector(sel) => write!(
                f,
                "{} cannot be used with 'mi' or 'ma'; only a number is allowed",
                sel
            ),
            Self::PositionalSelector(op) => write!(
                f,
                "{} selects by face value; 'h' and 'l' are not allowed",
                op
            ),
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

pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { lexer: lexer(s) }
    }

    pub fn parse(mut self) -> PResult<Notation> {
        let mut parts = Vec::new();
        let mut sign = self.parse_signs();

        loop {
            let term = self.parse_term()?;
            parts.push(NotationPart::new(sign, term));

            if self.lexer.peek().is_none() {
                break;
            }
            if !self.matches_any(TokenKind::SIGNS) {
                return self.unexpected_token(TokenKind::SIGNS.to_vec());
            }
            sign = self.parse_signs();
        }

        Ok(Notation::new(parts))
    }

    fn advance(&mut self) -> Option<TokenKind> {
        self.lexer.next()
    }

    fn advance_as<T: FromStr>(&mut self) -> PResult<T> {
        self.advance();
        match self.lexer.slice().parse() {
            Ok(x) => Ok(x),
            Err(_) => self.error(ParseErrorKind::NumberTooLarge),
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        self.lexer.peek().map_or(false, |&peeked| peeked == kind)
    }

    fn matches_any(&mut self, options: &[TokenKind]) -> bool {
        self.lexer
            .peek()
            .map_or(false, |peeked| options.contains(peeked))
    }

    fn error<T>(&mut self, kind: ParseErrorKind) -> PResult<T> {
        Err(ParseError {
            kind,
            span: self.lexer.span(),
            slice: self.lexer.slice().to_string(),
        })
    }

    fn unexpected_token<T>(&mut self, expected: Vec<TokenKind>) -> PResult<T> {
        let found = self.advance();
        match found {
            Some(TokenKind::ErrBadDice) => self.error(ParseErrorKind::BadDice),
            Some(TokenKind::Error) => self.error(ParseErrorKind::UnexpectedString { expected }),
            _ => self.error(ParseErrorKind::UnexpectedToken { found, expected }),
        }
    }

    /// Folds a run of `+`/`-` into one sign; none at all is `+`.
    fn parse_signs(&mut self) -> Sign {
        let mut sign = Sign::Plus;
        while self.matches_any(TokenKind::SIGNS) {
            if self.advance() == Some(TokenKind::Minus) {
                sign = sign.then(Sign::Minus);
            }
        }
        sign
    }

    fn parse_term(&mut self) -> PResult<Term> {
        match self.lexer.peek() {
            Some(TokenKind::Dice) => self.parse_dice().map(Term::Dice),
            Some(TokenKind::Integer) => self.advance_as().map(Term::Integer),
            Some(TokenKind::Decimal) => self.advance_as().map(Term::Decimal),
            _ => self.unexpected_token(TokenKind::TERMS.to_vec()),
        }
    }

    fn parse_dice(&mut self) -> PResult<DiceGroup> {
        self.advance();
        let (num, sides) = match split_dice(self.lexer.slice()) {
            Some(x) => x,
            None => return self.error(ParseErrorKind::NumberTooLarge),
        };

        let mut ops = Vec::new();
        while self.matches_any(TokenKind::DICE_OPS) {
            ops.push(self.parse_dice_op()?);
        }
        Ok(DiceGroup::new(num, sides, ops))
    }

    fn parse_dice_op(&mut self) -> PResult<DiceOperator> {
        let op = match self.advance() {
            Some(op) => op,
            None => return self.unexpected_token(TokenKind::DICE_OPS.to_vec()),
        };
        let sel = self.parse_selector()?;

        if matches!(op, TokenKind::Minimum | TokenKind::Maximum) {
            return match sel {
                Selector::Equal(x) if op == TokenKind::Minimum => Ok(DiceOperator::Minimum(x)),
                Selector::Equal(x) => Ok(DiceOperator::Maximum(x)),
                _ => self.error(ParseErrorKind::InvalidMinMaxSelector(sel)),
            };
        }

        let sels = vec1![sel];
        let dice_op = match op {
            TokenKind::Keep => DiceOperator::Keep(sels),
            TokenKind::Drop => DiceOperator::Drop(sels),
            TokenKind::Reroll => DiceOperator::Reroll(sels),
            TokenKind::RerollOnce => DiceOperator::RerollOnce(sels),
            TokenKind::Explode => DiceOperator::Explode(sels),
            TokenKind::ExplodeOnce => DiceOperator::ExplodeOnce(sels),
            _ => return self.unexpected_token(TokenKind::DICE_OPS.to_vec()),
        };
        if dice_op.rolls_more() && !sel.is_comparison() {
            return self.error(ParseErrorKind::PositionalSelector(op));
        }
        Ok(dice_op)
    }

    fn parse_selector(&mut self) -> PResult<Selector> {
        let kind = match self.lexer.peek().copied() {
            Some(TokenKind::Integer) => return self.advance_as().map(Selector::Equal),
            Some(kind) if TokenKind::SELECTORS.contains(&kind) => {
                self.advance();
                kind
            }
            _ => return self.unexpected_token(TokenKind::SELECTORS.to_vec()),
        };

        if !self.matches(TokenKind::Integer) {
            return self.unexpected_token(vec![TokenKind::Integer]);
        }
        Ok(match kind {
            TokenKind::Highest => Selector::Highest(self.advance_as()?),
            TokenKind::Lowest => Selector::Lowest(self.advance_as()?),
            TokenKind::LessThan => Selector::Less(self.advance_as()?),
            _ => Selector::Greater(self.advance_as()?),
        })
    }
}

/// `"3d6"` into its count and sides. Fails only on counts or sides too large
/// to represent; the lexer already rejected zeroes.
fn split_dice(s: &str) -> Option<(NonZeroUInt, Sides)> {
    let (num, sides) = s.split_once(|c| c == 'd' || c == 'D')?;
    let num = if num.is_empty() {
        NonZeroUInt::new(1)?
    } else {
        num.parse().ok()?
    };
    Some((num, sides.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> PResult<Notation> {
        Parser::new(s).parse()
    }

    fn check(s: &str, expected: &str) {
        assert_eq!(parse(s).unwrap().to_string(), expected);
    }

    fn check_err(s: &str, kind: ParseErrorKind) {
        assert_eq!(parse(s).unwrap_err().kind, kind);
    }

    fn dice(num: u32, sides: Sides, ops: Vec<DiceOperator>) -> Term {
        Term::Dice(DiceGroup::new(NonZeroUInt::new(num).unwrap(), sides, ops))
    }

    fn sides(x: u32) -> Sides {
        Sides::try_from(x).unwrap()
    }

    #[test]
    fn test_parse_terms() {
        let parsed = parse("2d20kh1 + 3 - .5").unwrap();
        assert_eq!(
            parsed.parts,
            vec![
                NotationPart::new(
                    Sign::Plus,
                    dice(2, sides(20), vec![DiceOperator::Keep(vec1![Selector::Highest(1)])])
                ),
                NotationPart::new(Sign::Plus, Term::Integer(3)),
                NotationPart::new(Sign::Minus, Term::Decimal(0.5)),
            ]
        );
    }

    #[test]
    fn test_parse_dice() {
        check("d4", "1d4");
        check("2D%", "2d%");
        check("4d6p l1", "4d6pl1");
        check("10d4ro<3mi2e4", "10d4ro<3mi2e4");
        check("8d6e6e5", "8d6e6e5");
        check("3d6ra>4", "3d6ra>4");
        assert_eq!(
            parse("d%").unwrap().parts[0].term,
            dice(1, Sides::Percentile, vec![])
        );
    }

    #[test]
    fn test_parse_signs() {
        check("-1d4", "-1d4");
        check("1d20 - -1", "1d20 + 1");
        check("+-+3", "-3");
        check("1d20 --- 2", "1d20 - 2");
    }

    #[test]
    fn test_parse_errors() {
        check_err("0d6", ParseErrorKind::BadDice);
        check_err(
            "1d20 +",
            ParseErrorKind::UnexpectedToken {
                found: None,
                expected: TokenKind::TERMS.to_vec(),
            },
        );
        check_err(
            "1d20 3",
            ParseErrorKind::UnexpectedToken {
                found: Some(TokenKind::Integer),
                expected: TokenKind::SIGNS.to_vec(),
            },
        );
        check_err(
            "1d20 * 2",
            ParseErrorKind::UnexpectedString {
                expected: TokenKind::SIGNS.to_vec(),
            },
        );
        check_err("4d6mih1", ParseErrorKind::InvalidMinMaxSelector(Selector::Highest(1)));
        check_err("4d6rrl1", ParseErrorKind::PositionalSelector(TokenKind::Reroll));
        check_err(
            "4d6k",
            ParseErrorKind::UnexpectedToken {
                found: None,
                expected: TokenKind::SELECTORS.to_vec(),
            },
        );
        check_err("99999999999d6", ParseErrorKind::NumberTooLarge);
    }
}
