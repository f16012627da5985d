use logos::{Lexer as LogosLexer, Logos};
use logos_iter::{LogosIter, PeekableLexer};
use std::fmt;

pub(crate) type Lexer<'a> = PeekableLexer<'a, LogosLexer<'a, TokenKind>, TokenKind>;

pub(crate) fn lexer(s: &str) -> Lexer {
    TokenKind::lexer(s).peekable_lexer()
}

#[derive(Logos, Debug, Copy, Clone, Eq, PartialEq)]
pub enum TokenKind {
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"([0-9]+\.[0-9]*)|(\.[0-9]+)")]
    Decimal,

    #[regex(r"([1-9][0-9]*)?[dD](%|[1-9][0-9]*)")]
    Dice,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,

    #[token("k")]
    Keep,
    #[token("p")]
    Drop,
    #[token("rr")]
    Reroll,
    #[token("ro")]
    RerollOnce,
    #[token("ra")]
    ExplodeOnce,
    #[token("e")]
    Explode,
    #[token("mi")]
    Minimum,
    #[token("ma")]
    Maximum,

    #[token("h")]
    Highest,
    #[token("l")]
    Lowest,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,

    #[regex(r"0[dD](%|[0-9]+)")]
    #[regex(r"([1-9][0-9]*)?[dD]0+")]
    ErrBadDice,

    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[error]
    Error,
}

impl TokenKind {
    pub const SIGNS: &'static [Self] = &[Self::Plus, Self::Minus];

    pub const TERMS: &'static [Self] = &[Self::Dice, Self::Integer, Self::Decimal];

    pub const DICE_OPS: &'static [Self] = &[
        Self::Keep,
        Self::Drop,
        Self::Reroll,
        Self::RerollOnce,
        Self::ExplodeOnce,
        Self::Explode,
        Self::Minimum,
        Self::Maximum,
    ];

    pub const SELECTORS: &'static [Self] = &[
        Self::Highest,
        Self::Lowest,
        Self::LessThan,
        Self::GreaterThan,
        // a bare integer selects faces equal to it
        Self::Integer,
    ];

    pub fn as_str(&self) -> &'static str {
        use TokenKind::*;

        match self {
            Integer => "<integer>",
            Decimal => "<decimal>",
            Dice => "<dice>",
            Plus => "'+'",
            Minus => "'-'",
            Keep => "'k'",
            Drop => "'p'",
            Reroll => "'rr'",
            RerollOnce => "'ro'",
            ExplodeOnce => "'ra'",
            Explode => "'e'",
            Minimum => "'mi'",
            Maximum => "'ma'",
            Highest => "'h'",
            Lowest => "'l'",
            LessThan => "'<'",
            GreaterThan => "'>'",
            ErrBadDice | Error => "<error>",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
