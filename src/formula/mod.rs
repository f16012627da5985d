//! A small arithmetic language for user-written modifiers.
//!
//! Formulas are parsed into an [`Expr`] tree and interpreted; nothing but
//! numbers, `+ - * / // %`, comparisons, parentheses and the functions in
//! [`Function::ALL`] can be expressed. Comparisons evaluate to `1` or `0`.

pub mod ast;
mod lexer;
mod parser;

pub use ast::{Evaluate, Expr, Function};
pub use lexer::TokenKind;
pub use parser::{ParseError, ParseErrorKind};

use crate::common::{BinaryOperator, Float, Int};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("division by zero")]
    ZeroDivision,
    #[error("modulo by zero")]
    ZeroModulo,
    #[error("'{0}' needs integer operands")]
    IntegerOperands(BinaryOperator),
    #[error("result is not a finite number")]
    NonFinite,
    #[error("{0} is not an integer")]
    NotAnInteger(Float),
}

pub fn parse(s: &str) -> Result<Expr, ParseError> {
    parser::Parser::new(s).parse()
}

/// Evaluates `s`, reporting why it failed if it did. Blank input is `0`.
pub fn try_evaluate(s: &str) -> Result<Float, FormulaError> {
    if s.trim().is_empty() {
        return Ok(0.0);
    }
    Ok(parse(s)?.evaluate()?)
}

/// Evaluates `s`; every failure counts as `0`.
pub fn evaluate(s: &str) -> Float {
    try_evaluate(s).unwrap_or_else(|why| {
        tracing::debug!(formula = s, error = %why, "formula evaluated to 0");
        0.0
    })
}

/// Whether [`evaluate`] would produce a value rather than fall back to `0`.
pub fn is_valid(s: &str) -> bool {
    try_evaluate(s).is_ok()
}

/// Evaluates `s` and requires the result to be a whole number.
pub fn constant_integer(s: &str) -> Result<Int, FormulaError> {
    let x = try_evaluate(s)?;
    if x.fract() != 0.0 || x < Int::MIN as Float || x > Int::MAX as Float {
        return Err(FormulaError::NotAnInteger(x));
    }
    Ok(x as Int)
}
