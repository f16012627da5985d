//! Dice notation for character sheets.
//!
//! A roll such as `2d20kh1 + @str - 1d4` goes through three passes before any
//! die is thrown: `@name` macros are expanded against a [`CharacterSnapshot`],
//! the notation is split into top-level terms, and every term that is not a
//! dice group is evaluated by a restricted arithmetic interpreter. A
//! [`RollSession`] then drives a [`DiceEngine`](roll::DiceEngine) to produce
//! the [`RollOutcome`], one roll at a time.

pub mod character;
pub mod common;
pub mod config;
pub mod error;
pub mod formula;
pub mod macros;
pub mod notation;
pub mod notify;
pub mod parse;
pub mod pipeline;
pub mod roll;

pub use character::{CharacterSnapshot, DerivedStats};
pub use config::DiceConfig;
pub use error::{Error, Result};
pub use macros::MacroNonConvergence;
pub use notation::NotationTerm;
pub use roll::{LocalEngine, RollOutcome, RollSession};

/// Evaluates a formula; anything that fails to evaluate is `0`.
pub fn evaluate_formula(text: &str) -> common::Float {
    formula::evaluate(text)
}

pub fn is_valid_formula(text: &str) -> bool {
    formula::is_valid(text)
}

/// Expands `@name` macros against `sheet` with the default pass limit.
pub fn expand_macros(
    text: &str,
    sheet: &CharacterSnapshot,
) -> Result<String, MacroNonConvergence> {
    pipeline::expand_macros(text, sheet, macros::DEFAULT_MAX_DEPTH)
}

pub fn tokenize_notation(text: &str) -> Vec<NotationTerm> {
    notation::tokenize(text)
}
