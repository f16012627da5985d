//! Rolling dice: the engine contract, the built-in engine and the session that
//! orchestrates rolls.

mod engine;
mod local;
mod num;
mod outcome;
mod roller;
mod session;
mod stringify;

pub use engine::{
    Critical, DiceEngine, DieResult, DieRoll, EngineError, GroupRequest, RollBase,
};
pub use local::LocalEngine;
pub use num::Number;
pub use outcome::{OutcomeGroup, RollOutcome};
pub use roller::Roller;
pub use session::{Presentation, RollSession};
pub use stringify::{MarkdownStringifier, SimpleStringifier, Stringify};

#[cfg(test)]
pub(crate) use session::test_utils;
