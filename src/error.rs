use crate::formula::FormulaError;
use crate::macros::MacroNonConvergence;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Macro(#[from] MacroNonConvergence),
    #[error("invalid modifier {term:?}: {source}")]
    InvalidTerm {
        term: String,
        #[source]
        source: FormulaError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
