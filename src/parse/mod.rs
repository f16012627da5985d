//! Grammar understood by the built-in [`LocalEngine`](crate::roll::LocalEngine):
//! `[N]dS` groups (or `d%`) with dice operators, plain numbers, and `+`/`-`.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::TokenKind;
pub use parser::{ParseError, ParseErrorKind};

pub fn parse(s: &str) -> Result<ast::Notation, ParseError> {
    parser::Parser::new(s).parse()
}
