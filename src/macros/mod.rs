//! `@name` macro expansion.
//!
//! Expansion is purely textual: every macro token is replaced by the text its
//! resolver returns (or `0` when the resolver does not know it), and the pass
//! is repeated so that macros may expand into other macros. Evaluating the
//! result is left to [`crate::formula`].

mod lexer;
mod resolve;

pub use resolve::{resolve, MacroTable, MacroToken, Resolve, VariableResolver};

use lexer::Piece;

/// Iteration bound used when no [`DiceConfig`](crate::DiceConfig) is at hand.
pub const DEFAULT_MAX_DEPTH: usize = 5;

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("macros did not converge after {depth} passes, {residual:?} is still unresolved")]
pub struct MacroNonConvergence {
    pub residual: String,
    pub depth: usize,
}

/// Expands every macro token in `input`.
///
/// `resolve_one` receives the macro name without its `@`. Unknown names
/// (`None`) become the literal text `0`. Passes stop at the first one that
/// changes nothing, or after `max_depth` passes; if macro tokens are still
/// present at that point the expansion failed to converge.
pub fn expand<F>(
    input: &str,
    mut resolve_one: F,
    max_depth: usize,
) -> Result<String, MacroNonConvergence>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut current = input.to_owned();
    for pass in 1..=max_depth {
        let next = substitute(&current, &mut resolve_one);
        if next == current {
            tracing::trace!(pass, "macro expansion reached a fixpoint");
            break;
        }
        current = next;
    }

    if lexer::has_macro(&current) {
        tracing::debug!(input, residual = %current, "macro expansion did not converge");
        return Err(MacroNonConvergence {
            residual: current,
            depth: max_depth,
        });
    }
    Ok(current)
}

/// [`expand`] driven by a [`Resolve`] implementation.
pub fn expand_with<R: Resolve + ?Sized>(
    input: &str,
    resolver: &R,
    max_depth: usize,
) -> Result<String, MacroNonConvergence> {
    expand(input, |name| resolver.resolve_one(name), max_depth)
}

fn substitute<F>(input: &str, resolve_one: &mut F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    for (piece, slice) in lexer::pieces(input) {
        match piece {
            Piece::Macro => match resolve_one(&slice[1..]) {
                Some(text) => out.push_str(&text),
                None => out.push('0'),
            },
            Piece::Text | Piece::At | Piece::Error => out.push_str(slice),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::test_utils::sample_sheet;

    fn numbers(name: &str) -> Option<String> {
        match name {
            "a" => Some("1".into()),
            "b" => Some("@a + 1".into()),
            "c" => Some("(@b) * 2".into()),
            _ => None,
        }
    }

    fn check(input: &str, expected: &str) {
        assert_eq!(expand(input, numbers, DEFAULT_MAX_DEPTH).unwrap(), expected);
    }

    #[test]
    fn test_expand_plain_text() {
        check("", "");
        check("1d20 + 4", "1d20 + 4");
        check("user@", "user@");
    }

    #[test]
    fn test_expand_nested() {
        check("@a", "1");
        check("@b", "1 + 1");
        check("1d20 + @c", "1d20 + (1 + 1) * 2");
    }

    #[test]
    fn test_expand_unknown_is_zero() {
        let mut calls = 0;
        let out = expand(
            "1d4 + @xyz",
            |name| {
                calls += 1;
                numbers(name)
            },
            DEFAULT_MAX_DEPTH,
        )
        .unwrap();
        assert_eq!(out, "1d4 + 0");
        // one substituting pass, one pass confirming the fixpoint
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_expand_idempotent() {
        for input in ["@a + @b", "@c", "2d6 + @a"] {
            let once = expand(input, numbers, DEFAULT_MAX_DEPTH).unwrap();
            let twice = expand(&once, numbers, DEFAULT_MAX_DEPTH).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_expand_cycle_fails() {
        let err = expand("@loop", |_| Some("@loop".to_string()), 5).unwrap_err();
        assert_eq!(err.residual, "@loop");
        assert_eq!(err.depth, 5);

        let mut calls = 0;
        let err = expand(
            "@grow",
            |_| {
                calls += 1;
                Some("@grow + 1".to_string())
            },
            5,
        )
        .unwrap_err();
        assert_eq!(calls, 5);
        assert!(err.residual.starts_with("@grow"));
    }

    #[test]
    fn test_expand_depth_bound() {
        // needs three passes to bottom out
        assert!(expand("@c", numbers, 2).is_err());
        assert!(expand("@c", numbers, 3).is_ok());
    }

    #[test]
    fn test_expand_with_character() {
        let sheet = sample_sheet();
        let resolver = VariableResolver::new(&sheet);
        let out = expand_with("2d20kh1 + @STR - @lv2 + @pb", &resolver, 5).unwrap();
        assert_eq!(out, "2d20kh1 + 3 - 2 + 3");

        let mut table = MacroTable::new(resolver);
        table.define("atk", "@str + @pb");
        let out = expand_with("1d20 + @atk", &table, 5).unwrap();
        assert_eq!(out, "1d20 + 3 + 3");
    }
}
