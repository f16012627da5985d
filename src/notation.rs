//! Splitting compound roll notation into top-level additive terms.

use crate::common::Sign;
use std::fmt;

/// One top-level term of a notation string and the operator joining it to
/// the terms before it. The first term usually has no operator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NotationTerm {
    pub op: Option<Sign>,
    pub text: String,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TermKind {
    /// Handed to the dice engine.
    Dice,
    /// Handed to the formula evaluator.
    Modifier,
}

impl NotationTerm {
    pub fn new(op: Option<Sign>, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> TermKind {
        if is_dice_term(&self.text) {
            TermKind::Dice
        } else {
            TermKind::Modifier
        }
    }

    /// The operator, with a missing one read as `+`.
    pub fn sign(&self) -> Sign {
        self.op.unwrap_or(Sign::Plus)
    }
}

impl fmt::Display for NotationTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Some(op) => write!(f, "{} {}", op, self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Splits `s` at every `+` or `-` outside parentheses.
///
/// Parenthesis balance is not checked; a stray `)` only lowers the depth
/// counter. A sign that follows another sign with nothing in between folds
/// into it, so `1d20 - -1` yields the term `+ 1`.
pub fn tokenize(s: &str) -> Vec<NotationTerm> {
    let mut terms = Vec::new();
    let mut depth: i64 = 0;
    let mut op: Option<Sign> = None;
    let mut buf = String::new();

    for c in s.chars() {
        match (c, Sign::from_char(c)) {
            (_, Some(sign)) if depth == 0 => {
                let text = buf.trim();
                if text.is_empty() {
                    op = Some(match op {
                        Some(prev) => prev.then(sign),
                        None => sign,
                    });
                } else {
                    terms.push(NotationTerm::new(op, text));
                    op = Some(sign);
                }
                buf.clear();
            }
            ('(', _) => {
                depth += 1;
                buf.push(c);
            }
            (')', _) => {
                depth -= 1;
                buf.push(c);
            }
            _ => buf.push(c),
        }
    }

    let text = buf.trim();
    if !text.is_empty() {
        terms.push(NotationTerm::new(op, text));
    }
    terms
}

/// Whether `text` starts like a dice group: optional count, `d`, then a
/// digit or `%`.
pub fn is_dice_term(text: &str) -> bool {
    let rest = text.trim_start_matches(|c: char| c.is_ascii_digit());
    let mut chars = rest.chars();
    matches!(chars.next(), Some('d' | 'D'))
        && matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '%')
}

/// Joins terms back into notation, `a + b - c`.
pub fn join(terms: &[NotationTerm]) -> String {
    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        match (i, term.op) {
            (0, Some(Sign::Minus)) => out.push('-'),
            (0, _) => {}
            (_, op) => {
                out.push(' ');
                out.push(op.unwrap_or(Sign::Plus).as_char());
                out.push(' ');
            }
        }
        out.push_str(&term.text);
    }
    out
}
