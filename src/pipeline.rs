//! Raw notation in, rolled outcome out: macros are expanded, the notation is
//! split into terms, modifier terms are evaluated as formulas and what remains
//! is handed to the [`RollSession`].

use crate::character::CharacterSnapshot;
use crate::common::{Int, Sign};
use crate::config::DiceConfig;
use crate::error::{Error, Result};
use crate::formula;
use crate::macros::{self, MacroNonConvergence, VariableResolver};
use crate::notation::{self, NotationTerm, TermKind};
use crate::notify::ToastKind;
use crate::roll::{RollOutcome, RollSession};

/// Expands every `@name` in `text` against `sheet`.
pub fn expand_macros(
    text: &str,
    sheet: &CharacterSnapshot,
    max_depth: usize,
) -> Result<String, MacroNonConvergence> {
    macros::expand_with(text, &VariableResolver::new(sheet), max_depth)
}

/// Rewrites `raw` into notation the dice engine understands.
///
/// Dice terms pass through untouched; every other term is evaluated and
/// replaced by its value, e.g. `1d20 + (@str * 2) - 1` becomes `1d20 + 6 - 1`
/// for a character with a +3 strength modifier.
pub fn resolve_notation(
    raw: &str,
    sheet: &CharacterSnapshot,
    config: &DiceConfig,
) -> Result<String> {
    let expanded = expand_macros(raw, sheet, config.max_macro_depth)?;
    let terms = notation::tokenize(&expanded)
        .into_iter()
        .map(|term| match term.kind() {
            TermKind::Dice => Ok(term),
            TermKind::Modifier => resolve_modifier(term),
        })
        .collect::<Result<Vec<_>>>()?;
    let resolved = notation::join(&terms);
    tracing::debug!(raw, %resolved, "notation resolved");
    Ok(resolved)
}

fn resolve_modifier(term: NotationTerm) -> Result<NotationTerm> {
    let value = formula::try_evaluate(&term.text).map_err(|source| Error::InvalidTerm {
        term: term.text.clone(),
        source,
    })?;
    // a negative value moves its sign onto the operator
    let op = if value < 0.0 {
        Some(term.sign().then(Sign::Minus))
    } else {
        term.op
    };
    Ok(NotationTerm::new(op, value.abs().to_string()))
}

/// The integer value of a house-rule formula written on the sheet.
///
/// Blank formulas, formulas whose macros do not converge and formulas that do
/// not evaluate to a whole number all count as `0`.
pub fn custom_modifier(formula: &str, sheet: &CharacterSnapshot, max_depth: usize) -> Int {
    if formula.trim().is_empty() {
        return 0;
    }
    let expanded = match expand_macros(formula, sheet, max_depth) {
        Ok(expanded) => expanded,
        Err(why) => {
            tracing::debug!(formula, error = %why, "custom modifier counts as 0");
            return 0;
        }
    };
    formula::constant_integer(&expanded).unwrap_or_else(|why| {
        tracing::debug!(formula, error = %why, "custom modifier counts as 0");
        0
    })
}

impl RollSession {
    /// Resolves `raw` against `sheet` and rolls it.
    ///
    /// Only a macro that fails to converge is an error; an invalid term is
    /// reported through the notifier and, like any failed roll, yields
    /// `Ok(None)`.
    pub async fn roll_for(
        &self,
        raw: &str,
        sheet: &CharacterSnapshot,
        title: Option<&str>,
    ) -> Result<Option<RollOutcome>, MacroNonConvergence> {
        let notation = match resolve_notation(raw, sheet, self.config()) {
            Ok(notation) => notation,
            Err(Error::Macro(why)) => return Err(why),
            Err(why) => {
                tracing::info!(raw, error = %why, "roll not started");
                self.notify(ToastKind::Error, &why.to_string());
                return Ok(None);
            }
        };
        Ok(self.roll_titled(&notation, title).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::test_utils::sample_sheet;
    use crate::formula::FormulaError;
    use crate::roll::test_utils::session;
    use std::time::Duration;

    fn check(raw: &str, expected: &str) {
        let resolved = resolve_notation(raw, &sample_sheet(), &DiceConfig::default());
        assert_eq!(resolved.as_deref(), Ok(expected), "{}", raw);
    }

    fn check_err(raw: &str, term: &str) {
        match resolve_notation(raw, &sample_sheet(), &DiceConfig::default()) {
            Err(Error::InvalidTerm { term: t, .. }) => assert_eq!(t, term, "{}", raw),
            other => panic!("{}: expected an invalid term, got {:?}", raw, other),
        }
    }

    #[test]
    fn test_resolve_notation() {
        check("1d20", "1d20");
        check("1d20 + @str + @pb", "1d20 + 3 + 3");
        check("2d6 + (@str * 2) - 1", "2d6 + 6 - 1");
        check("1d20+max(@str, @dex)", "1d20 + 3");
        check("@dex", "2");
        check("1d20 + @xyz", "1d20 + 0");
        check("4d6kh3 + 1/2", "4d6kh3 + 0.5");
        check("", "");
    }

    #[test]
    fn test_negative_modifier() {
        check("1d20 + (1 - @pb)", "1d20 - 2");
        check("1d20 - (1 - @pb)", "1d20 + 2");
        check("(@int) + 1d4", "-1 + 1d4");
    }

    #[test]
    fn test_invalid_term() {
        check_err("1d20 + oops", "oops");
        check_err("1d20 + (3 // 0)", "(3 // 0)");
        let err = resolve_notation("1d4 + 1/0", &sample_sheet(), &DiceConfig::default());
        assert!(matches!(
            err,
            Err(Error::InvalidTerm {
                source: FormulaError::ZeroDivision,
                ..
            })
        ));
        let huge = "9".repeat(400);
        check_err(&format!("1d20 + {}", huge), &huge);
        check_err(&format!("1d20 - ({})", huge), &format!("({})", huge));
    }

    #[test]
    fn test_custom_modifier() {
        let sheet = sample_sheet();
        assert_eq!(custom_modifier("", &sheet, 5), 0);
        assert_eq!(custom_modifier("  ", &sheet, 5), 0);
        assert_eq!(custom_modifier("@pb + 1", &sheet, 5), 4);
        assert_eq!(custom_modifier("(@lv1 + 1) // 2", &sheet, 5), 2);
        assert_eq!(custom_modifier("1.5", &sheet, 5), 0);
        assert_eq!(custom_modifier("1d4", &sheet, 5), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_roll_for() {
        let (session, _, _) = session(Some(Duration::from_secs(1)));
        let outcome = session
            .roll_for("1d6 + @str", &sample_sheet(), Some("Damage"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.notation, "1d6 + 3");
        assert_eq!(outcome.total, 3 + 3);
        assert_eq!(session.history()[0].title.as_deref(), Some("Damage"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_roll_for_invalid_term() {
        let (session, engine, toasts) = session(Some(Duration::from_secs(1)));
        let outcome = session.roll_for("1d6 + oops", &sample_sheet(), None).await;
        assert_eq!(outcome, Ok(None));
        assert_eq!(engine.calls(), 0);
        assert_eq!(toasts.lock().unwrap().drain().len(), 1);
    }
}
