//! The contract between the roll orchestrator and whatever produces dice.

use super::num::Number;
use crate::common::{Int, Sides, Sign, UInt};
use crate::parse::ParseError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("more than {0} dice rolled")]
    TooManyRolls(usize),
    #[error("dice engine unavailable: {0}")]
    Unavailable(String),
}

/// `qty` dice of one group still to be generated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupRequest {
    pub group_id: usize,
    pub qty: UInt,
    pub sides: Sides,
}

/// One generated face. `roll_id` orders faces within a group.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DieResult {
    pub group_id: usize,
    pub roll_id: usize,
    pub sides: Sides,
    pub value: UInt,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Critical {
    Success,
    Failure,
}

/// A die as it stands once its group has settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DieRoll {
    pub value: Int,
    /// Every value the die showed, oldest first, when it was rerolled or
    /// clamped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Int>,
    /// Whether the die counts toward the total.
    pub valid: bool,
    #[serde(default)]
    pub exploded: bool,
    #[serde(default)]
    pub rerolled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<Critical>,
}

impl DieRoll {
    pub fn new(value: Int, sides: Sides) -> Self {
        Self {
            value,
            history: Vec::new(),
            valid: true,
            exploded: false,
            rerolled: false,
            critical: critical(value, sides),
        }
    }
}

pub(crate) fn critical(value: Int, sides: Sides) -> Option<Critical> {
    if value == Int::from(sides.faces()) {
        Some(Critical::Success)
    } else if value == 1 {
        Some(Critical::Failure)
    } else {
        None
    }
}

/// An engine's aggregated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RollBase {
    Number {
        value: Number,
    },
    Die {
        value: Int,
        notation: String,
        rolls: Vec<DieRoll>,
    },
    /// Several groups joined by `ops`, one operator per group.
    ExpressionRoll {
        value: Number,
        ops: Vec<Sign>,
        dice: Vec<RollBase>,
    },
}

impl RollBase {
    pub fn value(&self) -> Number {
        match self {
            Self::Number { value } | Self::ExpressionRoll { value, .. } => *value,
            Self::Die { value, .. } => Number::Int(*value),
        }
    }
}

/// A dice engine, possibly animated.
///
/// Calls follow one protocol per roll: [`parse_notation`](Self::parse_notation)
/// once, [`request_roll`](Self::request_roll) for the groups it returned, then
/// [`request_reroll`](Self::request_reroll) with everything generated so far
/// and another `request_roll` until no more groups are requested, and finally
/// [`finalize`](Self::finalize).
#[async_trait]
pub trait DiceEngine: Send + Sync {
    /// Prepares a roll and lists the dice it needs up front.
    fn parse_notation(&self, notation: &str) -> Result<Vec<GroupRequest>, EngineError>;

    /// Generates faces for `groups`. This is the only call that may take time.
    async fn request_roll(&self, groups: &[GroupRequest]) -> Result<Vec<DieResult>, EngineError>;

    /// Dice still missing given all `results` so far; empty once settled.
    fn request_reroll(&self, results: &[DieResult]) -> Result<Vec<GroupRequest>, EngineError>;

    fn finalize(&self, results: &[DieResult]) -> Result<RollBase, EngineError>;

    /// Removes any dice from display.
    fn clear(&self);

    /// The last finalized result, if any.
    fn get_results(&self) -> Option<RollBase>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical() {
        let d20 = Sides::try_from(20).unwrap();
        assert_eq!(DieRoll::new(20, d20).critical, Some(Critical::Success));
        assert_eq!(DieRoll::new(1, d20).critical, Some(Critical::Failure));
        assert_eq!(DieRoll::new(7, d20).critical, None);
        assert_eq!(critical(100, Sides::Percentile), Some(Critical::Success));
    }

    #[test]
    fn test_roll_base_json() {
        let base = RollBase::ExpressionRoll {
            value: Number::Int(9),
            ops: vec![Sign::Plus, Sign::Plus],
            dice: vec![
                RollBase::Die {
                    value: 6,
                    notation: "1d6".into(),
                    rolls: vec![DieRoll::new(6, Sides::try_from(6).unwrap())],
                },
                RollBase::Number {
                    value: Number::Int(3),
                },
            ],
        };
        let json = serde_json::to_value(&base).unwrap();
        assert_eq!(json["type"], "expressionroll");
        assert_eq!(json["ops"], serde_json::json!(["+", "+"]));
        assert_eq!(json["dice"][0]["type"], "die");
        assert_eq!(json["dice"][0]["rolls"][0]["critical"], "success");
        assert_eq!(json["dice"][1]["value"], 3);

        let back: RollBase = serde_json::from_value(json).unwrap();
        assert_eq!(back, base);
    }
}
