use super::engine::{DieRoll, RollBase};
use super::num::Number;
use crate::common::{Int, Sign};
use serde::{Deserialize, Serialize};

/// The result of one roll as handed back to the caller.
///
/// `groups` and `ops` line up: `ops[i]` combines `groups[i]` into the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub notation: String,
    pub total: Int,
    pub groups: Vec<OutcomeGroup>,
    pub ops: Vec<Sign>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutcomeGroup {
    Number {
        value: Number,
    },
    Dice {
        notation: String,
        value: Int,
        rolls: Vec<DieRoll>,
    },
}

impl OutcomeGroup {
    pub fn value(&self) -> Number {
        match self {
            Self::Number { value } => *value,
            Self::Dice { value, .. } => Number::Int(*value),
        }
    }
}

impl RollOutcome {
    /// Flattens an engine result. Nested expressions are inlined, their
    /// operators composed with the enclosing one.
    pub fn from_base(notation: impl Into<String>, base: &RollBase) -> Self {
        let mut groups = Vec::new();
        let mut ops = Vec::new();
        flatten(base, Sign::Plus, &mut groups, &mut ops);
        Self {
            notation: notation.into(),
            total: base.value().floor(),
            groups,
            ops,
        }
    }

    pub fn dice(&self) -> impl Iterator<Item = &DieRoll> {
        self.groups.iter().flat_map(|g| match g {
            OutcomeGroup::Dice { rolls, .. } => rolls.as_slice(),
            OutcomeGroup::Number { .. } => &[][..],
        })
    }
}

fn flatten(base: &RollBase, sign: Sign, groups: &mut Vec<OutcomeGroup>, ops: &mut Vec<Sign>) {
    match base {
        RollBase::Number { value } => {
            groups.push(OutcomeGroup::Number { value: *value });
            ops.push(sign);
        }
        RollBase::Die {
            value,
            notation,
            rolls,
        } => {
            groups.push(OutcomeGroup::Dice {
                notation: notation.clone(),
                value: *value,
                rolls: rolls.clone(),
            });
            ops.push(sign);
        }
        RollBase::ExpressionRoll { ops: inner, dice, .. } => {
            for (op, part) in inner.iter().zip(dice) {
                flatten(part, sign.then(*op), groups, ops);
            }
        }
    }
}
