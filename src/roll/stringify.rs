use super::engine::DieRoll;
use super::outcome::{OutcomeGroup, RollOutcome};
use crate::common::{Int, Sign};

pub trait Stringify {
    fn str_outcome(&mut self, outcome: &RollOutcome) -> String {
        let groups = self.str_groups(outcome);
        format!("{} = {}", groups, outcome.total)
    }

    fn str_groups(&mut self, outcome: &RollOutcome) -> String {
        let mut ret = String::new();
        for (i, (group, op)) in outcome.groups.iter().zip(&outcome.ops).enumerate() {
            match (i, op) {
                (0, Sign::Plus) => {}
                (0, Sign::Minus) => ret.push('-'),
                (_, op) => ret.push_str(&format!(" {} ", op)),
            }
            ret.push_str(&self.str_group(group));
        }
        ret
    }

    fn str_group(&mut self, group: &OutcomeGroup) -> String {
        match group {
            OutcomeGroup::Number { value } => value.to_string(),
            OutcomeGroup::Dice {
                notation, rolls, ..
            } => {
                let the_dice = rolls
                    .iter()
                    .map(|die| self.str_die(die))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} ({})", notation, the_dice)
            }
        }
    }

    fn str_die(&mut self, die: &DieRoll) -> String {
        let mut ret = str_values(die);
        if die.exploded {
            ret.push('!');
        }
        ret
    }
}

/// `a -> b -> value` for a die that changed, otherwise just `value`.
fn str_values(die: &DieRoll) -> String {
    die.history
        .iter()
        .chain(std::iter::once(&die.value))
        .map(Int::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Default)]
pub struct SimpleStringifier;

impl SimpleStringifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stringify(&mut self, outcome: &RollOutcome) -> String {
        self.str_outcome(outcome)
    }
}

impl Stringify for SimpleStringifier {}

#[derive(Default)]
pub struct MarkdownStringifier;

impl MarkdownStringifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stringify(&mut self, outcome: &RollOutcome) -> String {
        self.str_outcome(outcome)
    }
}

impl Stringify for MarkdownStringifier {
    fn str_outcome(&mut self, outcome: &RollOutcome) -> String {
        let groups = self.str_groups(outcome);
        format!("{} = `{}`", groups, outcome.total)
    }

    fn str_die(&mut self, die: &DieRoll) -> String {
        let mut ret = str_values(die);
        if die.exploded {
            ret.push('!');
        }
        if die.critical.is_some() {
            ret = format!("**{}**", ret);
        }
        if !die.valid {
            ret = format!("~~{}~~", ret);
        }
        ret
    }
}
