//! Read-only character state and the values derived from it.
//!
//! Nothing here caches: [`DerivedStats::compute`] recomputes everything from the
//! snapshot it is handed, so callers decide when a recompute is due.

use crate::common::Int;
use crate::config::DiceConfig;
use crate::pipeline::custom_modifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl Ability {
    pub const ALL: [Self; 6] = [
        Self::Str,
        Self::Dex,
        Self::Con,
        Self::Int,
        Self::Wis,
        Self::Cha,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Dex => "dex",
            Self::Con => "con",
            Self::Int => "int",
            Self::Wis => "wis",
            Self::Cha => "cha",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error("unknown ability {0:?}")]
pub struct UnknownAbility(pub String);

impl FromStr for Ability {
    type Err = UnknownAbility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.key() == lower)
            .ok_or_else(|| UnknownAbility(s.to_owned()))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub const ALL: [Self; 18] = [
        Self::Athletics,
        Self::Acrobatics,
        Self::SleightOfHand,
        Self::Stealth,
        Self::Arcana,
        Self::History,
        Self::Investigation,
        Self::Nature,
        Self::Religion,
        Self::AnimalHandling,
        Self::Insight,
        Self::Medicine,
        Self::Perception,
        Self::Survival,
        Self::Deception,
        Self::Intimidation,
        Self::Performance,
        Self::Persuasion,
    ];

    /// The ability a skill check adds by default.
    pub const fn ability(self) -> Ability {
        use Skill::*;
        match self {
            Athletics => Ability::Str,
            Acrobatics | SleightOfHand | Stealth => Ability::Dex,
            Arcana | History | Investigation | Nature | Religion => Ability::Int,
            AnimalHandling | Insight | Medicine | Perception | Survival => Ability::Wis,
            Deception | Intimidation | Performance | Persuasion => Ability::Cha,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityScore {
    pub score: Int,
    /// Proficient in saving throws of this ability.
    pub save: bool,
}

impl Default for AbilityScore {
    fn default() -> Self {
        Self {
            score: 10,
            save: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Abilities {
    pub str: AbilityScore,
    pub dex: AbilityScore,
    pub con: AbilityScore,
    pub int: AbilityScore,
    pub wis: AbilityScore,
    pub cha: AbilityScore,
}

impl Abilities {
    pub fn get(&self, ability: Ability) -> &AbilityScore {
        match ability {
            Ability::Str => &self.str,
            Ability::Dex => &self.dex,
            Ability::Con => &self.con,
            Ability::Int => &self.int,
            Ability::Wis => &self.wis,
            Ability::Cha => &self.cha,
        }
    }

    pub fn get_mut(&mut self, ability: Ability) -> &mut AbilityScore {
        match ability {
            Ability::Str => &mut self.str,
            Ability::Dex => &mut self.dex,
            Ability::Con => &mut self.con,
            Ability::Int => &mut self.int,
            Ability::Wis => &mut self.wis,
            Ability::Cha => &mut self.cha,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassEntry {
    pub name: String,
    pub subclass: String,
    pub level: Int,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>, level: Int) -> Self {
        Self {
            name: name.into(),
            subclass: String::new(),
            level,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillTraining {
    pub prof: bool,
    pub expert: bool,
}

/// User-authored house-rule formulas added on top of the rules-derived values.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraModifiers {
    pub save: BTreeMap<Ability, String>,
    pub skill: BTreeMap<Skill, String>,
    pub initiative: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSnapshot {
    pub abilities: Abilities,
    pub classes: Vec<ClassEntry>,
    pub skills: BTreeMap<Skill, SkillTraining>,
    pub extra_modify: ExtraModifiers,
}

impl CharacterSnapshot {
    pub fn total_level(&self) -> Int {
        self.classes.iter().map(|c| c.level.max(0)).sum()
    }

    /// `0` is the total level; `n >= 1` is the level of the n-th class entry,
    /// or `0` when there is no such entry.
    pub fn class_level(&self, index: usize) -> Int {
        match index {
            0 => self.total_level(),
            n => self.classes.get(n - 1).map_or(0, |c| c.level.max(0)),
        }
    }

    pub fn ability_modifier(&self, ability: Ability) -> Int {
        ability_modifier(self.abilities.get(ability).score)
    }

    pub fn proficiency_bonus(&self) -> Int {
        proficiency_bonus(self.total_level())
    }

    pub fn training(&self, skill: Skill) -> SkillTraining {
        self.skills.get(&skill).copied().unwrap_or_default()
    }
}

/// `floor((score - 10) / 2)`, rounding toward negative infinity.
pub fn ability_modifier(score: Int) -> Int {
    (score - 10).div_euclid(2)
}

pub fn proficiency_bonus(total_level: Int) -> Int {
    match total_level {
        i64::MIN..=4 => 2,
        5..=8 => 3,
        9..=12 => 4,
        13..=16 => 5,
        _ => 6,
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DerivedStats {
    pub total_level: Int,
    pub proficiency_bonus: Int,
    pub ability_modifiers: BTreeMap<Ability, Int>,
    pub save_modifiers: BTreeMap<Ability, Int>,
    pub skill_modifiers: BTreeMap<Skill, Int>,
    pub passive_perception: Int,
    pub initiative: Int,
}

impl DerivedStats {
    pub fn compute(sheet: &CharacterSnapshot) -> Self {
        Self::compute_with(sheet, &DiceConfig::default())
    }

    pub fn compute_with(sheet: &CharacterSnapshot, config: &DiceConfig) -> Self {
        let depth = config.max_macro_depth;
        let extra = |formula: Option<&String>| {
            formula.map_or(0, |f| custom_modifier(f, sheet, depth))
        };

        let pb = sheet.proficiency_bonus();
        let ability_modifiers: BTreeMap<_, _> = Ability::ALL
            .into_iter()
            .map(|a| (a, sheet.ability_modifier(a)))
            .collect();

        let save_modifiers = Ability::ALL
            .into_iter()
            .map(|a| {
                let prof = if sheet.abilities.get(a).save { pb } else { 0 };
                let total = ability_modifiers[&a] + prof + extra(sheet.extra_modify.save.get(&a));
                (a, total)
            })
            .collect();

        let skill_modifiers: BTreeMap<_, _> = Skill::ALL
            .into_iter()
            .map(|s| {
                let training = sheet.training(s);
                let prof = if training.prof { pb } else { 0 };
                let expert = if training.prof && training.expert { pb } else { 0 };
                let total = ability_modifiers[&s.ability()]
                    + prof
                    + expert
                    + extra(sheet.extra_modify.skill.get(&s));
                (s, total)
            })
            .collect();

        let passive_perception = 10 + skill_modifiers[&Skill::Perception];
        let initiative = ability_modifiers[&Ability::Dex]
            + custom_modifier(&sheet.extra_modify.initiative, sheet, depth);

        Self {
            total_level: sheet.total_level(),
            proficiency_bonus: pb,
            ability_modifiers,
            save_modifiers,
            skill_modifiers,
            passive_perception,
            initiative,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::sample_sheet;
    use super::*;

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(20), 5);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(7), -2);
    }

    #[test]
    fn test_proficiency_bonus() {
        let cases = [
            (0, 2),
            (1, 2),
            (4, 2),
            (5, 3),
            (8, 3),
            (9, 4),
            (12, 4),
            (13, 5),
            (16, 5),
            (17, 6),
            (20, 6),
        ];
        for (level, pb) in cases {
            assert_eq!(proficiency_bonus(level), pb, "level {}", level);
        }
    }

    #[test]
    fn test_class_level() {
        let sheet = sample_sheet();
        assert_eq!(sheet.total_level(), 5);
        assert_eq!(sheet.class_level(0), 5);
        assert_eq!(sheet.class_level(1), 3);
        assert_eq!(sheet.class_level(2), 2);
        assert_eq!(sheet.class_level(3), 0);
    }

    #[test]
    fn test_ability_from_str() {
        assert_eq!("STR".parse::<Ability>(), Ok(Ability::Str));
        assert_eq!("wis".parse::<Ability>(), Ok(Ability::Wis));
        assert!("luck".parse::<Ability>().is_err());
    }

    #[test]
    fn test_derived_stats() {
        let mut sheet = sample_sheet();
        sheet.skills.insert(
            Skill::Perception,
            SkillTraining {
                prof: true,
                expert: true,
            },
        );
        sheet.skills.insert(
            Skill::Stealth,
            SkillTraining {
                prof: false,
                expert: true,
            },
        );
        sheet
            .extra_modify
            .save
            .insert(Ability::Con, "@pb + 1".to_string());
        sheet.extra_modify.initiative = "max(@wis, 2)".to_string();

        let stats = DerivedStats::compute(&sheet);
        assert_eq!(stats.total_level, 5);
        assert_eq!(stats.proficiency_bonus, 3);
        assert_eq!(stats.ability_modifiers[&Ability::Str], 3);
        assert_eq!(stats.save_modifiers[&Ability::Str], 6);
        assert_eq!(stats.save_modifiers[&Ability::Dex], 2);
        assert_eq!(stats.save_modifiers[&Ability::Con], 1 + 3 + 1);
        // expertise only counts together with proficiency
        assert_eq!(stats.skill_modifiers[&Skill::Stealth], 2);
        assert_eq!(stats.skill_modifiers[&Skill::Perception], 1 + 3 + 3);
        assert_eq!(stats.passive_perception, 17);
        assert_eq!(stats.initiative, 2 + 2);
    }

    #[test]
    fn test_invalid_extra_formula_counts_as_zero() {
        let mut sheet = sample_sheet();
        sheet
            .extra_modify
            .skill
            .insert(Skill::Arcana, "1d4 + 2".to_string());
        sheet
            .extra_modify
            .save
            .insert(Ability::Wis, "1 / 2".to_string());
        let stats = DerivedStats::compute(&sheet);
        assert_eq!(stats.skill_modifiers[&Skill::Arcana], -1);
        assert_eq!(stats.save_modifiers[&Ability::Wis], 1);
    }

    #[test]
    fn test_deserialize_snapshot() {
        let sheet: CharacterSnapshot = serde_json::from_str(
            r#"{
                "abilities": { "str": { "score": 18, "save": true } },
                "classes": [ { "name": "wizard", "level": 7 } ],
                "skills": { "sleight_of_hand": { "prof": true } },
                "extra_modify": { "initiative": "@pb" }
            }"#,
        )
        .unwrap();
        assert_eq!(sheet.abilities.str.score, 18);
        assert_eq!(sheet.abilities.dex.score, 10);
        assert_eq!(sheet.class_level(1), 7);
        assert!(sheet.training(Skill::SleightOfHand).prof);
        assert_eq!(DerivedStats::compute(&sheet).initiative, 3);
    }
}
