use crate::character::{Ability, CharacterSnapshot};
use crate::common::Int;
use std::collections::HashMap;
use std::str::FromStr;

/// A recognised `@name` variable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MacroToken {
    Ability(Ability),
    ProficiencyBonus,
    /// `lv0` is the total level, `lvN` the level of the N-th class.
    Level(usize),
}

impl FromStr for MacroToken {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix('@').unwrap_or(s).to_ascii_lowercase();
        if name == "pb" {
            return Ok(Self::ProficiencyBonus);
        }
        if let Some(index) = name.strip_prefix("lv") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                return index.parse().map(Self::Level).map_err(|_| ());
            }
            return Err(());
        }
        name.parse().map(Self::Ability).map_err(|_| ())
    }
}

/// Replacement text for one macro name (without the leading `@`).
pub trait Resolve {
    fn resolve_one(&self, name: &str) -> Option<String>;
}

/// Resolves macro tokens against one character snapshot.
#[derive(Debug, Copy, Clone)]
pub struct VariableResolver<'a> {
    sheet: &'a CharacterSnapshot,
}

impl<'a> VariableResolver<'a> {
    pub fn new(sheet: &'a CharacterSnapshot) -> Self {
        Self { sheet }
    }

    pub fn resolve(&self, token: &str) -> Option<Int> {
        let token = token.parse::<MacroToken>().ok()?;
        Some(match token {
            MacroToken::Ability(a) => self.sheet.ability_modifier(a),
            MacroToken::ProficiencyBonus => self.sheet.proficiency_bonus(),
            MacroToken::Level(n) => self.sheet.class_level(n),
        })
    }
}

impl Resolve for VariableResolver<'_> {
    fn resolve_one(&self, name: &str) -> Option<String> {
        self.resolve(name).map(|x| x.to_string())
    }
}

/// `resolve(token, snapshot)`: the value of a single macro token, if known.
pub fn resolve(token: &str, sheet: &CharacterSnapshot) -> Option<Int> {
    VariableResolver::new(sheet).resolve(token)
}

/// User-defined macros layered over another resolver. Definitions are raw text
/// and may themselves mention other macros.
#[derive(Debug, Clone)]
pub struct MacroTable<R> {
    defs: HashMap<String, String>,
    fallback: R,
}

impl<R: Resolve> MacroTable<R> {
    pub fn new(fallback: R) -> Self {
        Self {
            defs: HashMap::new(),
            fallback,
        }
    }

    pub fn define(&mut self, name: &str, body: impl Into<String>) -> &mut Self {
        let name = name.strip_prefix('@').unwrap_or(name).to_ascii_lowercase();
        self.defs.insert(name, body.into());
        self
    }
}

impl<R: Resolve> Resolve for MacroTable<R> {
    fn resolve_one(&self, name: &str) -> Option<String> {
        match self.defs.get(&name.to_ascii_lowercase()) {
            Some(body) => Some(body.clone()),
            None => self.fallback.resolve_one(name),
        }
    }
}
