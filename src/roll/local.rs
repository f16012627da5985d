//! A dice engine without animation: faces come straight from a [`Roller`].

use super::engine::*;
use super::num::Number;
use super::roller::Roller;
use crate::common::*;
use crate::parse::ast::{DiceGroup, Notation, Term};
use async_trait::async_trait;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct LocalEngine<R = StdRng> {
    max_rolls: usize,
    roller: Mutex<R>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    notation: Option<Notation>,
    next_roll_id: usize,
    last: Option<RollBase>,
}

impl LocalEngine {
    pub fn new(max_rolls: usize) -> Self {
        Self::with_roller(max_rolls, StdRng::from_entropy())
    }
}

impl<R: Roller> LocalEngine<R> {
    pub fn with_roller(max_rolls: usize, roller: R) -> Self {
        Self {
            max_rolls,
            roller: Mutex::new(roller),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn groups(&self) -> Result<Vec<DiceGroup>, EngineError> {
        match &self.state().notation {
            Some(notation) => Ok(notation.dice().cloned().collect()),
            None => Err(EngineError::Unavailable("no notation has been parsed".into())),
        }
    }
}

#[async_trait]
impl<R: Roller + Send> DiceEngine for LocalEngine<R> {
    fn parse_notation(&self, notation: &str) -> Result<Vec<GroupRequest>, EngineError> {
        let parsed = crate::parse::parse(notation)?;
        let requests = parsed
            .dice()
            .enumerate()
            .map(|(group_id, group)| GroupRequest {
                group_id,
                qty: group.num.get(),
                sides: group.sides,
            })
            .collect();

        let mut state = self.state();
        state.notation = Some(parsed);
        state.next_roll_id = 0;
        Ok(requests)
    }

    async fn request_roll(&self, groups: &[GroupRequest]) -> Result<Vec<DieResult>, EngineError> {
        let mut state = self.state();
        let qty: usize = groups.iter().map(|g| g.qty as usize).sum();
        if state.next_roll_id + qty > self.max_rolls {
            return Err(EngineError::TooManyRolls(self.max_rolls));
        }

        let mut roller = self.roller.lock().unwrap_or_else(PoisonError::into_inner);
        let mut results = Vec::with_capacity(qty);
        for group in groups {
            for value in roller.roll_dice(group.qty as usize, group.sides) {
                results.push(DieResult {
                    group_id: group.group_id,
                    roll_id: state.next_roll_id,
                    sides: group.sides,
                    value,
                });
                state.next_roll_id += 1;
            }
        }
        Ok(results)
    }

    fn request_reroll(&self, results: &[DieResult]) -> Result<Vec<GroupRequest>, EngineError> {
        let mut requests = Vec::new();
        for (group_id, group) in self.groups()?.iter().enumerate() {
            if let Replay::Pending(qty) = replay(group, &faces_of(results, group_id)) {
                requests.push(GroupRequest {
                    group_id,
                    qty,
                    sides: group.sides,
                });
            }
        }
        Ok(requests)
    }

    fn finalize(&self, results: &[DieResult]) -> Result<RollBase, EngineError> {
        let notation = match self.state().notation.clone() {
            Some(notation) => notation,
            None => return Err(EngineError::Unavailable("no notation has been parsed".into())),
        };

        let mut parts = Vec::with_capacity(notation.parts.len());
        let mut group_id = 0;
        for part in &notation.parts {
            let base = match &part.term {
                Term::Dice(group) => {
                    let faces = faces_of(results, group_id);
                    group_id += 1;
                    match replay(group, &faces) {
                        Replay::Settled(rolls) => settled_base(group, rolls),
                        Replay::Pending(qty) => {
                            return Err(EngineError::Unavailable(format!(
                                "{} still needs {} more dice",
                                group, qty
                            )))
                        }
                    }
                }
                Term::Integer(x) => RollBase::Number {
                    value: Number::Int(*x),
                },
                Term::Decimal(x) => RollBase::Number {
                    value: Number::Float(*x),
                },
            };
            parts.push((part.sign, base));
        }

        let base = match parts.len() {
            1 if parts[0].0 == Sign::Plus => parts.remove(0).1,
            _ => {
                let value = parts
                    .iter()
                    .map(|(sign, base)| sign.apply(base.value()))
                    .sum();
                let (ops, dice) = parts.into_iter().unzip();
                RollBase::ExpressionRoll { value, ops, dice }
            }
        };
        tracing::trace!(value = %base.value(), "local roll finalized");
        self.state().last = Some(base.clone());
        Ok(base)
    }

    fn clear(&self) {
        let mut state = self.state();
        state.notation = None;
        state.next_roll_id = 0;
    }

    fn get_results(&self) -> Option<RollBase> {
        self.state().last.clone()
    }
}

fn faces_of(results: &[DieResult], group_id: usize) -> Vec<Int> {
    let mut faces: Vec<_> = results.iter().filter(|r| r.group_id == group_id).collect();
    faces.sort_by_key(|r| r.roll_id);
    faces.into_iter().map(|r| Int::from(r.value)).collect()
}

fn settled_base(group: &DiceGroup, rolls: Vec<DieRoll>) -> RollBase {
    let value = rolls.iter().filter(|d| d.valid).map(|d| d.value).sum();
    RollBase::Die {
        value,
        notation: group.to_string(),
        rolls,
    }
}

enum Replay {
    Settled(Vec<DieRoll>),
    /// The group needs this many more faces before it can settle.
    Pending(UInt),
}

/// Applies a group's operators to its faces in generation order.
///
/// The same faces always settle the same way, so the group can be replayed
/// from scratch every time more faces arrive.
fn replay(group: &DiceGroup, faces: &[Int]) -> Replay {
    let mut dice = Dice {
        sides: group.sides,
        faces,
        rolls: Vec::new(),
    };
    match dice.settle(group) {
        Ok(()) => Replay::Settled(dice.rolls),
        Err(Starved(n)) => Replay::Pending(n),
    }
}

struct Starved(UInt);

struct Dice<'f> {
    sides: Sides,
    faces: &'f [Int],
    rolls: Vec<DieRoll>,
}

impl Dice<'_> {
    fn settle(&mut self, group: &DiceGroup) -> Result<(), Starved> {
        self.roll_more(group.num.get() as usize)?;
        for op in &group.ops {
            self.operate(op)?;
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&[Int], Starved> {
        if self.faces.len() < n {
            return Err(Starved((n - self.faces.len()) as UInt));
        }
        let (taken, rest) = self.faces.split_at(n);
        self.faces = rest;
        Ok(taken)
    }

    fn roll_more(&mut self, n: usize) -> Result<(), Starved> {
        let sides = self.sides;
        let new: Vec<_> = self.take(n)?.iter().map(|&v| DieRoll::new(v, sides)).collect();
        self.rolls.extend(new);
        Ok(())
    }

    fn operate(&mut self, op: &DiceOperator) -> Result<(), Starved> {
        match op {
            DiceOperator::Keep(sels) => self.keep(sels),
            DiceOperator::Drop(sels) => self.drop(sels),
            DiceOperator::Reroll(sels) => return self.reroll(sels, false),
            DiceOperator::RerollOnce(sels) => return self.reroll(sels, true),
            DiceOperator::Explode(sels) => return self.explode(sels, None),
            DiceOperator::ExplodeOnce(sels) => return self.explode(sels, Some(1)),
            DiceOperator::Minimum(x) => self.clamp(|v| v < *x, *x),
            DiceOperator::Maximum(x) => self.clamp(|v| v > *x, *x),
        }
        Ok(())
    }

    fn reroll(&mut self, sels: &[Selector], once: bool) -> Result<(), Starved> {
        let mut to_reroll = self.select(sels, None);
        while !to_reroll.is_empty() {
            let mut targets: Vec<_> = to_reroll.into_iter().collect();
            targets.sort_unstable();
            let faces = self.take(targets.len())?.to_vec();
            for (i, face) in targets.into_iter().zip(faces) {
                let die = &mut self.rolls[i];
                die.history.push(die.value);
                die.value = face;
                die.rerolled = true;
                die.critical = critical(face, self.sides);
            }
            if once {
                break;
            }
            to_reroll = self.select(sels, None);
        }
        Ok(())
    }

    fn explode(&mut self, sels: &[Selector], max_targets: Option<usize>) -> Result<(), Starved> {
        let mut to_explode = self.select(sels, max_targets);
        let mut already_exploded = HashSet::new();

        while !to_explode.is_empty() {
            already_exploded.extend(to_explode.iter().copied());
            let count = to_explode.len();
            for i in to_explode.drain() {
                self.rolls[i].exploded = true;
            }
            self.roll_more(count)?;

            if max_targets.is_some() {
                break;
            }
            to_explode.extend(self.select(sels, None).difference(&already_exploded));
        }
        Ok(())
    }

    fn keep(&mut self, sels: &[Selector]) {
        let to_keep = self.select(sels, None);
        for (i, die) in self.rolls.iter_mut().enumerate() {
            if die.valid && !to_keep.contains(&i) {
                die.valid = false;
            }
        }
    }

    fn drop(&mut self, sels: &[Selector]) {
        for i in self.select(sels, None) {
            self.rolls[i].valid = false;
        }
    }

    fn clamp(&mut self, out_of_range: impl Fn(Int) -> bool, to: Int) {
        for die in self.rolls.iter_mut().filter(|d| d.valid) {
            if out_of_range(die.value) {
                die.history.push(die.value);
                die.value = to;
                die.critical = critical(to, self.sides);
            }
        }
    }

    /// Indices into `rolls` of the valid dice matching any selector.
    fn select(&self, sels: &[Selector], max_targets: Option<usize>) -> HashSet<usize> {
        let mut ret = HashSet::new();
        for sel in sels {
            let batch_max = max_targets.map(|x| x - ret.len());
            if batch_max == Some(0) {
                break;
            }
            ret.extend(self.select_one(*sel, batch_max));
        }
        ret
    }

    fn select_one(&self, sel: Selector, max_targets: Option<usize>) -> Vec<usize> {
        let mut target: Vec<(usize, Int)> = self
            .rolls
            .iter()
            .enumerate()
            .filter(|(_, d)| d.valid)
            .map(|(i, d)| (i, d.value))
            .collect();

        match sel {
            Selector::Highest(n) => {
                target.sort_by(|(_, x), (_, y)| y.cmp(x));
                target.truncate(n);
            }
            Selector::Lowest(n) => {
                target.sort_by(|(_, x), (_, y)| x.cmp(y));
                target.truncate(n);
            }
            sel => target.retain(|&(_, v)| sel.matches(v)),
        }
        if let Some(max_targets) = max_targets {
            target.truncate(max_targets);
        }
        target.into_iter().map(|(i, _)| i).collect()
    }
}
