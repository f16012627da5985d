use crate::common::*;
use std::fmt::{self, Write};

/// A parsed roll: signed terms summed left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Notation {
    pub parts: Vec<NotationPart>,
}

impl Notation {
    pub fn new(parts: Vec<NotationPart>) -> Self {
        Self { parts }
    }

    pub fn dice(&self) -> impl Iterator<Item = &DiceGroup> + '_ {
        self.parts.iter().filter_map(|part| match &part.term {
            Term::Dice(dice) => Some(dice),
            Term::Integer(_) | Term::Decimal(_) => None,
        })
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            match (i, part.sign) {
                (0, Sign::Plus) => {}
                (0, Sign::Minus) => f.write_char('-')?,
                (_, sign) => write!(f, " {} ", sign)?,
            }
            write!(f, "{}", part.term)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotationPart {
    pub sign: Sign,
    pub term: Term,
}

impl NotationPart {
    pub fn new(sign: Sign, term: Term) -> Self {
        Self { sign, term }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Dice(DiceGroup),
    Integer(Int),
    Decimal(Float),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dice(dice) => fmt::Display::fmt(dice, f),
            Self::Integer(x) => fmt::Display::fmt(x, f),
            Self::Decimal(x) => fmt::Display::fmt(x, f),
        }
    }
}

/// `NdS` followed by its operators, in application order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiceGroup {
    pub num: NonZeroUInt,
    pub sides: Sides,
    pub ops: Vec<DiceOperator>,
}

impl DiceGroup {
    pub fn new(num: NonZeroUInt, sides: Sides, ops: Vec<DiceOperator>) -> Self {
        let mut ret = Self { num, sides, ops };
        ret.simplify_ops();
        ret
    }

    /// Merges runs of the same selecting operator, so `kh1kl1` becomes a
    /// single keep with two selectors.
    fn simplify_ops(&mut self) {
        if self.ops.is_empty() {
            return;
        }

        let mut new_ops: Vec<DiceOperator> = Vec::with_capacity(self.ops.len());

        for op in self.ops.drain(..) {
            match new_ops.last_mut() {
                Some(last_op) if !op.is_immediate() && op.kind() == last_op.kind() => {
                    if let Some(sels) = op.into_sels() {
                        last_op.add_sels(&mut sels.into_vec());
                    }
                }
                _ => new_ops.push(op),
            }
        }

        new_ops.shrink_to_fit();
        self.ops = new_ops;
    }
}

impl fmt::Display for DiceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.num, self.sides)?;
        for op in &self.ops {
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(num: u32, sides: u32, ops: Vec<DiceOperator>) -> DiceGroup {
        DiceGroup::new(
            NonZeroUInt::new(num).unwrap(),
            Sides::try_from(sides).unwrap(),
            ops,
        )
    }

    #[test]
    fn test_simplify_ops() {
        let group = d(
            4,
            6,
            vec![
                DiceOperator::Keep(vec1![Selector::Highest(1)]),
                DiceOperator::Keep(vec1![Selector::Lowest(1)]),
                DiceOperator::Minimum(2),
                DiceOperator::Minimum(3),
            ],
        );
        assert_eq!(
            group.ops,
            vec![
                DiceOperator::Keep(vec1![Selector::Highest(1), Selector::Lowest(1)]),
                DiceOperator::Minimum(2),
                DiceOperator::Minimum(3),
            ]
        );
        assert_eq!(group.to_string(), "4d6kh1kl1mi2mi3");
    }

    #[test]
    fn test_display_notation() {
        let notation = Notation::new(vec![
            NotationPart::new(Sign::Minus, Term::Dice(d(1, 4, vec![]))),
            NotationPart::new(Sign::Plus, Term::Integer(3)),
            NotationPart::new(Sign::Minus, Term::Decimal(0.5)),
        ]);
        assert_eq!(notation.to_string(), "-1d4 + 3 - 0.5");
        assert_eq!(notation.dice().count(), 1);
    }
}
