use crate::common::{NonZeroUInt, Sides, UInt};
use rand::{
    distributions::{DistIter, Distribution, Uniform},
    Rng,
};

/// Source of die faces in `1..=sides`.
pub trait Roller {
    type RollIter<'a>: Iterator<Item = UInt> + 'a
    where
        Self: 'a;

    fn roll(&mut self, sides: NonZeroUInt) -> UInt;

    fn roll_iter(&mut self, num: usize, sides: NonZeroUInt) -> Self::RollIter<'_>;

    /// `num` faces of a die with `sides`; `d%` rolls `1..=100`.
    fn roll_dice(&mut self, num: usize, sides: Sides) -> Vec<UInt> {
        match NonZeroUInt::new(sides.faces()) {
            Some(faces) => self.roll_iter(num, faces).collect(),
            None => Vec::new(),
        }
    }
}

impl<R: Rng> Roller for R {
    type RollIter<'a> = std::iter::Take<DistIter<Uniform<UInt>, &'a mut Self, UInt>>
    where
        Self: 'a;

    fn roll(&mut self, sides: NonZeroUInt) -> UInt {
        self.gen_range(1..=sides.get())
    }

    fn roll_iter(&mut self, num: usize, sides: NonZeroUInt) -> Self::RollIter<'_> {
        Uniform::new_inclusive(1, sides.get())
            .sample_iter(self)
            .take(num)
    }
}

#[cfg(test)]
pub(crate) use scripted::{ScriptedRoller, StepRoller};
