use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::num::NonZeroU32;
use std::str::FromStr;
pub use vec1::vec1;

pub type Int = i64;
pub type UInt = u32;
pub type NonZeroUInt = NonZeroU32;

pub type Float = f64;

pub type NonEmpty<T> = vec1::Vec1<T>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sides {
    Poly(NonZeroUInt),
    Percentile,
}

impl Sides {
    /// Highest face of a die with these sides.
    pub fn faces(self) -> UInt {
        match self {
            Self::Poly(x) => x.get(),
            Self::Percentile => 100,
        }
    }
}

impl fmt::Display for Sides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poly(x) => fmt::Display::fmt(x, f),
            Self::Percentile => f.write_char('%'),
        }
    }
}

impl From<NonZeroUInt> for Sides {
    fn from(x: NonZeroUInt) -> Self {
        Self::Poly(x)
    }
}

impl TryFrom<UInt> for Sides {
    type Error = <NonZeroUInt as TryFrom<UInt>>::Error;

    fn try_from(value: UInt) -> Result<Self, Self::Error> {
        NonZeroUInt::try_from(value).map(Self::Poly)
    }
}

impl FromStr for Sides {
    type Err = <NonZeroUInt as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "%" {
            Ok(Self::Percentile)
        } else {
            s.parse().map(Self::Poly)
        }
    }
}

/// The operator joining a top-level term into a running total.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl Sign {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Plus),
            '-' => Some(Self::Minus),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
        }
    }

    pub fn apply<T: std::ops::Neg<Output = T>>(self, value: T) -> T {
        match self {
            Self::Plus => value,
            Self::Minus => -value,
        }
    }

    /// Combines two signs the way `- -x` collapses to `+x`.
    pub fn then(self, other: Self) -> Self {
        if self == other {
            Self::Plus
        } else {
            Self::Minus
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(self.as_char())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOperator {
    Pos,
    Neg,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Pos => '+',
            Self::Neg => '-',
        };
        f.write_char(c)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Flr,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Flr => "//",
            Self::Rem => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DiceOperator {
    Keep(NonEmpty<Selector>),
    Drop(NonEmpty<Selector>),
    Reroll(NonEmpty<Selector>),
    RerollOnce(NonEmpty<Selector>),
    Explode(NonEmpty<Selector>),
    ExplodeOnce(NonEmpty<Selector>),
    Minimum(Int),
    Maximum(Int),
}

impl DiceOperator {
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Self::Minimum(_) | Self::Maximum(_))
    }

    /// Operators that need extra dice generated before the group settles.
    pub const fn rolls_more(&self) -> bool {
        matches!(
            self,
            Self::Reroll(_) | Self::RerollOnce(_) | Self::Explode(_) | Self::ExplodeOnce(_)
        )
    }

    pub(crate) const fn kind(&self) -> OperatorKind {
        match self {
            Self::Keep(_) => OperatorKind::Keep,
            Self::Drop(_) => OperatorKind::Drop,
            Self::Reroll(_) => OperatorKind::Reroll,
            Self::RerollOnce(_) => OperatorKind::RerollOnce,
            Self::Explode(_) => OperatorKind::Explode,
            Self::ExplodeOnce(_) => OperatorKind::ExplodeOnce,
            Self::Minimum(_) => OperatorKind::Minimum,
            Self::Maximum(_) => OperatorKind::Maximum,
        }
    }

    pub fn sels_mut(&mut self) -> Option<&mut NonEmpty<Selector>> {
        Some(match self {
            Self::Keep(s)
            | Self::Drop(s)
            | Self::Reroll(s)
            | Self::RerollOnce(s)
            | Self::Explode(s)
            | Self::ExplodeOnce(s) => s,
            Self::Minimum(_) | Self::Maximum(_) => return None,
        })
    }

    pub fn into_sels(self) -> Option<NonEmpty<Selector>> {
        Some(match self {
            Self::Keep(s)
            | Self::Drop(s)
            | Self::Reroll(s)
            | Self::RerollOnce(s)
            | Self::Explode(s)
            | Self::ExplodeOnce(s) => s,
            Self::Minimum(_) | Self::Maximum(_) => return None,
        })
    }

    pub fn add_sels(&mut self, sels: &mut Vec<Selector>) {
        if let Some(my_sels) = self.sels_mut() {
            my_sels.append(sels)
        }
    }
}

impl fmt::Display for DiceOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, sels) = match self {
            Self::Keep(sels) => ("k", sels),
            Self::Drop(sels) => ("p", sels),
            Self::Reroll(sels) => ("rr", sels),
            Self::RerollOnce(sels) => ("ro", sels),
            Self::Explode(sels) => ("e", sels),
            Self::ExplodeOnce(sels) => ("ra", sels),
            Self::Minimum(n) => return write!(f, "mi{}", n),
            Self::Maximum(n) => return write!(f, "ma{}", n),
        };
        // repeated so the output parses back to the same operator
        for sel in sels {
            write!(f, "{}{}", name, sel)?;
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Selector {
    Highest(usize),
    Lowest(usize),
    Less(Int),
    Greater(Int),
    Equal(Int),
}

impl Selector {
    /// Whether the selector picks dice by face value alone, without looking
    /// at the rest of the set.
    pub const fn is_comparison(&self) -> bool {
        matches!(self, Self::Less(_) | Self::Greater(_) | Self::Equal(_))
    }

    pub fn matches(&self, value: Int) -> bool {
        match *self {
            Self::Less(x) => value < x,
            Self::Greater(x) => value > x,
            Self::Equal(x) => value == x,
            Self::Highest(_) | Self::Lowest(_) => false,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Highest(n) => write!(f, "h{}", n),
            Self::Lowest(n) => write!(f, "l{}", n),
            Self::Less(x) => write!(f, "<{}", x),
            Self::Greater(x) => write!(f, ">{}", x),
            Self::Equal(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum OperatorKind {
    Keep,
    Drop,
    Reroll,
    RerollOnce,
    Explode,
    ExplodeOnce,
    Minimum,
    Maximum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sides_from_str() {
        assert_eq!("20".parse::<Sides>().unwrap(), Sides::try_from(20).unwrap());
        assert_eq!("%".parse::<Sides>().unwrap(), Sides::Percentile);
        assert!("0".parse::<Sides>().is_err());
        assert_eq!(Sides::Percentile.faces(), 100);
    }

    #[test]
    fn test_sign() {
        assert_eq!(Sign::Minus.apply(3), -3);
        assert_eq!(Sign::Plus.apply(3), 3);
        assert_eq!(Sign::Minus.then(Sign::Minus), Sign::Plus);
        assert_eq!(Sign::Plus.then(Sign::Minus), Sign::Minus);
    }

    #[test]
    fn test_display_dice_operator() {
        let op = DiceOperator::Keep(vec1![Selector::Highest(1), Selector::Lowest(1)]);
        assert_eq!(op.to_string(), "kh1kl1");
        assert_eq!(DiceOperator::Minimum(3).to_string(), "mi3");
        assert_eq!(
            DiceOperator::Reroll(vec1![Selector::Less(3)]).to_string(),
            "rr<3"
        );
    }

    #[test]
    fn test_selector_matches() {
        assert!(Selector::Less(3).matches(2));
        assert!(!Selector::Less(3).matches(3));
        assert!(Selector::Equal(6).matches(6));
        assert!(!Selector::Highest(1).matches(20));
    }
}
