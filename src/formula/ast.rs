use super::FormulaError;
use crate::common::*;
use std::fmt;
use std::str::FromStr;

type EResult = Result<Float, FormulaError>;

#[enum_dispatch::enum_dispatch]
pub trait Evaluate {
    fn evaluate(&self) -> EResult;
}

#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch::enum_dispatch(Evaluate)]
pub enum Expr {
    Literal(Literal),
    Grouping(Grouping),
    Unary(Unary),
    Binary(Binary),
    Call(Call),
}

impl Expr {
    pub(crate) fn literal(x: Float) -> Self {
        Self::Literal(Literal(x))
    }

    pub(crate) fn grouping(inner: Expr) -> Self {
        Self::Grouping(Grouping(Box::new(inner)))
    }

    pub(crate) fn unary(op: UnaryOperator, rhs: Expr) -> Self {
        Self::Unary(Unary {
            op,
            rhs: Box::new(rhs),
        })
    }

    pub(crate) fn binary(op: BinaryOperator, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary(Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        })
    }

    pub(crate) fn call(func: Function, args: Vec<Expr>) -> Self {
        Self::Call(Call { func, args })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(x) => fmt::Debug::fmt(&x.0, f),
            Self::Grouping(x) => write!(f, "({})", x.0),
            Self::Unary(x) => write!(f, "{}{}", x.op, x.rhs),
            Self::Binary(x) => write!(f, "{} {} {}", x.lhs, x.op, x.rhs),
            Self::Call(x) => {
                write!(f, "{}(", x.func)?;
                for (i, arg) in x.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Literal(pub Float);

impl Evaluate for Literal {
    fn evaluate(&self) -> EResult {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping(pub Box<Expr>);

impl Evaluate for Grouping {
    fn evaluate(&self) -> EResult {
        self.0.evaluate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOperator,
    pub rhs: Box<Expr>,
}

impl Evaluate for Unary {
    fn evaluate(&self) -> EResult {
        let x = self.rhs.evaluate()?;
        Ok(match self.op {
            UnaryOperator::Pos => x,
            UnaryOperator::Neg => -x,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub lhs: Box<Expr>,
    pub op: BinaryOperator,
    pub rhs: Box<Expr>,
}

impl Evaluate for Binary {
    fn evaluate(&self) -> EResult {
        use BinaryOperator::*;

        let lhs = self.lhs.evaluate()?;
        let rhs = self.rhs.evaluate()?;
        let value = match self.op {
            Add => lhs + rhs,
            Sub => lhs - rhs,
            Mul => lhs * rhs,
            Div if rhs == 0.0 => return Err(FormulaError::ZeroDivision),
            Div => lhs / rhs,
            Flr | Rem if rhs == 0.0 => {
                return Err(if self.op == Rem {
                    FormulaError::ZeroModulo
                } else {
                    FormulaError::ZeroDivision
                })
            }
            Flr | Rem if lhs.fract() != 0.0 || rhs.fract() != 0.0 => {
                return Err(FormulaError::IntegerOperands(self.op))
            }
            Flr => (lhs / rhs).floor(),
            Rem => lhs % rhs,
            Lt => bool_value(lhs < rhs),
            Gt => bool_value(lhs > rhs),
            Le => bool_value(lhs <= rhs),
            Ge => bool_value(lhs >= rhs),
            Eq => bool_value(lhs == rhs),
            Ne => bool_value(lhs != rhs),
        };
        finite(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: Function,
    pub args: Vec<Expr>,
}

impl Evaluate for Call {
    fn evaluate(&self) -> EResult {
        let args = self
            .args
            .iter()
            .map(Evaluate::evaluate)
            .collect::<Result<Vec<_>, _>>()?;
        self.func.apply(&args)
    }
}

/// The only functions a formula may call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Function {
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Abs,
}

impl Function {
    pub const ALL: [Self; 6] = [
        Self::Min,
        Self::Max,
        Self::Floor,
        Self::Ceil,
        Self::Round,
        Self::Abs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Abs => "abs",
        }
    }

    /// `None` for the variadic `min`/`max`, which still need one argument.
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::Min | Self::Max => None,
            Self::Floor | Self::Ceil | Self::Round | Self::Abs => Some(1),
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self.arity() {
            Some(n) => count == n,
            None => count >= 1,
        }
    }

    fn apply(self, args: &[Float]) -> EResult {
        let value = match (self, args) {
            (Self::Min, [first, rest @ ..]) => rest.iter().copied().fold(*first, Float::min),
            (Self::Max, [first, rest @ ..]) => rest.iter().copied().fold(*first, Float::max),
            (Self::Floor, [x]) => x.floor(),
            (Self::Ceil, [x]) => x.ceil(),
            (Self::Round, [x]) => x.round(),
            (Self::Abs, [x]) => x.abs(),
            // arity is checked while parsing
            _ => return Err(FormulaError::NonFinite),
        };
        finite(value)
    }
}

impl FromStr for Function {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|func| func.name() == s)
            .ok_or(())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn bool_value(b: bool) -> Float {
    if b {
        1.0
    } else {
        0.0
    }
}

fn finite(x: Float) -> EResult {
    if x.is_finite() {
        Ok(x)
    } else {
        Err(FormulaError::NonFinite)
    }
}
