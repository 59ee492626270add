use std::fmt;

use serde::{Deserialize, Serialize};

/// Cell value of a design structure matrix.
///
/// A two-operation semiring: `plus` accumulates alternative paths, `times`
/// composes them. The boolean relation and non-negative reals are the two
/// instances used in practice; a general computer-algebra field abstraction
/// is deliberately avoided.
pub trait CellValue: Clone + PartialEq + fmt::Debug {
    fn zero() -> Self;
    fn one() -> Self;
    fn plus(&self, other: &Self) -> Self;
    fn times(&self, other: &Self) -> Self;

    /// True if the cell marks a dependency (nonzero).
    fn is_set(&self) -> bool;

    /// Integer magnitude used by the cost model.
    fn weight(&self) -> u64;
}

/// Binary dependency cell: OR as addition, AND as multiplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency(pub bool);

impl Dependency {
    pub const NO: Dependency = Dependency(false);
    pub const YES: Dependency = Dependency(true);
}

impl CellValue for Dependency {
    fn zero() -> Self {
        Dependency::NO
    }

    fn one() -> Self {
        Dependency::YES
    }

    fn plus(&self, other: &Self) -> Self {
        Dependency(self.0 || other.0)
    }

    fn times(&self, other: &Self) -> Self {
        Dependency(self.0 && other.0)
    }

    fn is_set(&self) -> bool {
        self.0
    }

    fn weight(&self) -> u64 {
        u64::from(self.0)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.0 { "1" } else { "0" })
    }
}

impl From<bool> for Dependency {
    fn from(value: bool) -> Self {
        Dependency(value)
    }
}

/// Weighted variant: non-negative real dependency strengths.
impl CellValue for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn plus(&self, other: &Self) -> Self {
        self + other
    }

    fn times(&self, other: &Self) -> Self {
        self * other
    }

    fn is_set(&self) -> bool {
        *self != 0.0
    }

    fn weight(&self) -> u64 {
        *self as u64
    }
}
