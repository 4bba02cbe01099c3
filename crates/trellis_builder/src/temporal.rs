//! Temporal dependency analysis for stream mode.
//!
//! The matrix holds, for every ordered pair of pattern offsets `(i, j)`,
//! the interval of admissible values of `t(j) - t(i)`. Explicit temporal
//! constraints seed it; closing it under path consistency derives the
//! implied bounds between patterns never related directly. A pattern's
//! expiration offset is the longest time after its event that a partner
//! event may still arrive and complete a match.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use trellis_foundation::{Error, Result};
use trellis_network::{BetaConstraint, Expiration, TemporalOp};

use crate::condition::Pattern;

// =============================================================================
// Interval
// =============================================================================

/// A closed interval of time distances with unbounded ends.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    /// Lower bound; [`Interval::NEG_INF`] when unbounded.
    pub min: i64,
    /// Upper bound; [`Interval::POS_INF`] when unbounded.
    pub max: i64,
}

impl Interval {
    /// Unbounded lower end.
    pub const NEG_INF: i64 = i64::MIN;
    /// Unbounded upper end.
    pub const POS_INF: i64 = i64::MAX;
    /// Every distance is admissible.
    pub const UNBOUNDED: Self = Self {
        min: Self::NEG_INF,
        max: Self::POS_INF,
    };
    /// Exactly simultaneous.
    pub const ZERO: Self = Self { min: 0, max: 0 };

    /// Creates an interval.
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// The distances `t(this) - t(target)` a temporal operator admits.
    #[must_use]
    pub fn of(op: TemporalOp) -> Self {
        match op {
            TemporalOp::After { min, max } => Self::new(min, max),
            TemporalOp::Before { min, max } => Self::new(min, max).negate(),
            TemporalOp::Coincides { tolerance } => Self::new(-tolerance, tolerance),
        }
    }

    /// Returns true if no distance is admissible.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.min > self.max
    }

    /// Returns true if the upper end is bounded.
    #[must_use]
    pub const fn has_upper_bound(self) -> bool {
        self.max != Self::POS_INF
    }

    /// Distances admissible under both intervals.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// Sums of a distance from each interval.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        let min = if self.min == Self::NEG_INF || other.min == Self::NEG_INF {
            Self::NEG_INF
        } else {
            self.min.saturating_add(other.min)
        };
        let max = if self.max == Self::POS_INF || other.max == Self::POS_INF {
            Self::POS_INF
        } else {
            self.max.saturating_add(other.max)
        };
        Self::new(min, max)
    }

    /// The interval of negated distances.
    #[must_use]
    pub fn negate(self) -> Self {
        let flip = |bound: i64| match bound {
            Self::POS_INF => Self::NEG_INF,
            Self::NEG_INF => Self::POS_INF,
            b => -b,
        };
        Self::new(flip(self.max), flip(self.min))
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Self::NEG_INF, Self::POS_INF) => write!(f, "(-inf, +inf)"),
            (Self::NEG_INF, max) => write!(f, "(-inf, {max}]"),
            (min, Self::POS_INF) => write!(f, "[{min}, +inf)"),
            (min, max) => write!(f, "[{min}, {max}]"),
        }
    }
}

// =============================================================================
// Dependency Matrix
// =============================================================================

/// Pairwise temporal distances between the patterns of one rule.
///
/// Rows and columns cover only the offsets some pattern occupies, in
/// ascending order, so sparse offsets stay cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemporalDependencyMatrix {
    /// Occupied offsets, ascending; row `i` belongs to `offsets[i]`.
    offsets: Vec<usize>,
    cells: Vec<Interval>,
    /// Per row: whether the pattern matches events.
    events: Vec<bool>,
}

impl TemporalDependencyMatrix {
    /// Derives the matrix for the patterns of one conjunction.
    ///
    /// # Errors
    /// Returns `UnsatisfiableTemporal` if the constraints contradict each
    /// other, or `UnboundDeclaration` if one targets an offset no pattern
    /// occupies.
    pub fn calculate(patterns: &[Arc<Pattern>]) -> Result<Self> {
        let real = || patterns.iter().filter(|p| !p.is_synthetic());
        let mut offsets: Vec<usize> = real().map(|p| p.offset).collect();
        offsets.sort_unstable();
        offsets.dedup();

        let size = offsets.len();
        let mut matrix = Self {
            offsets,
            cells: vec![Interval::UNBOUNDED; size * size],
            events: vec![false; size],
        };
        for i in 0..size {
            matrix.cells[i * size + i] = Interval::ZERO;
        }
        for pattern in real() {
            if let Some(row) = matrix.row(pattern.offset) {
                matrix.events[row] |= pattern.event;
            }
        }

        for pattern in real() {
            for constraint in pattern.join_constraints() {
                if let BetaConstraint::Temporal { op, target } = constraint {
                    let (Some(from), Some(to)) = (matrix.row(target), matrix.row(pattern.offset))
                    else {
                        return Err(Error::unbound_declaration(target, "timestamp"));
                    };
                    matrix.constrain(from, to, Interval::of(op))?;
                }
            }
        }

        matrix.close()?;
        debug!(size, "temporal dependency matrix derived");
        Ok(matrix)
    }

    fn row(&self, offset: usize) -> Option<usize> {
        self.offsets.binary_search(&offset).ok()
    }

    fn size(&self) -> usize {
        self.offsets.len()
    }

    fn cell(&self, i: usize, j: usize) -> Interval {
        self.cells[i * self.size() + j]
    }

    fn set(&mut self, i: usize, j: usize, interval: Interval) {
        let size = self.size();
        self.cells[i * size + j] = interval;
    }

    /// Narrows the admissible distance from row `from` to row `to` and
    /// its mirror cell.
    fn constrain(&mut self, from: usize, to: usize, interval: Interval) -> Result<()> {
        let forward = self.cell(from, to).intersect(interval);
        if forward.is_empty() {
            return Err(Error::unsatisfiable_temporal(self.offsets[from], self.offsets[to]));
        }
        self.set(from, to, forward);
        self.set(to, from, forward.negate());
        Ok(())
    }

    /// Floyd-Warshall over interval addition and intersection.
    fn close(&mut self) -> Result<()> {
        let n = self.size();
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let through = self.cell(i, k).add(self.cell(k, j));
                    let narrowed = self.cell(i, j).intersect(through);
                    if narrowed.is_empty() {
                        return Err(Error::unsatisfiable_temporal(self.offsets[i], self.offsets[j]));
                    }
                    self.set(i, j, narrowed);
                }
            }
        }
        Ok(())
    }

    /// Admissible `t(j) - t(i)` for the patterns at offsets `i` and `j`;
    /// unbounded when either offset is not occupied.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Interval {
        match (self.row(i), self.row(j)) {
            (Some(i), Some(j)) => self.cell(i, j),
            _ if i == j => Interval::ZERO,
            _ => Interval::UNBOUNDED,
        }
    }

    /// Occupied offsets, ascending.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Returns true if the pattern at `offset` matches events.
    #[must_use]
    pub fn is_event(&self, offset: usize) -> bool {
        self.row(offset).is_some_and(|row| self.events[row])
    }

    /// How long after its own event a fact matched at `offset` must be kept.
    #[must_use]
    pub fn expiration_offset(&self, offset: usize) -> Expiration {
        let Some(row) = self.row(offset) else {
            return Expiration::Unbounded;
        };
        let mut longest = 0;
        for j in (0..self.size()).filter(|&j| j != row) {
            let distance = self.cell(row, j);
            if !distance.has_upper_bound() {
                return Expiration::Unbounded;
            }
            longest = longest.max(distance.max);
        }
        Expiration::Bounded(longest)
    }

    /// Returns true if facts matched at `offset` can be windowed out.
    #[must_use]
    pub fn is_windowable(&self, offset: usize) -> bool {
        self.expiration_offset(offset).is_bounded()
    }
}
