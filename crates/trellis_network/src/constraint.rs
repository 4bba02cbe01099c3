//! Field constraints evaluated by alpha and beta nodes.
//!
//! Constraints are compared structurally: literal values by value and
//! bound variables by the position of the pattern that binds them, never
//! by the variable's source name.

use std::fmt;

use trellis_foundation::{Symbol, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Comparison operator of a field constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// Collection membership.
    Contains,
    /// Regular-expression match.
    Matches,
}

impl CompareOp {
    /// Returns true for operators a runtime can index (hash lookups).
    #[must_use]
    pub const fn is_indexable(self) -> bool {
        matches!(self, Self::Eq)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "contains",
            Self::Matches => "matches",
        };
        write!(f, "{s}")
    }
}

/// Intra-pattern constraint: a field compared against a literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlphaConstraint {
    /// Field read from the fact.
    pub field: Symbol,
    /// Comparison operator.
    pub op: CompareOp,
    /// Literal compared against.
    pub value: Value,
}

impl AlphaConstraint {
    /// Creates a new alpha constraint.
    #[must_use]
    pub fn new(field: Symbol, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for AlphaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {}", self.field, self.op, self.value)
    }
}

/// Reference to a field of a pattern bound earlier in the rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Declaration {
    /// Offset of the binding pattern.
    pub offset: usize,
    /// Field of the binding pattern; [`Symbol::THIS`] for the whole fact.
    pub field: Symbol,
}

impl Declaration {
    /// Creates a declaration of a pattern field.
    #[must_use]
    pub const fn new(offset: usize, field: Symbol) -> Self {
        Self { offset, field }
    }

    /// Creates a declaration of the whole fact matched by a pattern.
    #[must_use]
    pub const fn fact(offset: usize) -> Self {
        Self {
            offset,
            field: Symbol::THIS,
        }
    }
}

/// Temporal relation between the occurrence time of the right-input event
/// and the event bound at the constraint's target.
///
/// Bounds are in time units; `i64::MAX` stands for "no upper bound".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TemporalOp {
    /// This event occurs between `min` and `max` after the target.
    After {
        /// Smallest distance.
        min: i64,
        /// Largest distance.
        max: i64,
    },
    /// This event occurs between `min` and `max` before the target.
    Before {
        /// Smallest distance.
        min: i64,
        /// Largest distance.
        max: i64,
    },
    /// Both events occur within `tolerance` of each other.
    Coincides {
        /// Largest distance in either direction.
        tolerance: i64,
    },
}

impl fmt::Display for TemporalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::After { min, max } => write!(f, "after[{min},{max}]"),
            Self::Before { min, max } => write!(f, "before[{min},{max}]"),
            Self::Coincides { tolerance } => write!(f, "coincides[{tolerance}]"),
        }
    }
}

/// Cross-pattern constraint evaluated by a beta node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BetaConstraint {
    /// A field of the right-input fact compared against a bound declaration.
    Join {
        /// Field read from the right-input fact.
        field: Symbol,
        /// Comparison operator.
        op: CompareOp,
        /// Declaration the field is compared against.
        declaration: Declaration,
    },
    /// Identity guard injected by for-all expansion: the right-input fact
    /// must be the fact matched by the base pattern.
    ForallIdentity {
        /// Offset of the for-all base pattern.
        base: usize,
    },
    /// Temporal relation to an event bound earlier.
    Temporal {
        /// The relation.
        op: TemporalOp,
        /// Offset of the target pattern.
        target: usize,
    },
}

impl BetaConstraint {
    /// Creates a join constraint.
    #[must_use]
    pub const fn join(field: Symbol, op: CompareOp, declaration: Declaration) -> Self {
        Self::Join {
            field,
            op,
            declaration,
        }
    }

    /// Returns true for guards synthesized by for-all expansion.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        matches!(self, Self::ForallIdentity { .. })
    }

    /// Returns the offset of the pattern this constraint reads from.
    #[must_use]
    pub const fn referenced_offset(&self) -> usize {
        match self {
            Self::Join { declaration, .. } => declaration.offset,
            Self::ForallIdentity { base } => *base,
            Self::Temporal { target, .. } => *target,
        }
    }

    /// Returns true if a runtime can index on this constraint.
    #[must_use]
    pub const fn is_indexable(&self) -> bool {
        match self {
            Self::Join { op, .. } => op.is_indexable(),
            Self::ForallIdentity { .. } => true,
            Self::Temporal { .. } => false,
        }
    }

    /// Returns a copy reading from `offset` instead.
    #[must_use]
    pub fn with_referenced_offset(&self, offset: usize) -> Self {
        match self {
            Self::Join {
                field,
                op,
                declaration,
            } => Self::Join {
                field: *field,
                op: *op,
                declaration: Declaration::new(offset, declaration.field),
            },
            Self::ForallIdentity { .. } => Self::ForallIdentity { base: offset },
            Self::Temporal { op, .. } => Self::Temporal { op: *op, target: offset },
        }
    }
}

impl fmt::Display for BetaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join {
                field,
                op,
                declaration,
            } => write!(
                f,
                "{field:?} {op} ${}.{:?}",
                declaration.offset, declaration.field
            ),
            Self::ForallIdentity { base } => write!(f, "this == ${base}"),
            Self::Temporal { op, target } => write!(f, "this {op} ${target}"),
        }
    }
}
