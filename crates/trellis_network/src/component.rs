//! Rule-language constructs traced back from built nodes.

use std::fmt;

use trellis_foundation::Symbol;

use crate::constraint::{AlphaConstraint, BetaConstraint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named construct of the rule-authoring language.
///
/// The builder stamps the component on top of its trace stack onto every
/// node it creates, so a node can be traced back to the construct that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RuleComponent {
    /// A whole rule or query.
    Rule {
        /// Rule name.
        name: String,
    },
    /// A pattern at an offset.
    Pattern {
        /// Pattern offset.
        offset: usize,
        /// Object type matched.
        object_type: Symbol,
    },
    /// A literal constraint inside a pattern.
    AlphaConstraint(AlphaConstraint),
    /// A join constraint inside a pattern.
    BetaConstraint(BetaConstraint),
    /// A `not` group.
    Not,
    /// An `exists` group.
    Exists,
    /// A `forall` element.
    Forall,
    /// A query invocation.
    QueryCall {
        /// Invoked query.
        query: Symbol,
    },
}

impl fmt::Display for RuleComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule { name } => write!(f, "rule {name}"),
            Self::Pattern {
                offset,
                object_type,
            } => write!(f, "pattern {offset} ({object_type:?})"),
            Self::AlphaConstraint(c) => write!(f, "constraint {c}"),
            Self::BetaConstraint(c) => write!(f, "constraint {c}"),
            Self::Not => write!(f, "not"),
            Self::Exists => write!(f, "exists"),
            Self::Forall => write!(f, "forall"),
            Self::QueryCall { query } => write!(f, "query {query:?}"),
        }
    }
}
