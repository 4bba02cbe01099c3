//! Network vertices.
//!
//! Every node shares a common header (id, partition, temporal annotation,
//! owning rules, sinks) and carries a closed [`NodeKind`] variant.

use std::fmt;

use im::{OrdMap, OrdSet};
use trellis_foundation::{EntryPointId, NodeId, PartitionId, RuleId, Symbol, Value};

use crate::component::RuleComponent;
use crate::constraint::{AlphaConstraint, BetaConstraint, Declaration};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// =============================================================================
// Attachment Handles
// =============================================================================

/// A node that propagates single facts (entry point, object type, alpha,
/// right-input adapter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectSource(pub NodeId);

/// A node that propagates tuples of facts (left-input adapter, beta,
/// query element).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TupleSource(pub NodeId);

// =============================================================================
// Temporal Annotation
// =============================================================================

/// How long a fact reaching a node must be retained to satisfy every
/// temporal join downstream of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Expiration {
    /// Facts may be dropped after this many time units.
    Bounded(i64),
    /// Some downstream join has no upper bound; facts never expire.
    Unbounded,
}

impl Expiration {
    /// Combines the requirements of two rules sharing a node.
    ///
    /// The longer retention wins; unbounded dominates.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bounded(a), Self::Bounded(b)) => Self::Bounded(a.max(b)),
            _ => Self::Unbounded,
        }
    }

    /// Returns true if windowing can drop facts at this node.
    #[must_use]
    pub const fn is_bounded(self) -> bool {
        matches!(self, Self::Bounded(_))
    }
}

// =============================================================================
// Node Kinds
// =============================================================================

/// Flavour of a two-input node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BetaKind {
    /// Positive join.
    Join,
    /// Negation: propagates when no right fact matches.
    Not,
    /// Existential: propagates once when some right fact matches.
    Exists,
}

impl fmt::Display for BetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => write!(f, "join"),
            Self::Not => write!(f, "not"),
            Self::Exists => write!(f, "exists"),
        }
    }
}

/// A two-input node joining a tuple source with an object source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BetaNode {
    /// Join flavour.
    pub kind: BetaKind,
    /// Left (tuple) input.
    pub left: TupleSource,
    /// Right (object) input.
    pub right: ObjectSource,
    /// Cross-pattern constraints.
    pub constraints: Vec<BetaConstraint>,
    /// Whether left tuples are memorized.
    pub tuple_memory: bool,
    /// True when no real constraint relates the two inputs.
    pub cross_product: bool,
}

/// The variant part of a node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// Root of one entry point.
    EntryPoint {
        /// The entry point.
        id: EntryPointId,
    },
    /// Root per fact type under an entry point.
    ObjectType {
        /// Owning entry point.
        entry_point: EntryPointId,
        /// Fact type.
        object_type: Symbol,
        /// Whether facts are memorized at this node.
        memory_enabled: bool,
    },
    /// Single-pattern filter.
    Alpha {
        /// Upstream object source.
        source: ObjectSource,
        /// Literal constraint tested.
        constraint: AlphaConstraint,
    },
    /// Turns facts into one-element tuples.
    LeftInputAdapter {
        /// Upstream object source.
        source: ObjectSource,
    },
    /// Join, negation, or existential test.
    Beta(BetaNode),
    /// Turns subnetwork tuples back into objects for a not/exists node.
    RightInputAdapter {
        /// Subnetwork tail.
        source: TupleSource,
    },
    /// Invocation of a query from a rule body.
    QueryElement {
        /// Upstream tuple source.
        left: TupleSource,
        /// Invoked query.
        query: Symbol,
        /// Arguments, literal or bound.
        arguments: Vec<QueryArgument>,
    },
    /// Rule or query terminal.
    Terminal {
        /// Upstream tuple source.
        source: TupleSource,
        /// Owning rule.
        rule: RuleId,
        /// Index of the sub-rule after or-expansion.
        sub_rule: usize,
        /// True for query terminals.
        query: bool,
    },
}

/// An argument of a query invocation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QueryArgument {
    /// Literal argument.
    Literal(Value),
    /// Argument bound earlier in the rule.
    Bound(Declaration),
}

impl NodeKind {
    /// Returns the nodes this node receives from.
    #[must_use]
    pub fn sources(&self) -> Vec<NodeId> {
        match self {
            Self::EntryPoint { .. } | Self::ObjectType { .. } => Vec::new(),
            Self::Alpha { source, .. } | Self::LeftInputAdapter { source } => vec![source.0],
            Self::Beta(beta) => vec![beta.left.0, beta.right.0],
            Self::RightInputAdapter { source }
            | Self::QueryElement { left: source, .. }
            | Self::Terminal { source, .. } => vec![source.0],
        }
    }

    /// Returns true for type-root nodes that persist across rules.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::EntryPoint { .. } | Self::ObjectType { .. })
    }

    /// Returns true for nodes other nodes can take facts from.
    #[must_use]
    pub const fn is_object_source(&self) -> bool {
        matches!(
            self,
            Self::EntryPoint { .. }
                | Self::ObjectType { .. }
                | Self::Alpha { .. }
                | Self::RightInputAdapter { .. }
        )
    }

    /// Returns true for nodes other nodes can take tuples from.
    #[must_use]
    pub const fn is_tuple_source(&self) -> bool {
        matches!(
            self,
            Self::LeftInputAdapter { .. } | Self::Beta(_) | Self::QueryElement { .. }
        )
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EntryPoint { .. } => "entry-point",
            Self::ObjectType { .. } => "object-type",
            Self::Alpha { .. } => "alpha",
            Self::LeftInputAdapter { .. } => "left-input-adapter",
            Self::Beta(beta) => match beta.kind {
                BetaKind::Join => "join",
                BetaKind::Not => "not",
                BetaKind::Exists => "exists",
            },
            Self::RightInputAdapter { .. } => "right-input-adapter",
            Self::QueryElement { .. } => "query-element",
            Self::Terminal { query: false, .. } => "rule-terminal",
            Self::Terminal { query: true, .. } => "query-terminal",
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// A vertex of the discrimination network.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    /// Unique id within the knowledge base.
    pub id: NodeId,
    /// Variant data.
    pub kind: NodeKind,
    /// Partition evaluating this node; `None` until stamped.
    pub partition: Option<PartitionId>,
    /// Retention requirement in stream mode; the merge of `expirations`.
    pub temporal: Option<Expiration>,
    /// Retention each rule asked for.
    pub expirations: OrdMap<RuleId, Expiration>,
    /// Rules referencing this node.
    pub rules: OrdSet<RuleId>,
    /// Construct that first produced the node.
    pub origin: Option<RuleComponent>,
    /// Downstream nodes, in attachment order.
    pub sinks: Vec<NodeId>,
}

impl Node {
    /// Creates an unstamped node with no owners and no sinks.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            partition: None,
            temporal: None,
            expirations: OrdMap::new(),
            rules: OrdSet::new(),
            origin: None,
            sinks: Vec::new(),
        }
    }

    /// Returns true if more than one rule references the node.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.rules.len() > 1
    }

    /// Records a rule's retention requirement and merges it into
    /// `temporal`.
    pub fn require_retention(&mut self, rule: RuleId, expiration: Expiration) {
        let merged = self
            .expirations
            .get(&rule)
            .map_or(expiration, |e| e.merge(expiration));
        self.expirations.insert(rule, merged);
        self.temporal = Some(self.temporal.map_or(expiration, |e| e.merge(expiration)));
    }

    /// Drops a rule's retention requirement and recomputes `temporal` from
    /// the rules left.
    pub fn release_retention(&mut self, rule: RuleId) {
        if self.expirations.remove(&rule).is_some() {
            self.temporal = self.expirations.values().copied().reduce(Expiration::merge);
        }
    }

    /// Returns the beta payload, if this is a beta node.
    #[must_use]
    pub fn as_beta(&self) -> Option<&BetaNode> {
        match &self.kind {
            NodeKind::Beta(beta) => Some(beta),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.name(), self.id)
    }
}
