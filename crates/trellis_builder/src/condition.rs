//! Condition elements: the already-parsed rule bodies the builder consumes.
//!
//! Patterns are immutable once built and shared behind [`Arc`], so pushing
//! elements onto the build stack or splitting a rule into sub-rules only
//! bumps reference counts.

use std::fmt;
use std::sync::Arc;

use trellis_foundation::{EntryPointId, Result, Symbol};
use trellis_network::{AlphaConstraint, BetaConstraint, QueryArgument, TemporalOp};

use crate::transform;

// =============================================================================
// Pattern
// =============================================================================

/// A temporal constraint from a pattern to an event bound earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TemporalConstraint {
    /// The relation.
    pub op: TemporalOp,
    /// Offset of the target pattern.
    pub target: usize,
}

impl TemporalConstraint {
    /// This event occurs at least `min` and at most `max` after the target.
    #[must_use]
    pub const fn after(target: usize, min: i64, max: i64) -> Self {
        Self {
            op: TemporalOp::After { min, max },
            target,
        }
    }

    /// This event occurs at least `min` and at most `max` before the target.
    #[must_use]
    pub const fn before(target: usize, min: i64, max: i64) -> Self {
        Self {
            op: TemporalOp::Before { min, max },
            target,
        }
    }

    /// Both events occur within `tolerance` of each other.
    #[must_use]
    pub const fn coincides(target: usize, tolerance: i64) -> Self {
        Self {
            op: TemporalOp::Coincides { tolerance },
            target,
        }
    }
}

/// A single fact-matching condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Position of the pattern in the rule body.
    pub offset: usize,
    /// Fact type matched.
    pub object_type: Symbol,
    /// Entry point facts arrive through.
    pub entry_point: EntryPointId,
    /// Literal constraints, in order.
    pub alpha: Vec<AlphaConstraint>,
    /// Constraints against earlier patterns, in order.
    pub beta: Vec<BetaConstraint>,
    /// Temporal constraints against earlier events.
    pub temporal: Vec<TemporalConstraint>,
    /// Whether the matched type is a timestamped event.
    pub event: bool,
}

impl Pattern {
    /// Offset of patterns the builder injects itself.
    pub const SYNTHETIC_OFFSET: usize = usize::MAX;

    /// Creates an unconstrained pattern on the default entry point.
    #[must_use]
    pub fn new(offset: usize, object_type: Symbol) -> Self {
        Self {
            offset,
            object_type,
            entry_point: EntryPointId::Default,
            alpha: Vec::new(),
            beta: Vec::new(),
            temporal: Vec::new(),
            event: false,
        }
    }

    /// The pattern matching the single fact asserted when a session starts.
    #[must_use]
    pub fn initial_fact() -> Self {
        Self::new(Self::SYNTHETIC_OFFSET, Symbol::INITIAL_FACT)
    }

    /// Returns true for the initial-fact pattern.
    #[must_use]
    pub fn is_initial_fact(&self) -> bool {
        self.object_type == Symbol::INITIAL_FACT
    }

    /// Returns true for patterns injected by the builder.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.offset == Self::SYNTHETIC_OFFSET
    }

    /// Builder method to set the entry point.
    #[must_use]
    pub fn from_entry_point(mut self, entry_point: EntryPointId) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Builder method to add a literal constraint.
    #[must_use]
    pub fn with_alpha(mut self, constraint: AlphaConstraint) -> Self {
        self.alpha.push(constraint);
        self
    }

    /// Builder method to add a join constraint.
    #[must_use]
    pub fn with_beta(mut self, constraint: BetaConstraint) -> Self {
        self.beta.push(constraint);
        self
    }

    /// Builder method to add a temporal constraint.
    #[must_use]
    pub fn with_temporal(mut self, constraint: TemporalConstraint) -> Self {
        self.temporal.push(constraint);
        self
    }

    /// Builder method to mark the pattern as matching events.
    #[must_use]
    pub fn as_event(mut self) -> Self {
        self.event = true;
        self
    }

    /// Returns every constraint a join node must evaluate for this pattern:
    /// beta constraints followed by temporal ones.
    #[must_use]
    pub fn join_constraints(&self) -> Vec<BetaConstraint> {
        self.beta
            .iter()
            .cloned()
            .chain(self.temporal.iter().map(|t| BetaConstraint::Temporal {
                op: t.op,
                target: t.target,
            }))
            .collect()
    }

    /// Returns true if a join constraint other than a synthetic guard
    /// relates this pattern to an earlier one.
    #[must_use]
    pub fn has_real_join_constraints(&self) -> bool {
        !self.temporal.is_empty() || self.beta.iter().any(|c| !c.is_synthetic())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "{:?}()", self.object_type)
        } else {
            write!(f, "${} {:?}(", self.offset, self.object_type)?;
            let constraints = self
                .alpha
                .iter()
                .map(ToString::to_string)
                .chain(self.join_constraints().iter().map(ToString::to_string))
                .collect::<Vec<_>>();
            write!(f, "{})", constraints.join(", "))
        }
    }
}

// =============================================================================
// Groups and Elements
// =============================================================================

/// Logical connective of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// All children match.
    And,
    /// Any child matches.
    Or,
    /// No match for the conjunction of the children.
    Not,
    /// Some match for the conjunction of the children.
    Exists,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Exists => write!(f, "exists"),
        }
    }
}

/// A logical grouping of condition elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupElement {
    /// Connective.
    pub kind: GroupKind,
    /// Children, in order.
    pub children: Arc<[ConditionElement]>,
}

impl GroupElement {
    /// Creates a group.
    #[must_use]
    pub fn new(kind: GroupKind, children: Vec<ConditionElement>) -> Self {
        Self {
            kind,
            children: children.into(),
        }
    }

    /// Creates an `and` group.
    #[must_use]
    pub fn and(children: Vec<ConditionElement>) -> Self {
        Self::new(GroupKind::And, children)
    }

    /// Creates an `or` group.
    #[must_use]
    pub fn or(children: Vec<ConditionElement>) -> Self {
        Self::new(GroupKind::Or, children)
    }

    /// Creates a `not` group.
    #[must_use]
    pub fn not(children: Vec<ConditionElement>) -> Self {
        Self::new(GroupKind::Not, children)
    }

    /// Creates an `exists` group.
    #[must_use]
    pub fn exists(children: Vec<ConditionElement>) -> Self {
        Self::new(GroupKind::Exists, children)
    }

    /// Returns true if an `or` group occurs anywhere inside.
    #[must_use]
    pub fn contains_or(&self) -> bool {
        self.kind == GroupKind::Or || self.children.iter().any(ConditionElement::contains_or)
    }

    /// Returns every pattern inside the group, in body order.
    #[must_use]
    pub fn patterns(&self) -> Vec<Arc<Pattern>> {
        let mut out = Vec::new();
        for child in self.children.iter() {
            child.collect_patterns(&mut out);
        }
        out
    }

    /// Returns the single pattern child, if that is all the group holds.
    #[must_use]
    pub fn single_pattern(&self) -> Option<&Arc<Pattern>> {
        match &*self.children {
            [ConditionElement::Pattern(pattern)] => Some(pattern),
            _ => None,
        }
    }
}

/// Universal quantification: every fact matching `base` also matches
/// every pattern in `rest`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Forall {
    /// The quantified pattern.
    pub base: Arc<Pattern>,
    /// Patterns every base match must satisfy.
    pub rest: Vec<Arc<Pattern>>,
}

impl Forall {
    /// Creates a for-all element.
    #[must_use]
    pub fn new(base: Pattern, rest: Vec<Pattern>) -> Self {
        Self {
            base: Arc::new(base),
            rest: rest.into_iter().map(Arc::new).collect(),
        }
    }
}

/// Invocation of a query from inside a rule body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryCall {
    /// Invoked query.
    pub query: Symbol,
    /// Arguments, literal or bound earlier.
    pub arguments: Vec<QueryArgument>,
    /// The tuple slot the query results occupy.
    pub result: Arc<Pattern>,
}

impl QueryCall {
    /// Creates a query invocation whose results bind at `offset`.
    #[must_use]
    pub fn new(offset: usize, query: Symbol, arguments: Vec<QueryArgument>) -> Self {
        Self {
            query,
            arguments,
            result: Arc::new(Pattern::new(offset, query)),
        }
    }

    /// Offset the results bind at.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.result.offset
    }
}

/// A node of a rule's condition tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionElement {
    /// A fact-matching pattern.
    Pattern(Arc<Pattern>),
    /// A logical group.
    Group(GroupElement),
    /// Universal quantification.
    Forall(Arc<Forall>),
    /// Query invocation.
    QueryCall(Arc<QueryCall>),
}

impl ConditionElement {
    /// Wraps a pattern.
    #[must_use]
    pub fn pattern(pattern: Pattern) -> Self {
        Self::Pattern(Arc::new(pattern))
    }

    /// Wraps an `and` group.
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::Group(GroupElement::and(children))
    }

    /// Wraps an `or` group.
    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        Self::Group(GroupElement::or(children))
    }

    /// Wraps a `not` group.
    #[must_use]
    pub fn not(children: Vec<Self>) -> Self {
        Self::Group(GroupElement::not(children))
    }

    /// Wraps an `exists` group.
    #[must_use]
    pub fn exists(children: Vec<Self>) -> Self {
        Self::Group(GroupElement::exists(children))
    }

    /// Wraps a for-all element.
    #[must_use]
    pub fn forall(forall: Forall) -> Self {
        Self::Forall(Arc::new(forall))
    }

    /// Wraps a query invocation.
    #[must_use]
    pub fn query_call(call: QueryCall) -> Self {
        Self::QueryCall(Arc::new(call))
    }

    /// Returns true if an `or` group occurs anywhere inside.
    #[must_use]
    pub fn contains_or(&self) -> bool {
        match self {
            Self::Group(group) => group.contains_or(),
            Self::Pattern(_) | Self::Forall(_) | Self::QueryCall(_) => false,
        }
    }

    /// Appends every pattern inside this element, in body order.
    pub fn collect_patterns(&self, out: &mut Vec<Arc<Pattern>>) {
        match self {
            Self::Pattern(pattern) => out.push(Arc::clone(pattern)),
            Self::Group(group) => {
                for child in group.children.iter() {
                    child.collect_patterns(out);
                }
            }
            Self::Forall(forall) => {
                out.push(Arc::clone(&forall.base));
                out.extend(forall.rest.iter().cloned());
            }
            Self::QueryCall(call) => out.push(Arc::clone(&call.result)),
        }
    }

    /// Offset of the pattern this element starts with, if it is a pattern.
    #[must_use]
    pub fn pattern_offset(&self) -> Option<usize> {
        match self {
            Self::Pattern(pattern) => Some(pattern.offset),
            Self::QueryCall(call) => Some(call.offset()),
            Self::Forall(forall) => Some(forall.base.offset),
            Self::Group(_) => None,
        }
    }
}

impl fmt::Display for ConditionElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(pattern) => write!(f, "{pattern}"),
            Self::Group(group) => write!(f, "{} ({} element(s))", group.kind, group.children.len()),
            Self::Forall(forall) => write!(f, "forall {}", forall.base),
            Self::QueryCall(call) => write!(f, "?{:?}", call.query),
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Whether a definition produces activations or answers queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleKind {
    /// A production rule.
    #[default]
    Rule,
    /// A query definition.
    Query,
}

/// A rule or query definition ready to be built into the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDefinition {
    /// Unique name.
    pub name: String,
    /// Rule or query.
    pub kind: RuleKind,
    /// Condition tree; an implicit `and` of its children.
    pub body: GroupElement,
    /// Priority (higher fires first).
    pub salience: i32,
}

impl RuleDefinition {
    /// Creates a production rule.
    #[must_use]
    pub fn new(name: impl Into<String>, body: Vec<ConditionElement>) -> Self {
        Self {
            name: name.into(),
            kind: RuleKind::Rule,
            body: GroupElement::and(body),
            salience: 0,
        }
    }

    /// Creates a query definition.
    #[must_use]
    pub fn query(name: impl Into<String>, body: Vec<ConditionElement>) -> Self {
        Self {
            kind: RuleKind::Query,
            ..Self::new(name, body)
        }
    }

    /// Builder method to set the salience.
    #[must_use]
    pub fn with_salience(mut self, salience: i32) -> Self {
        self.salience = salience;
        self
    }

    /// Returns true for query definitions.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.kind == RuleKind::Query
    }

    /// Returns every pattern of the body, in body order.
    #[must_use]
    pub fn patterns(&self) -> Vec<Arc<Pattern>> {
        self.body.patterns()
    }

    /// Splits the body into `or`-free sub-rules.
    ///
    /// # Errors
    /// Returns an error if the body cannot be normalized.
    pub fn sub_rules(&self) -> Result<Vec<SubRule>> {
        transform::sub_rules(&self.body)
    }
}

/// One `or`-free conjunction of a rule body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubRule {
    /// Position among the rule's sub-rules.
    pub index: usize,
    /// The conjunction.
    pub body: GroupElement,
}
