//! Node-sharing detection.
//!
//! Before creating a node the builder looks for an existing sink of the
//! same upstream node that already implements the same test. Matching is
//! semantic: constraints compare by value and by tuple position, never by
//! source text. Terminal nodes are never shared.

use trellis_foundation::{NodeId, Symbol};
use trellis_network::{
    AlphaConstraint, BetaConstraint, BetaNode, Network, NodeKind, ObjectSource, QueryArgument,
    TupleSource,
};

/// Constraints that take part in sharing comparisons.
///
/// With `suppress_synthetic` set the identity guard injected by for-all
/// expansion is left out.
pub fn sharing_constraints(
    constraints: &[BetaConstraint],
    suppress_synthetic: bool,
) -> impl Iterator<Item = &BetaConstraint> + '_ {
    constraints
        .iter()
        .filter(move |c| !(suppress_synthetic && c.is_synthetic()))
}

/// Returns true if two constraint lists are equal once normalized.
#[must_use]
pub fn constraints_equivalent(
    a: &[BetaConstraint],
    b: &[BetaConstraint],
    suppress_synthetic: bool,
) -> bool {
    sharing_constraints(a, suppress_synthetic).eq(sharing_constraints(b, suppress_synthetic))
}

/// Returns true if no constraint remains once normalized.
#[must_use]
pub fn is_unconstrained(constraints: &[BetaConstraint], suppress_synthetic: bool) -> bool {
    sharing_constraints(constraints, suppress_synthetic)
        .next()
        .is_none()
}

/// Finds an alpha node testing `constraint` under `source`.
#[must_use]
pub fn find_alpha(
    network: &Network,
    source: ObjectSource,
    constraint: &AlphaConstraint,
) -> Option<NodeId> {
    network.sinks(source.0).find_map(|node| match &node.kind {
        NodeKind::Alpha {
            source: s,
            constraint: c,
        } if *s == source && c == constraint => Some(node.id),
        _ => None,
    })
}

/// Finds a left-input adapter under `source`.
#[must_use]
pub fn find_left_input_adapter(network: &Network, source: ObjectSource) -> Option<NodeId> {
    network.sinks(source.0).find_map(|node| match &node.kind {
        NodeKind::LeftInputAdapter { source: s } if *s == source => Some(node.id),
        _ => None,
    })
}

/// Finds a beta node equivalent to `candidate`.
#[must_use]
pub fn find_beta(network: &Network, candidate: &BetaNode, suppress_synthetic: bool) -> Option<NodeId> {
    network
        .sinks(candidate.left.0)
        .find_map(|node| match &node.kind {
            NodeKind::Beta(existing)
                if existing.kind == candidate.kind
                    && existing.left == candidate.left
                    && existing.right == candidate.right
                    && existing.tuple_memory == candidate.tuple_memory
                    && constraints_equivalent(
                        &existing.constraints,
                        &candidate.constraints,
                        suppress_synthetic,
                    ) =>
            {
                Some(node.id)
            }
            _ => None,
        })
}

/// Finds a right-input adapter closing the subnetwork ending at `source`.
#[must_use]
pub fn find_right_input_adapter(network: &Network, source: TupleSource) -> Option<NodeId> {
    network.sinks(source.0).find_map(|node| match &node.kind {
        NodeKind::RightInputAdapter { source: s } if *s == source => Some(node.id),
        _ => None,
    })
}

/// Finds a query element invoking `query` with `arguments` under `left`.
#[must_use]
pub fn find_query_element(
    network: &Network,
    left: TupleSource,
    query: Symbol,
    arguments: &[QueryArgument],
) -> Option<NodeId> {
    network.sinks(left.0).find_map(|node| match &node.kind {
        NodeKind::QueryElement {
            left: l,
            query: q,
            arguments: a,
        } if *l == left && *q == query && a.as_slice() == arguments => Some(node.id),
        _ => None,
    })
}
