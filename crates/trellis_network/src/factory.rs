//! Node-construction strategies.

use std::fmt;

use trellis_foundation::{EntryPointId, RuleId, Symbol};

use crate::constraint::AlphaConstraint;
use crate::node::{BetaNode, NodeKind, ObjectSource, QueryArgument, TupleSource};

/// Supplies the node variants the builder attaches.
///
/// Every method has a default implementation producing the plain
/// variant; a runtime with specialised nodes overrides the ones it needs.
pub trait ComponentFactory: Send + Sync + fmt::Debug {
    /// Builds an entry-point root.
    fn entry_point(&self, id: EntryPointId) -> NodeKind {
        NodeKind::EntryPoint { id }
    }

    /// Builds an object-type root.
    fn object_type(
        &self,
        entry_point: EntryPointId,
        object_type: Symbol,
        memory_enabled: bool,
    ) -> NodeKind {
        NodeKind::ObjectType {
            entry_point,
            object_type,
            memory_enabled,
        }
    }

    /// Builds an alpha filter.
    fn alpha(&self, source: ObjectSource, constraint: AlphaConstraint) -> NodeKind {
        NodeKind::Alpha { source, constraint }
    }

    /// Builds a left-input adapter.
    fn left_input_adapter(&self, source: ObjectSource) -> NodeKind {
        NodeKind::LeftInputAdapter { source }
    }

    /// Builds a join, not, or exists node.
    fn beta(&self, beta: BetaNode) -> NodeKind {
        NodeKind::Beta(beta)
    }

    /// Builds a right-input adapter closing a subnetwork.
    fn right_input_adapter(&self, source: TupleSource) -> NodeKind {
        NodeKind::RightInputAdapter { source }
    }

    /// Builds a query invocation node.
    fn query_element(
        &self,
        left: TupleSource,
        query: Symbol,
        arguments: Vec<QueryArgument>,
    ) -> NodeKind {
        NodeKind::QueryElement {
            left,
            query,
            arguments,
        }
    }

    /// Builds a rule or query terminal.
    fn terminal(&self, source: TupleSource, rule: RuleId, sub_rule: usize, query: bool) -> NodeKind {
        NodeKind::Terminal {
            source,
            rule,
            sub_rule,
            query,
        }
    }
}

/// The default factory: plain node variants.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReteComponentFactory;

impl ComponentFactory for ReteComponentFactory {}
