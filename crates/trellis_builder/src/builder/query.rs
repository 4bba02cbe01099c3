//! Query invocations, subnetwork adapters, and terminals.

use std::sync::Arc;

use trellis_foundation::{Error, NodeId, Result};
use trellis_network::{ObjectSource, RuleComponent, TupleSource};

use super::pattern;
use crate::condition::{ConditionElement, QueryCall};
use crate::context::BuildContext;
use crate::sharing;

/// Attaches a query invocation; its results occupy the next tuple slot.
pub(crate) fn attach_query_call(ctx: &mut BuildContext<'_>, call: &Arc<QueryCall>) -> Result<()> {
    ctx.push(ConditionElement::QueryCall(Arc::clone(call)));
    ctx.push_rule_component(RuleComponent::QueryCall { query: call.query });

    if ctx.tuple_source().is_none() {
        pattern::attach_initial_fact(ctx)?;
    }
    let left = ctx
        .tuple_source()
        .ok_or_else(|| Error::internal("query call has no left input"))?;
    let arguments = ctx.object_types().resolve_arguments(&call.arguments)?;

    let existing = if ctx.knowledge_base().config().beta_sharing {
        sharing::find_query_element(ctx.network(), left, call.query, &arguments)
    } else {
        None
    };
    let id = match existing {
        Some(id) => ctx.share_node(id, None)?,
        None => {
            let kind = ctx
                .component_factory()
                .query_element(left, call.query, arguments);
            ctx.create_node(kind, None)?
        }
    };
    ctx.set_tuple_source(Some(TupleSource(id)));
    ctx.set_last_built_pattern(Arc::clone(&call.result));
    ctx.bind_pattern(Arc::clone(&call.result));

    ctx.pop_rule_component()?;
    ctx.pop()?;
    Ok(())
}

/// Closes a subnetwork so its tuples can feed a beta node's right input.
pub(crate) fn attach_right_input_adapter(
    ctx: &mut BuildContext<'_>,
    source: TupleSource,
) -> Result<ObjectSource> {
    let existing = if ctx.knowledge_base().config().beta_sharing {
        sharing::find_right_input_adapter(ctx.network(), source)
    } else {
        None
    };
    let id = match existing {
        Some(id) => ctx.share_node(id, None)?,
        None => {
            let kind = ctx.component_factory().right_input_adapter(source);
            ctx.create_node(kind, None)?
        }
    };
    Ok(ObjectSource(id))
}

/// Attaches the terminal of the current sub-rule. Terminals are never
/// shared.
pub(crate) fn attach_terminal(ctx: &mut BuildContext<'_>) -> Result<NodeId> {
    let source = ctx
        .tuple_source()
        .ok_or_else(|| Error::internal("sub-rule produced no tuple source"))?;
    let rule = ctx
        .rule_id()
        .ok_or_else(|| Error::internal("no rule set on build context"))?;
    let sub_rule = ctx.sub_rule().map_or(0, |sub| sub.index);
    let query = ctx.is_query();
    let kind = ctx
        .component_factory()
        .terminal(source, rule, sub_rule, query);
    ctx.create_node(kind, None)
}
