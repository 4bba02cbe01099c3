//! Attachment of single patterns: entry point, object type, alpha chain,
//! and the adapter or join that brings the pattern into the tuple.

use std::sync::Arc;

use tracing::{debug, warn};
use trellis_foundation::{EntryPointId, Error, NodeId, Result, Symbol};
use trellis_network::{
    AlphaConstraint, BetaConstraint, BetaKind, BetaNode, Expiration, ObjectSource, RuleComponent,
    TupleSource,
};

use crate::condition::{ConditionElement, GroupKind, Pattern};
use crate::context::BuildContext;
use crate::sharing;

/// Attaches a positive pattern and joins it onto the current tuple.
pub(crate) fn attach_pattern(ctx: &mut BuildContext<'_>, pattern: &Arc<Pattern>) -> Result<()> {
    ctx.push(ConditionElement::Pattern(Arc::clone(pattern)));
    ctx.push_rule_component(RuleComponent::Pattern {
        offset: pattern.offset,
        object_type: pattern.object_type,
    });

    let constraints = ctx.object_types().resolve(&pattern.join_constraints())?;
    let object = attach_object_side(ctx, pattern)?;
    ctx.set_last_built_pattern(Arc::clone(pattern));

    let tuple = match ctx.tuple_source() {
        None => attach_left_input_adapter(ctx, object)?,
        Some(left) => {
            let suppress = ctx.is_empty_forall_beta_constraints();
            if ctx.object_types().is_cross_product(pattern, suppress) {
                report_cross_product(ctx);
            }
            let temporal = ctx.expiration_for(pattern);
            attach_beta(ctx, BetaKind::Join, left, object, constraints, temporal)?
        }
    };
    ctx.set_tuple_source(Some(tuple));
    ctx.bind_pattern(Arc::clone(pattern));

    ctx.pop_rule_component()?;
    ctx.pop()?;
    Ok(())
}

/// Attaches the synthetic initial-fact pattern as the first tuple slot.
pub(crate) fn attach_initial_fact(ctx: &mut BuildContext<'_>) -> Result<()> {
    if ctx.tuple_source().is_some() {
        return Err(Error::internal("initial fact attached after the first pattern"));
    }
    debug!("injecting initial-fact pattern");
    attach_pattern(ctx, &Arc::new(Pattern::initial_fact()))
}

/// Builds the object side of a pattern and returns its last node.
pub(crate) fn attach_object_side(
    ctx: &mut BuildContext<'_>,
    pattern: &Pattern,
) -> Result<ObjectSource> {
    let temporal = ctx.expiration_for(pattern);
    ctx.set_current_entry_point(pattern.entry_point.clone());
    attach_entry_point(ctx, &pattern.entry_point)?;

    let otn = attach_object_type(ctx, &pattern.entry_point, pattern.object_type, temporal)?;
    ctx.set_root_object_type_node(Some(otn));
    ctx.set_alpha_constraints(pattern.alpha.clone());

    let mut source = ObjectSource(otn);
    for constraint in &pattern.alpha {
        ctx.push_rule_component(RuleComponent::AlphaConstraint(constraint.clone()));
        source = attach_alpha(ctx, source, constraint, temporal)?;
        ctx.pop_rule_component()?;
    }
    ctx.set_object_source(Some(source));
    Ok(source)
}

fn attach_entry_point(ctx: &mut BuildContext<'_>, entry_point: &EntryPointId) -> Result<NodeId> {
    if let Some(id) = ctx.network().entry_point_node(entry_point) {
        return ctx.share_node(id, None);
    }
    let kind = ctx.component_factory().entry_point(entry_point.clone());
    ctx.create_node(kind, None)
}

fn attach_object_type(
    ctx: &mut BuildContext<'_>,
    entry_point: &EntryPointId,
    object_type: Symbol,
    temporal: Option<Expiration>,
) -> Result<NodeId> {
    if let Some(id) = ctx.network().object_type_node(entry_point, object_type) {
        return ctx.share_node(id, temporal);
    }
    let memory = ctx.is_object_type_node_memory_enabled();
    let kind = ctx
        .component_factory()
        .object_type(entry_point.clone(), object_type, memory);
    ctx.create_node(kind, temporal)
}

fn attach_alpha(
    ctx: &mut BuildContext<'_>,
    source: ObjectSource,
    constraint: &AlphaConstraint,
    temporal: Option<Expiration>,
) -> Result<ObjectSource> {
    let existing = if ctx.knowledge_base().config().alpha_sharing {
        sharing::find_alpha(ctx.network(), source, constraint)
    } else {
        None
    };
    let id = match existing {
        Some(id) => ctx.share_node(id, temporal)?,
        None => {
            let kind = ctx.component_factory().alpha(source, constraint.clone());
            ctx.create_node(kind, temporal)?
        }
    };
    Ok(ObjectSource(id))
}

fn attach_left_input_adapter(
    ctx: &mut BuildContext<'_>,
    source: ObjectSource,
) -> Result<TupleSource> {
    let existing = if ctx.knowledge_base().config().beta_sharing {
        sharing::find_left_input_adapter(ctx.network(), source)
    } else {
        None
    };
    let id = match existing {
        Some(id) => ctx.share_node(id, None)?,
        None => {
            let kind = ctx.component_factory().left_input_adapter(source);
            ctx.create_node(kind, None)?
        }
    };
    Ok(TupleSource(id))
}

/// Attaches a join, not, or exists node, sharing an equivalent one if the
/// configuration allows.
pub(crate) fn attach_beta(
    ctx: &mut BuildContext<'_>,
    kind: BetaKind,
    left: TupleSource,
    right: ObjectSource,
    constraints: Vec<BetaConstraint>,
    temporal: Option<Expiration>,
) -> Result<TupleSource> {
    let suppress = ctx.is_empty_forall_beta_constraints();
    ctx.set_beta_constraints(constraints.clone());
    let candidate = BetaNode {
        kind,
        left,
        right,
        cross_product: sharing::is_unconstrained(&constraints, suppress),
        tuple_memory: ctx.is_tuple_memory_enabled(),
        constraints,
    };

    let existing = if ctx.knowledge_base().config().beta_sharing {
        sharing::find_beta(ctx.network(), &candidate, suppress)
    } else {
        None
    };
    let id = match existing {
        Some(id) => ctx.share_node(id, temporal)?,
        None => {
            let node = ctx.component_factory().beta(candidate);
            ctx.create_node(node, temporal)?
        }
    };
    Ok(TupleSource(id))
}

fn report_cross_product(ctx: &BuildContext<'_>) {
    let rule = ctx.rule().map_or("", |rule| rule.name.as_str());
    let last = ctx.last_built_patterns();
    let (Some(latest), Some(previous)) = (last.latest(), last.previous()) else {
        return;
    };
    if previous.is_synthetic()
        || ctx
            .build_stack()
            .is_some_and(|stack| stack.enclosing(GroupKind::Not) || stack.enclosing(GroupKind::Exists))
    {
        debug!(rule, pattern = %latest, after = %previous, "cross product");
    } else {
        warn!(rule, pattern = %latest, after = %previous, "cross product between patterns");
    }
}
