//! Traversal of groups: `and`, `not`/`exists`, and `forall`.

use std::sync::Arc;

use trellis_foundation::{Error, Result};
use trellis_network::{BetaConstraint, BetaKind, RuleComponent};

use super::{pattern, query};
use crate::condition::{ConditionElement, Forall, GroupElement, GroupKind};
use crate::context::BuildContext;

/// Attaches any condition element.
pub(crate) fn build_element(ctx: &mut BuildContext<'_>, element: &ConditionElement) -> Result<()> {
    match element {
        ConditionElement::Pattern(p) => pattern::attach_pattern(ctx, p),
        ConditionElement::Group(group) => match group.kind {
            GroupKind::And => build_and(ctx, group),
            GroupKind::Or => Err(Error::unexpected_element(
                "or group left in a sub-rule after or-expansion",
            )),
            GroupKind::Not | GroupKind::Exists => build_negation(ctx, group),
        },
        ConditionElement::Forall(forall) => build_forall(ctx, forall),
        ConditionElement::QueryCall(call) => query::attach_query_call(ctx, call),
    }
}

pub(crate) fn build_and(ctx: &mut BuildContext<'_>, group: &GroupElement) -> Result<()> {
    ctx.push(ConditionElement::Group(group.clone()));
    for child in group.children.iter() {
        build_element(ctx, child)?;
    }
    ctx.pop()?;
    Ok(())
}

/// Attaches a `not` or `exists` group.
///
/// A group holding one pattern feeds that pattern's object side straight
/// into the beta node. Anything larger is built as a subnetwork joined
/// onto the current tuple and closed by a right-input adapter; the
/// subnetwork's patterns go out of scope afterwards.
fn build_negation(ctx: &mut BuildContext<'_>, group: &GroupElement) -> Result<()> {
    let (kind, component) = match group.kind {
        GroupKind::Not => (BetaKind::Not, RuleComponent::Not),
        GroupKind::Exists => (BetaKind::Exists, RuleComponent::Exists),
        GroupKind::And | GroupKind::Or => {
            return Err(Error::internal(format!("{} is not a negation", group.kind)));
        }
    };
    if group.children.is_empty() {
        return Err(Error::unexpected_element(format!("empty {} group", group.kind)));
    }

    ctx.push(ConditionElement::Group(group.clone()));
    ctx.push_rule_component(component);

    if ctx.tuple_source().is_none() {
        pattern::attach_initial_fact(ctx)?;
    }
    let left = ctx
        .tuple_source()
        .ok_or_else(|| Error::internal("negation has no left input"))?;
    let single_left_tuple = ctx
        .last_built_patterns()
        .latest()
        .is_some_and(|p| p.is_initial_fact());

    let (right, constraints, temporal) = if let Some(p) = group.single_pattern() {
        ctx.push(ConditionElement::Pattern(Arc::clone(p)));
        ctx.push_rule_component(RuleComponent::Pattern {
            offset: p.offset,
            object_type: p.object_type,
        });
        let constraints = ctx.object_types().resolve(&p.join_constraints())?;
        let right = pattern::attach_object_side(ctx, p)?;
        ctx.set_last_built_pattern(Arc::clone(p));
        ctx.pop_rule_component()?;
        ctx.pop()?;
        (right, constraints, ctx.expiration_for(p))
    } else {
        let offset = ctx.current_pattern_offset();
        for child in group.children.iter() {
            build_element(ctx, child)?;
        }
        let tail = ctx
            .tuple_source()
            .ok_or_else(|| Error::internal("subnetwork produced no tuple source"))?;
        let right = query::attach_right_input_adapter(ctx, tail)?;
        ctx.set_current_pattern_offset(offset);
        ctx.set_tuple_source(Some(left));
        (right, Vec::new(), None)
    };

    let saved = ctx.is_tuple_memory_enabled();
    ctx.set_tuple_memory_enabled(saved && !single_left_tuple);
    let node = pattern::attach_beta(ctx, kind, left, right, constraints, temporal);
    ctx.set_tuple_memory_enabled(saved);
    ctx.set_tuple_source(Some(node?));

    ctx.pop_rule_component()?;
    ctx.pop()?;
    Ok(())
}

/// Attaches `forall(base, rest)` as `not(base and not(rest))`.
///
/// Rest patterns of the base's type get an identity guard so they test
/// the very fact the base matched. When the guard is all that relates
/// them, it is left out of sharing comparisons.
fn build_forall(ctx: &mut BuildContext<'_>, forall: &Arc<Forall>) -> Result<()> {
    ctx.push(ConditionElement::Forall(Arc::clone(forall)));
    ctx.push_rule_component(RuleComponent::Forall);

    let (base, rest) = if forall.rest.is_empty() {
        // forall(P(c)) is forall(P(), P(c))
        let mut bare = (*forall.base).clone();
        bare.alpha.clear();
        bare.beta.clear();
        bare.temporal.clear();
        (Arc::new(bare), vec![Arc::clone(&forall.base)])
    } else {
        (Arc::clone(&forall.base), forall.rest.clone())
    };

    let guarded = rest
        .iter()
        .map(|r| {
            if r.object_type == base.object_type {
                let mut r = (**r).clone();
                r.beta.push(BetaConstraint::ForallIdentity { base: base.offset });
                ConditionElement::pattern(r)
            } else {
                ConditionElement::Pattern(Arc::clone(r))
            }
        })
        .collect();
    let only_guard = rest.iter().all(|r| !r.has_real_join_constraints());
    let expanded = GroupElement::not(vec![
        ConditionElement::Pattern(base),
        ConditionElement::not(guarded),
    ]);

    let saved = ctx.is_empty_forall_beta_constraints();
    ctx.set_empty_forall_beta_constraints(only_guard);
    let result = build_negation(ctx, &expanded);
    ctx.set_empty_forall_beta_constraints(saved);
    result?;

    ctx.pop_rule_component()?;
    ctx.pop()?;
    Ok(())
}
