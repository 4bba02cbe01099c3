//! Or-expansion of rule bodies into disjunctive normal form.
//!
//! A rule whose body contains `or` groups is split into one sub-rule per
//! disjunct. Negation is pushed through `or` with De Morgan's law
//! (`not(a or b)` becomes `not(a) and not(b)`) and `exists` distributes
//! over `or` (`exists(a or b)` becomes `exists(a) or exists(b)`).

use tracing::debug;
use trellis_foundation::{Error, Result};

use crate::condition::{ConditionElement, GroupElement, GroupKind, SubRule};

/// A conjunction of `or`-free elements.
type Conjunction = Vec<ConditionElement>;

/// Splits a rule body into `or`-free sub-rules.
///
/// A body without `or` yields exactly one sub-rule equal to the body.
///
/// # Errors
/// Returns an error if an `or` group has no children.
pub fn sub_rules(body: &GroupElement) -> Result<Vec<SubRule>> {
    if !body.contains_or() {
        return Ok(vec![SubRule {
            index: 0,
            body: body.clone(),
        }]);
    }

    let disjuncts = expand_group(body)?;
    debug!(sub_rules = disjuncts.len(), "or-expanded rule body");
    Ok(disjuncts
        .into_iter()
        .enumerate()
        .map(|(index, conjunction)| SubRule {
            index,
            body: GroupElement::and(conjunction),
        })
        .collect())
}

fn expand(element: &ConditionElement) -> Result<Vec<Conjunction>> {
    match element {
        ConditionElement::Group(group) => expand_group(group),
        ConditionElement::Pattern(_)
        | ConditionElement::Forall(_)
        | ConditionElement::QueryCall(_) => Ok(vec![vec![element.clone()]]),
    }
}

fn expand_group(group: &GroupElement) -> Result<Vec<Conjunction>> {
    match group.kind {
        GroupKind::And => expand_and(&group.children),
        GroupKind::Or => {
            if group.children.is_empty() {
                return Err(Error::unexpected_element("empty or group"));
            }
            let mut disjuncts = Vec::new();
            for child in group.children.iter() {
                disjuncts.extend(expand(child)?);
            }
            Ok(disjuncts)
        }
        GroupKind::Not => {
            if !group.contains_or() {
                return Ok(vec![vec![ConditionElement::Group(group.clone())]]);
            }
            let negated = expand_and(&group.children)?
                .into_iter()
                .map(ConditionElement::not)
                .collect();
            Ok(vec![negated])
        }
        GroupKind::Exists => {
            if !group.contains_or() {
                return Ok(vec![vec![ConditionElement::Group(group.clone())]]);
            }
            Ok(expand_and(&group.children)?
                .into_iter()
                .map(|conjunction| vec![ConditionElement::exists(conjunction)])
                .collect())
        }
    }
}

/// Cartesian product of the children's disjuncts.
fn expand_and(children: &[ConditionElement]) -> Result<Vec<Conjunction>> {
    let mut product: Vec<Conjunction> = vec![Vec::new()];
    for child in children {
        let alternatives = expand(child)?;
        let mut next = Vec::with_capacity(product.len() * alternatives.len());
        for prefix in &product {
            for alternative in &alternatives {
                let mut conjunction = prefix.clone();
                conjunction.extend(alternative.iter().cloned());
                next.push(conjunction);
            }
        }
        product = next;
    }
    Ok(product)
}
