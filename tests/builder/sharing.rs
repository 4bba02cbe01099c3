//! Node sharing between rules.

use trellis_builder::{ConditionElement, Pattern, ReteBuilder, RuleDefinition};
use trellis_foundation::EntryPointId;
use trellis_network::{
    AlphaConstraint, BetaConstraint, CompareOp, Declaration, KnowledgeBaseConfig,
};

use crate::fixtures::{count, default_kb, knowledge_base, only_beta, Vocab};

fn person_orders(v: &Vocab, name: &str) -> RuleDefinition {
    RuleDefinition::new(
        name,
        vec![
            ConditionElement::pattern(v.adult(0)),
            ConditionElement::pattern(v.order_of(1, 0)),
        ],
    )
}

fn person_orders_payments(v: &Vocab, name: &str) -> RuleDefinition {
    RuleDefinition::new(
        name,
        vec![
            ConditionElement::pattern(v.adult(0)),
            ConditionElement::pattern(v.order_of(1, 0)),
            ConditionElement::pattern(v.payment_for(2, 1)),
        ],
    )
}

// =============================================================================
// Prefix Sharing
// =============================================================================

#[test]
fn longer_rule_extends_shared_prefix() {
    let (mut kb, v) = default_kb();
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    // entry point, two object types, alpha, adapter, join, terminal
    assert_eq!(a.created.len(), 7);

    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();
    // payment object type, second join, terminal
    assert_eq!(b.created.len(), 3);
    assert_eq!(b.shared.len(), 6);

    assert_eq!(count(&kb, "join"), 2);
    assert_eq!(count(&kb, "alpha"), 1);
    assert_eq!(count(&kb, "rule-terminal"), 2);
    assert_eq!(kb.network().len(), 10);

    for id in &b.shared {
        let node = kb.network().get(*id).unwrap();
        assert!(node.rules.contains(&a.rule));
        assert!(node.rules.contains(&b.rule));
    }
}

#[test]
fn terminals_are_never_shared() {
    let (mut kb, v) = default_kb();
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders(&v, "b")).unwrap();

    assert_eq!(b.created, b.terminals);
    assert_ne!(a.terminals, b.terminals);
}

#[test]
fn sharing_ignores_declaration_numbering() {
    let (mut kb, v) = default_kb();
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();

    let renumbered = RuleDefinition::new(
        "renumbered",
        vec![
            ConditionElement::pattern(v.adult(4)),
            ConditionElement::pattern(v.order_of(9, 4)),
        ],
    );
    let b = ReteBuilder::add_rule(&mut kb, renumbered).unwrap();
    assert_eq!(b.created, b.terminals);
}

#[test]
fn different_literals_split_the_chain() {
    let (mut kb, v) = default_kb();
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();

    let seniors = RuleDefinition::new(
        "seniors",
        vec![
            ConditionElement::pattern(
                Pattern::new(0, v.person)
                    .with_alpha(AlphaConstraint::new(v.age, CompareOp::Gt, 65_i64)),
            ),
            ConditionElement::pattern(v.order_of(1, 0)),
        ],
    );
    let b = ReteBuilder::add_rule(&mut kb, seniors).unwrap();

    // alpha, adapter, join, terminal
    assert_eq!(b.created.len(), 4);
    assert_eq!(count(&kb, "object-type"), 2);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn alpha_sharing_can_be_disabled() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::default().with_alpha_sharing(false));
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "b")).unwrap();

    assert_eq!(count(&kb, "alpha"), 2);
    assert_eq!(count(&kb, "object-type"), 2);
    assert_eq!(count(&kb, "entry-point"), 1);
}

#[test]
fn beta_sharing_can_be_disabled() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::default().with_beta_sharing(false));
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "b")).unwrap();

    assert_eq!(count(&kb, "alpha"), 1);
    assert_eq!(count(&kb, "left-input-adapter"), 2);
    assert_eq!(count(&kb, "join"), 2);
}

// =============================================================================
// Roots and Joins
// =============================================================================

#[test]
fn entry_points_get_their_own_roots() {
    let (mut kb, v) = default_kb();
    let sensors = EntryPointId::named("sensors");
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    ReteBuilder::add_rule(
        &mut kb,
        RuleDefinition::new(
            "from-sensors",
            vec![ConditionElement::pattern(
                v.adult(0).from_entry_point(sensors.clone()),
            )],
        ),
    )
    .unwrap();

    assert_eq!(count(&kb, "entry-point"), 2);
    assert!(kb.network().entry_point_node(&sensors).is_some());
    assert!(kb.network().object_type_node(&sensors, v.person).is_some());
    assert_eq!(count(&kb, "alpha"), 2);
}

#[test]
fn join_records_resolved_constraints() {
    let (mut kb, v) = default_kb();
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();

    let join = only_beta(&kb, "join");
    assert!(!join.cross_product);
    assert!(join.tuple_memory);
    assert_eq!(
        join.constraints,
        vec![BetaConstraint::join(
            v.owner,
            CompareOp::Eq,
            Declaration::fact(0)
        )]
    );
}

#[test]
fn unrelated_patterns_form_a_cross_product() {
    let (mut kb, v) = default_kb();
    ReteBuilder::add_rule(
        &mut kb,
        RuleDefinition::new(
            "everything",
            vec![
                ConditionElement::pattern(Pattern::new(0, v.person)),
                ConditionElement::pattern(Pattern::new(1, v.order)),
            ],
        ),
    )
    .unwrap();

    let join = only_beta(&kb, "join");
    assert!(join.cross_product);
    assert!(join.constraints.is_empty());
}
