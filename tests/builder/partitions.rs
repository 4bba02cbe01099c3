//! Partition assignment across rules.

use trellis_builder::{ConditionElement, ReteBuilder, RuleDefinition};
use trellis_foundation::PartitionId;
use trellis_network::KnowledgeBaseConfig;

use crate::fixtures::{default_kb, knowledge_base, Vocab};

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

#[test]
fn unpartitioned_rules_share_one_partition() {
    let (mut kb, v) = default_kb();
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    assert_eq!(a.partition, PartitionId::SHARED);
    assert!(
        kb.network()
            .iter()
            .all(|node| node.partition == Some(PartitionId::SHARED))
    );
}

#[test]
fn each_rule_gets_a_fresh_partition() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::partitioned());
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();

    assert!(!a.partition.is_shared());
    assert!(!b.partition.is_shared());
    assert_ne!(a.partition, b.partition);
}

#[test]
fn touching_another_partition_promotes_to_shared() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::partitioned());
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    for id in a.nodes() {
        assert_eq!(kb.network().get(id).unwrap().partition, Some(a.partition));
    }

    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();
    for id in &b.shared {
        assert_eq!(
            kb.network().get(*id).unwrap().partition,
            Some(PartitionId::SHARED)
        );
    }
    for id in &b.created {
        assert_eq!(kb.network().get(*id).unwrap().partition, Some(b.partition));
    }
    for id in &a.terminals {
        assert_eq!(kb.network().get(*id).unwrap().partition, Some(a.partition));
    }
}

#[test]
fn removal_returns_survivors_to_their_partition() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::partitioned());
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();

    let removal = ReteBuilder::remove_rule(&mut kb, b.rule).unwrap();
    assert_eq!(removal.repartitioned.len(), b.shared.len());
    for id in a.nodes() {
        assert_eq!(kb.network().get(id).unwrap().partition, Some(a.partition));
    }
}

#[test]
fn shared_partition_survives_while_two_rules_remain() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::partitioned());
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders(&v, "b")).unwrap();
    let c = ReteBuilder::add_rule(&mut kb, person_orders(&v, "c")).unwrap();

    let removal = ReteBuilder::remove_rule(&mut kb, c.rule).unwrap();
    assert!(removal.repartitioned.is_empty());
    for id in &b.shared {
        assert_eq!(
            kb.network().get(*id).unwrap().partition,
            Some(PartitionId::SHARED)
        );
    }
}
