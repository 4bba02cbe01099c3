//! Rule removal, id reuse, rollback, and working-memory notification.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use trellis_builder::{BuildContext, ConditionElement, ReteBuilder, RuleDefinition};
use trellis_foundation::{ErrorKind, NodeId, RuleId};
use trellis_network::{KnowledgeBaseConfig, WorkingMemory};

use crate::fixtures::{count, default_kb, knowledge_base, Vocab};

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

#[derive(Default)]
struct Recorder {
    attached: Mutex<Vec<(RuleId, Vec<NodeId>)>>,
    detached: Mutex<Vec<(RuleId, Vec<NodeId>)>>,
}

impl WorkingMemory for Recorder {
    fn id(&self) -> u64 {
        1
    }

    fn nodes_attached(&self, rule: RuleId, nodes: &[NodeId]) {
        self.attached.lock().unwrap().push((rule, nodes.to_vec()));
    }

    fn nodes_detached(&self, rule: RuleId, nodes: &[NodeId]) {
        self.detached.lock().unwrap().push((rule, nodes.to_vec()));
    }
}

// =============================================================================
// Removal
// =============================================================================

#[test]
fn removing_a_rule_keeps_nodes_others_use() {
    let (mut kb, v) = default_kb();
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();

    let removal = ReteBuilder::remove_rule(&mut kb, a.rule).unwrap();
    assert_eq!(removal.removed, a.terminals);
    for id in &b.shared {
        let node = kb.network().get(*id).unwrap();
        assert_eq!(node.rules.len(), 1);
        assert!(node.rules.contains(&b.rule));
    }
    assert!(kb.rule(a.rule).is_none());
}

#[test]
fn removing_every_rule_leaves_only_roots() {
    let (mut kb, v) = default_kb();
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();

    ReteBuilder::remove_rule(&mut kb, b.rule).unwrap();
    ReteBuilder::remove_rule(&mut kb, a.rule).unwrap();

    assert!(kb.network().iter().all(|node| node.kind.is_root()));
    assert_eq!(count(&kb, "object-type"), 3);
    assert_eq!(kb.ids().len(), kb.network().len());
    assert_eq!(kb.rules().count(), 0);
}

#[test]
fn released_ids_are_reused_by_later_rules() {
    let (mut kb, v) = default_kb();
    ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let b = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "b")).unwrap();
    let high_water = kb.ids().high_water_mark();

    let removal = ReteBuilder::remove_rule(&mut kb, b.rule).unwrap();
    let released: BTreeSet<_> = removal.removed.iter().copied().collect();

    let c = ReteBuilder::add_rule(&mut kb, person_orders_payments(&v, "c")).unwrap();
    let reused: BTreeSet<_> = c.created.iter().copied().collect();

    assert_eq!(reused, released);
    assert_eq!(kb.ids().high_water_mark(), high_water);
    for id in &released {
        assert_eq!(kb.ids().allocation_count(*id), 2);
    }
}

#[test]
fn removing_an_unknown_rule_fails() {
    let (mut kb, _) = default_kb();
    let err = ReteBuilder::remove_rule(&mut kb, RuleId::new(3)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RuleNotFound(_)));
    assert!(ReteBuilder::remove_rule_named(&mut kb, "missing").is_err());
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn failed_build_restores_shared_partitions() {
    let (mut kb, v) = knowledge_base(KnowledgeBaseConfig::partitioned());
    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    let before = kb.network().len();

    let broken = RuleDefinition::new(
        "broken",
        vec![
            ConditionElement::pattern(v.adult(0)),
            ConditionElement::pattern(v.order_of(1, 0)),
            ConditionElement::pattern(v.payment_for(2, 1)),
            ConditionElement::pattern(v.payment_for(3, 8)),
        ],
    );
    let err = ReteBuilder::add_rule(&mut kb, broken).unwrap_err();

    assert!(matches!(
        err.kind,
        ErrorKind::UnboundDeclaration { offset: 8, .. }
    ));
    assert_eq!(kb.network().len(), before);
    assert_eq!(kb.ids().len(), before);
    for node in kb.network().iter() {
        assert_eq!(node.partition, Some(a.partition));
        assert_eq!(node.rules.len(), 1);
    }
}

#[test]
fn failed_build_reports_where_it_stopped() {
    let (mut kb, v) = default_kb();
    let broken = RuleDefinition::new(
        "broken",
        vec![
            ConditionElement::pattern(v.adult(0)),
            ConditionElement::not(vec![ConditionElement::pattern(v.order_of(1, 5))]),
        ],
    );
    let err = ReteBuilder::add_rule(&mut kb, broken).unwrap_err();

    let context = err.context.as_ref().unwrap();
    assert_eq!(context.rule.as_deref(), Some("broken"));
    assert_eq!(context.pattern_offset, Some(1));
    assert!(context.stack.len() >= 3);
    assert!(kb.network().is_empty());
}

#[test]
fn context_is_reusable_after_a_failure() {
    let (mut kb, v) = default_kb();
    let mut ctx = BuildContext::new(&mut kb);

    let broken = RuleDefinition::new(
        "broken",
        vec![ConditionElement::pattern(v.order_of(0, 3))],
    );
    assert!(ReteBuilder::build(&mut ctx, broken).is_err());

    let build = ReteBuilder::build(&mut ctx, person_orders(&v, "a")).unwrap();
    assert_eq!(build.created.len(), 7);
    assert!(ctx.check_balanced().is_ok());
}

#[test]
fn batch_stops_at_first_failure() {
    let (mut kb, v) = default_kb();
    let rules = vec![
        person_orders(&v, "a"),
        RuleDefinition::new("broken", vec![ConditionElement::pattern(v.order_of(0, 3))]),
        person_orders(&v, "c"),
    ];
    assert!(ReteBuilder::add_rules(&mut kb, rules).is_err());

    assert!(kb.rule_by_name("a").is_some());
    assert!(kb.rule_by_name("broken").is_none());
    assert!(kb.rule_by_name("c").is_none());
}

// =============================================================================
// Working Memories
// =============================================================================

#[test]
fn working_memories_hear_about_attach_and_detach() {
    let (mut kb, v) = default_kb();
    let memory = Arc::new(Recorder::default());
    kb.attach_working_memory(memory.clone());

    let a = ReteBuilder::add_rule(&mut kb, person_orders(&v, "a")).unwrap();
    {
        let attached = memory.attached.lock().unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].0, a.rule);
        assert_eq!(attached[0].1.len(), 7);
    }

    let removal = ReteBuilder::remove_rule(&mut kb, a.rule).unwrap();
    let detached = memory.detached.lock().unwrap();
    assert_eq!(detached.len(), 1);
    assert_eq!(detached[0].1, removal.removed);
}

#[test]
fn failed_builds_are_not_announced() {
    let (mut kb, v) = default_kb();
    let memory = Arc::new(Recorder::default());
    kb.attach_working_memory(memory.clone());

    let broken = RuleDefinition::new("broken", vec![ConditionElement::pattern(v.order_of(0, 3))]);
    assert!(ReteBuilder::add_rule(&mut kb, broken).is_err());
    assert!(memory.attached.lock().unwrap().is_empty());
}
