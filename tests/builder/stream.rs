//! Retention annotations in stream mode.

use trellis_builder::{ConditionElement, Pattern, ReteBuilder, RuleDefinition, TemporalConstraint};
use trellis_foundation::{EntryPointId, ErrorKind, Symbol};
use trellis_network::{Expiration, KnowledgeBase, KnowledgeBaseConfig};

use crate::fixtures::{default_kb, knowledge_base, only_beta, Vocab};

fn stream_kb() -> (KnowledgeBase, Vocab) {
    knowledge_base(KnowledgeBaseConfig::stream())
}

/// `Alarm()` followed within `window` by a `Reading()`.
fn alarm_then_reading(v: &Vocab, name: &str, window: i64) -> RuleDefinition {
    RuleDefinition::new(
        name,
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::pattern(
                Pattern::new(1, v.reading)
                    .as_event()
                    .with_temporal(TemporalConstraint::after(0, 0, window)),
            ),
        ],
    )
}

fn retention(kb: &KnowledgeBase, object_type: Symbol) -> Option<Expiration> {
    let id = kb
        .network()
        .object_type_node(&EntryPointId::Default, object_type)?;
    kb.network().get(id)?.temporal
}

#[test]
fn events_are_kept_as_long_as_a_partner_may_arrive() {
    let (mut kb, v) = stream_kb();
    ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "a", 30)).unwrap();

    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Bounded(30)));
    assert_eq!(retention(&kb, v.reading), Some(Expiration::Bounded(0)));

    let join = kb
        .network()
        .iter()
        .find(|node| node.kind.name() == "join")
        .unwrap();
    assert_eq!(join.temporal, Some(Expiration::Bounded(0)));
    assert!(!only_beta(&kb, "join").cross_product);
}

#[test]
fn before_mirrors_after() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new(
        "reading-first",
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::pattern(
                Pattern::new(1, v.reading)
                    .as_event()
                    .with_temporal(TemporalConstraint::before(0, 0, 45)),
            ),
        ],
    );
    ReteBuilder::add_rule(&mut kb, rule).unwrap();

    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Bounded(0)));
    assert_eq!(retention(&kb, v.reading), Some(Expiration::Bounded(45)));
}

#[test]
fn unrelated_events_are_kept_forever() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new(
        "any-pair",
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::pattern(Pattern::new(1, v.reading).as_event()),
        ],
    );
    ReteBuilder::add_rule(&mut kb, rule).unwrap();

    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Unbounded));
}

#[test]
fn shared_roots_keep_the_longest_retention() {
    let (mut kb, v) = stream_kb();
    ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "short", 30)).unwrap();
    ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "long", 90)).unwrap();

    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Bounded(90)));
}

#[test]
fn removing_a_rule_gives_back_its_retention() {
    let (mut kb, v) = stream_kb();
    ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "short", 30)).unwrap();
    let long = ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "long", 90)).unwrap();

    ReteBuilder::remove_rule(&mut kb, long.rule).unwrap();
    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Bounded(30)));
    assert_eq!(retention(&kb, v.reading), Some(Expiration::Bounded(0)));
}

#[test]
fn last_rule_removed_clears_retention() {
    let (mut kb, v) = stream_kb();
    let a = ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "a", 30)).unwrap();

    ReteBuilder::remove_rule(&mut kb, a.rule).unwrap();
    assert_eq!(retention(&kb, v.alarm), None);
    assert_eq!(retention(&kb, v.reading), None);
}

// =============================================================================
// Or Branches
// =============================================================================

/// `Reading()` within `[min, max]` after the alarm at offset 0.
fn reading_after_alarm(v: &Vocab, min: i64, max: i64) -> ConditionElement {
    ConditionElement::pattern(
        Pattern::new(1, v.reading)
            .as_event()
            .with_temporal(TemporalConstraint::after(0, min, max)),
    )
}

#[test]
fn or_branches_get_their_own_windows() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new(
        "early-or-late",
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::or(vec![
                reading_after_alarm(&v, 0, 10),
                reading_after_alarm(&v, 20, 30),
            ]),
        ],
    );
    let build = ReteBuilder::add_rule(&mut kb, rule).unwrap();

    assert_eq!(build.terminals.len(), 2);
    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Bounded(30)));
    assert_eq!(retention(&kb, v.reading), Some(Expiration::Bounded(0)));
}

#[test]
fn or_branch_without_window_leaves_the_other_bounded() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new(
        "reading-or-invoice",
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::or(vec![
                reading_after_alarm(&v, 0, 10),
                ConditionElement::pattern(Pattern::new(2, v.invoice)),
            ]),
        ],
    );
    ReteBuilder::add_rule(&mut kb, rule).unwrap();

    assert_eq!(retention(&kb, v.reading), Some(Expiration::Bounded(0)));
    // the invoice branch pairs the alarm with an unwindowed fact
    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Unbounded));
    assert_eq!(retention(&kb, v.invoice), None);
}

#[test]
fn contradiction_in_a_later_branch_rolls_back_earlier_ones() {
    let (mut kb, v) = stream_kb();
    let impossible = ConditionElement::pattern(
        Pattern::new(1, v.reading)
            .as_event()
            .with_temporal(TemporalConstraint::after(0, 0, 10))
            .with_temporal(TemporalConstraint::after(0, 20, 30)),
    );
    let rule = RuleDefinition::new(
        "r",
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::or(vec![reading_after_alarm(&v, 0, 10), impossible]),
        ],
    );
    let err = ReteBuilder::add_rule(&mut kb, rule).unwrap_err();

    assert!(matches!(
        err.kind,
        ErrorKind::UnsatisfiableTemporal { from: 0, to: 1 }
    ));
    assert!(kb.network().is_empty());
    assert_eq!(kb.ids().len(), 0);
}

#[test]
fn facts_are_not_annotated() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new("adults", vec![ConditionElement::pattern(v.adult(0))]);
    ReteBuilder::add_rule(&mut kb, rule).unwrap();

    assert_eq!(retention(&kb, v.person), None);
    assert!(kb.network().iter().all(|node| node.temporal.is_none()));
}

#[test]
fn cloud_mode_ignores_retention() {
    let (mut kb, v) = default_kb();
    ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "a", 30)).unwrap();
    assert!(kb.network().iter().all(|node| node.temporal.is_none()));
}

#[test]
fn contradictory_windows_are_rejected() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new(
        "impossible",
        vec![
            ConditionElement::pattern(Pattern::new(0, v.alarm).as_event()),
            ConditionElement::pattern(
                Pattern::new(1, v.reading)
                    .as_event()
                    .with_temporal(TemporalConstraint::after(0, 0, 10)),
            ),
            ConditionElement::pattern(
                Pattern::new(2, v.alarm)
                    .as_event()
                    .with_temporal(TemporalConstraint::after(1, 0, 10))
                    .with_temporal(TemporalConstraint::after(0, 50, 60)),
            ),
        ],
    );
    let err = ReteBuilder::add_rule(&mut kb, rule).unwrap_err();

    assert!(matches!(err.kind, ErrorKind::UnsatisfiableTemporal { .. }));
    assert!(kb.network().is_empty());
    assert!(kb.rule_by_name("impossible").is_none());
}

#[test]
fn temporal_target_must_be_bound() {
    let (mut kb, v) = stream_kb();
    let rule = RuleDefinition::new(
        "dangling",
        vec![ConditionElement::pattern(
            Pattern::new(0, v.reading)
                .as_event()
                .with_temporal(TemporalConstraint::after(4, 0, 10)),
        )],
    );
    let err = ReteBuilder::add_rule(&mut kb, rule).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::UnboundDeclaration { offset: 4, .. }
    ));
}

#[test]
fn failed_build_restores_shared_retention() {
    let (mut kb, v) = stream_kb();
    ReteBuilder::add_rule(&mut kb, alarm_then_reading(&v, "a", 30)).unwrap();

    let mut body: Vec<_> = alarm_then_reading(&v, "b", 90).body.children.to_vec();
    body.push(ConditionElement::pattern(v.payment_for(2, 7)));
    let err = ReteBuilder::add_rule(&mut kb, RuleDefinition::new("b", body)).unwrap_err();

    assert!(matches!(err.kind, ErrorKind::UnboundDeclaration { .. }));
    assert_eq!(retention(&kb, v.alarm), Some(Expiration::Bounded(30)));
    assert_eq!(retention(&kb, v.reading), Some(Expiration::Bounded(0)));
}
