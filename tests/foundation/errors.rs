//! Integration tests for Error types
//!
//! Tests error construction, display, context, and contract violations.

use trellis_foundation::{Error, ErrorContext, ErrorKind, NodeId, RuleId, StackKind};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_empty_stack() {
    let err = Error::empty_stack(StackKind::Build);
    assert!(matches!(err.kind, ErrorKind::EmptyStack(StackKind::Build)));
    assert_eq!(format!("{err}"), "build stack is empty");
}

#[test]
fn error_unbalanced_stack() {
    let err = Error::unbalanced_stack(StackKind::RuleComponent, 2);
    let msg = format!("{err}");
    assert!(msg.contains("rule component"));
    assert!(msg.contains('2'));
}

#[test]
fn error_unbound_declaration() {
    let err = Error::unbound_declaration(3, "owner");
    assert!(matches!(
        err.kind,
        ErrorKind::UnboundDeclaration { offset: 3, .. }
    ));
    let msg = format!("{err}");
    assert!(msg.contains("pattern 3"));
    assert!(msg.contains("owner"));
}

#[test]
fn error_unsatisfiable_temporal() {
    let err = Error::unsatisfiable_temporal(0, 2);
    assert!(matches!(
        err.kind,
        ErrorKind::UnsatisfiableTemporal { from: 0, to: 2 }
    ));
}

#[test]
fn error_lookups() {
    let err = Error::node_not_found(NodeId::new(9));
    assert!(format!("{err}").contains("#9"));

    let err = Error::rule_not_found(RuleId::new(4));
    assert!(format!("{err}").contains("rule#4"));

    let err = Error::duplicate_rule("adults");
    assert!(format!("{err}").contains("adults"));
}

// =============================================================================
// Contract Violations
// =============================================================================

#[test]
fn caller_bugs_are_contract_violations() {
    assert!(Error::empty_stack(StackKind::Build).is_contract_violation());
    assert!(Error::unbalanced_stack(StackKind::Build, 1).is_contract_violation());
    assert!(Error::id_never_allocated(NodeId::new(0)).is_contract_violation());
    assert!(Error::id_already_released(NodeId::new(0)).is_contract_violation());
    assert!(Error::internal("oops").is_contract_violation());
}

#[test]
fn input_errors_are_not_contract_violations() {
    assert!(!Error::unbound_declaration(0, "x").is_contract_violation());
    assert!(!Error::unsatisfiable_temporal(0, 1).is_contract_violation());
    assert!(!Error::duplicate_rule("r").is_contract_violation());
    assert!(!Error::unexpected_element("or").is_contract_violation());
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn context_attaches_to_error() {
    let context = ErrorContext::new()
        .with_rule("big-orders")
        .with_pattern_offset(1)
        .with_frame("and")
        .with_frame("pattern $1");
    let err = Error::unbound_declaration(5, "owner").with_context(context);

    let context = err.context.as_ref().unwrap();
    assert_eq!(context.rule.as_deref(), Some("big-orders"));
    assert_eq!(context.pattern_offset, Some(1));
    assert_eq!(context.stack, vec!["and", "pattern $1"]);
}

#[test]
fn context_display() {
    let context = ErrorContext::new()
        .with_rule("big-orders")
        .with_pattern_offset(1)
        .with_frame("and");
    let msg = format!("{context}");
    assert!(msg.starts_with("in rule big-orders at pattern 1"));
    assert!(msg.contains("in and"));
}
