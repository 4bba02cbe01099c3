//! Integration tests for Value and interning
//!
//! Literal values compare by value; interned names compare by symbol.

use std::collections::HashSet;

use trellis_foundation::{Interner, Symbol, Value};

// =============================================================================
// Values
// =============================================================================

#[test]
fn values_compare_by_value() {
    assert_eq!(Value::from(18_i64), Value::Int(18));
    assert_eq!(Value::from("gold"), Value::from("gold"));
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert_eq!(Value::Float(0.5), Value::Float(0.5));
}

#[test]
fn values_hash_consistently() {
    let mut set = HashSet::new();
    set.insert(Value::from("gold"));
    set.insert(Value::from("gold"));
    set.insert(Value::Int(3));
    assert_eq!(set.len(), 2);
}

#[test]
fn value_accessors() {
    assert!(Value::Nil.is_nil());
    assert_eq!(Value::Int(4).as_int(), Some(4));
    assert_eq!(Value::from("x").as_str(), Some("x"));
    assert_eq!(Value::Bool(true).type_name(), "bool");
    assert_eq!(format!("{}", Value::from("x")), "\"x\"");
}

// =============================================================================
// Interning
// =============================================================================

#[test]
fn interning_is_idempotent() {
    let mut interner = Interner::new();
    let a = interner.intern("Person");
    let b = interner.intern("Person");
    let c = interner.intern("Order");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.resolve(a), Some("Person"));
    assert_eq!(interner.lookup("Order"), Some(c));
    assert_eq!(interner.lookup("Payment"), None);
}

#[test]
fn reserved_symbols_never_collide() {
    let mut interner = Interner::new();
    let person = interner.intern("Person");
    assert_ne!(person, Symbol::INITIAL_FACT);
    assert_ne!(person, Symbol::THIS);
}
