//! Rule compilation for Trellis.
//!
//! This crate provides:
//! - [`RuleDefinition`] / [`ConditionElement`] - Condition trees handed to the builder
//! - [`ReteBuilder`] - Adds and removes rules, sharing nodes where it can
//! - [`BuildContext`] - Traversal state of one rule compilation
//! - [`PatternLedger`] - Patterns bound in scope, in tuple order
//! - [`PartitionAssigner`] - Per-rule partitions and promotion to shared
//! - [`TemporalDependencyMatrix`] - Temporal distances between event patterns

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod condition;
pub mod context;
pub mod ledger;
pub mod partition;
pub mod sharing;
pub mod stack;
pub mod temporal;
pub mod transform;

pub use builder::{ReteBuilder, RuleBuild, RuleRemoval};
pub use condition::{
    ConditionElement, Forall, GroupElement, GroupKind, Pattern, QueryCall, RuleDefinition,
    RuleKind, SubRule, TemporalConstraint,
};
pub use context::{AttachedNode, BuildContext};
pub use ledger::{LastBuiltPatterns, PatternLedger};
pub use partition::{PartitionAssigner, Stamp};
pub use stack::{BuildStack, RuleComponentStack};
pub use temporal::{Interval, TemporalDependencyMatrix};
