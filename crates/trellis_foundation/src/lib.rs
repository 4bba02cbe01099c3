//! Core identifiers, literal values, interning, and errors for Trellis.
//!
//! This crate provides:
//! - [`NodeId`], [`RuleId`], [`PartitionId`] - Network identifiers
//! - [`EntryPointId`] - Fact entry points (default or named event streams)
//! - [`Value`] - Literal values compared by value, not by source text
//! - [`Interner`] / [`Symbol`] - Interned object-type and field names
//! - [`Error`] - Build errors with rule/pattern context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod intern;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind, Result, StackKind};
pub use ids::{EntryPointId, NodeId, PartitionId, RuleId};
pub use intern::{Interner, Symbol};
pub use value::Value;
